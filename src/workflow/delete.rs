//! Confirm-then-delete against the remote host.

use crate::error::{Result, WorkflowError};
use crate::remote::RemoteRepository;
use crate::uri::RemoteUri;
use std::sync::Arc;
use tracing::{debug, info};

/// Where the delete workflow stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteState {
    Pending,
    Confirmed,
    Cancelled,
}

/// A choice made in the confirmation prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Cancel,
    /// Neither affirmative nor negative; ignored
    Other(String),
}

impl Decision {
    /// Interpret a button label: anything containing "ok" confirms, anything
    /// containing "cancel" cancels (case-insensitive).
    pub fn from_button_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("ok") {
            Decision::Confirm
        } else if lower.contains("cancel") {
            Decision::Cancel
        } else {
            Decision::Other(text.to_string())
        }
    }
}

/// Presents the yes/no question
pub trait ConfirmPrompt: Send + Sync {
    fn show(&self, message: &str);
}

/// The browser/tree the user selected the resource in
pub trait SelectionView: Send + Sync {
    fn current_uri(&self) -> String;

    /// Drop the (now deleted) current item from the view
    fn remove_current_item(&self);
}

pub struct DeleteWorkflow {
    remote: Arc<dyn RemoteRepository>,
    view: Arc<dyn SelectionView>,
    prompt: Arc<dyn ConfirmPrompt>,
    resource_name: String,
    state: DeleteState,
}

impl DeleteWorkflow {
    pub fn new(
        remote: Arc<dyn RemoteRepository>,
        view: Arc<dyn SelectionView>,
        prompt: Arc<dyn ConfirmPrompt>,
        resource_name: impl Into<String>,
    ) -> Self {
        Self {
            remote,
            view,
            prompt,
            resource_name: resource_name.into(),
            state: DeleteState::Pending,
        }
    }

    pub fn state(&self) -> DeleteState {
        self.state
    }

    pub fn confirmation_message(&self) -> String {
        format!(
            "Are you sure you want to delete the '{}' from Xnat?",
            self.resource_name
        )
    }

    /// Show the prompt. Safe to call repeatedly.
    pub fn request_confirmation(&self) {
        self.prompt.show(&self.confirmation_message());
    }

    /// Apply the user's choice. Only a pending workflow reacts; a confirmed
    /// delete that fails at the remote leaves the view untouched and returns
    /// the error.
    pub async fn on_decision(&mut self, decision: Decision) -> Result<DeleteState> {
        if self.state != DeleteState::Pending {
            debug!("Ignoring decision {:?} in state {:?}", decision, self.state);
            return Ok(self.state);
        }

        match decision {
            Decision::Confirm => {
                self.state = DeleteState::Confirmed;
                let uri = RemoteUri::new(self.view.current_uri());
                let target = uri.deletion_target().to_string();

                info!("Deleting '{}' ({})", self.resource_name, target);
                self.remote
                    .delete(&target)
                    .await
                    .map_err(|source| WorkflowError::RemoteDeleteFailed {
                        target: target.clone(),
                        source,
                    })?;

                self.view.remove_current_item();
            }
            Decision::Cancel => {
                info!("Delete of '{}' cancelled", self.resource_name);
                self.state = DeleteState::Cancelled;
            }
            Decision::Other(label) => {
                debug!("Decision '{}' is neither confirm nor cancel", label);
            }
        }
        Ok(self.state)
    }
}
