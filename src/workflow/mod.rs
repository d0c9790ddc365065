pub mod delete;
pub mod download;

pub use delete::{ConfirmPrompt, Decision, DeleteState, DeleteWorkflow, SelectionView};
pub use download::{DicomLoader, LoadReport, LoadRequest, LoadState, Notifier};
