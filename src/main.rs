use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::sync::Arc;
use xnat_loader::classify::ExtensionClassifier;
use xnat_loader::config::{Cli as ConfigCli, Config};
use xnat_loader::database::RedbDicomDatabase;
use xnat_loader::plugins::default_plugins;
use xnat_loader::remote::{RemoteRepository, XnatClient};
use xnat_loader::scene::ManifestScene;
use xnat_loader::selection::ImportOutcome;
use xnat_loader::session::JsonlSessionLog;
use xnat_loader::staging::FilesystemStaging;
use xnat_loader::uri::RemoteUri;
use xnat_loader::workflow::{
    ConfirmPrompt, Decision, DeleteState, DeleteWorkflow, DicomLoader, LoadRequest, Notifier,
    SelectionView,
};

#[derive(Parser, Debug)]
#[command(
    name = "xnat-loader",
    about = "Download, cache and import DICOM folders from an XNAT host"
)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "xnat-loader.toml")]
    config: String,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Download (or reuse from cache) a DICOM folder and import it
    Load { container_uri: String },
    /// Report whether a folder is fully present in the local database
    CheckCache { container_uri: String },
    /// Delete a file or folder from the XNAT host
    Delete {
        uri: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

struct ConsolePrompt;

impl ConfirmPrompt for ConsolePrompt {
    fn show(&self, message: &str) {
        print!("{} [ok/cancel] ", message);
        let _ = std::io::stdout().flush();
    }
}

/// A one-item "selection" standing in for the host's browser tree
struct CommandLineSelection {
    uri: String,
}

impl SelectionView for CommandLineSelection {
    fn current_uri(&self) -> String {
        self.uri.clone()
    }

    fn remove_current_item(&self) {
        tracing::info!("Removed '{}' from the current selection", self.uri);
    }
}

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn terminate(&self, title: &str, message: &str) {
        tracing::error!("{}: {}", title, message);
        eprintln!("{}: {}", title, message);
    }

    fn open_database_setup(&self) {
        eprintln!("Set [database] path in the configuration file, then run the load again.");
    }
}

fn read_decision() -> anyhow::Result<Decision> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let answer = line.trim();
    Ok(match answer.to_lowercase().as_str() {
        "y" | "yes" => Decision::Confirm,
        "n" | "no" | "" => Decision::Cancel,
        _ => Decision::from_button_text(answer),
    })
}

fn build_loader(config: &Config, remote: Arc<dyn RemoteRepository>) -> anyhow::Result<DicomLoader> {
    let staging = Arc::new(FilesystemStaging::new(&config.cache.dir)?);
    let scene = Arc::new(ManifestScene::new(config.scene.dir.clone()));

    let mut loader = DicomLoader::new(remote, staging, Arc::new(ConsoleNotifier))
        .with_classifier(Arc::new(ExtensionClassifier::new(
            &config.cache.dicom_extensions,
        )))
        .with_plugins(default_plugins(scene))
        .with_splitter(config.cache.splitter.clone());

    match &config.database.path {
        Some(path) => loader = loader.with_database(Arc::new(RedbDicomDatabase::open(path)?)),
        None => tracing::warn!("No DICOM database configured; downloads cannot be imported"),
    }
    if let Some(log_path) = &config.session.log_path {
        loader = loader.with_session_tracker(Arc::new(JsonlSessionLog::new(log_path)));
    }
    Ok(loader)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ConfigCli::new(args.config.clone())
        .load()
        .with_context(|| format!("loading configuration from {}", args.config))?;
    xnat_loader::init_logging(&config.logging)?;

    tracing::info!("🔧 Starting xnat-loader against {}", config.xnat.host);

    let remote: Arc<dyn RemoteRepository> = Arc::new(XnatClient::from_config(&config.xnat)?);

    match args.cmd {
        Cmd::Delete { uri, yes } => {
            let name = RemoteUri::new(&uri).name().to_string();
            let mut workflow = DeleteWorkflow::new(
                remote,
                Arc::new(CommandLineSelection { uri }),
                Arc::new(ConsolePrompt),
                name,
            );
            let decision = if yes {
                Decision::Confirm
            } else {
                workflow.request_confirmation();
                read_decision()?
            };
            match workflow.on_decision(decision).await? {
                DeleteState::Confirmed => println!("Deleted."),
                DeleteState::Cancelled => println!("Cancelled."),
                DeleteState::Pending => println!("No decision made; nothing deleted."),
            }
        }
        Cmd::CheckCache { container_uri } => {
            let mut loader = build_loader(&config, remote.clone())?;
            let files = remote.list_files(&container_uri).await?;
            let hit = loader.check_cache(&files)?;
            println!(
                "{}: {} ({} cached files)",
                container_uri,
                if hit { "cached" } else { "not cached" },
                loader.cached_files().len()
            );
        }
        Cmd::Load { container_uri } => {
            let mut loader = build_loader(&config, remote.clone())?;
            let files = remote.list_files(&container_uri).await?;
            let report = loader.load(&LoadRequest::new(container_uri, files)).await?;
            match report.outcome {
                ImportOutcome::Loaded { plugin, loadable } => println!(
                    "Loaded '{}' ({} files) with {}{}",
                    loadable.name,
                    loadable.file_count(),
                    plugin,
                    if report.from_cache { " from cache" } else { "" }
                ),
                ImportOutcome::NoLoadable => println!("No loadables were found."),
            }
        }
    }

    Ok(())
}
