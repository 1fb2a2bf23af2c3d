//! recall-watcher CLI
//!
//! Polls the configured recall lists and posts alerts for the watched
//! identifiers. Exit codes: 0 on success or interrupt, 1 on runtime
//! failure, 2 when the configuration cannot be loaded.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use recall_watcher::{
    error::Result,
    logging::Logging,
    models::Config,
    pipeline::Watcher,
    services::{DiscordNotifier, DocumentExtractor, HttpFetcher, LogNotifier, Notifier},
    utils::shutdown::Shutdown,
};
use tracing::instrument::WithSubscriber;
use tracing::{error, info};

/// Recall list watcher
#[derive(Parser, Debug)]
#[command(
    name = "recall-watcher",
    version,
    about = "Watch paginated recall lists and alert on watched identifiers"
)]
struct Cli {
    /// Run a single pass and exit
    #[arg(long)]
    once: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

/// Create the parent directory of `path` when missing.
fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => std::fs::create_dir_all(parent),
        None => Ok(()),
    }
}

async fn watch(config: Config, once: bool) -> Result<()> {
    let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
    let notifier: Arc<dyn Notifier> = match &config.discord {
        Some(discord) => Arc::new(DiscordNotifier::new(discord, &config.http)?),
        None => {
            info!("No [discord] section, notifications disabled");
            Arc::new(LogNotifier)
        }
    };

    let watcher = Watcher::new(
        config,
        fetcher,
        Arc::new(DocumentExtractor),
        notifier,
        Shutdown::on_ctrl_c(),
    )?;
    watcher.run(once).await
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = ensure_parent(&config.watch.state_file)
        .and_then(|()| ensure_parent(&config.watch.log_file))
    {
        eprintln!("Failed to create state or log directory: {e}");
        return ExitCode::FAILURE;
    }

    let logging = match Logging::new(cli.debug, &config.watch.log_file) {
        Ok(logging) => logging,
        Err(e) => {
            eprintln!("Failed to set up logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    let once = cli.once;
    let code = async move {
        info!(
            config = %cli.config.display(),
            once = cli.once,
            debug = cli.debug,
            "recall-watcher starting"
        );
        match watch(config, once).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, "Watcher failed");
                ExitCode::FAILURE
            }
        }
    }
    .with_subscriber(logging.dispatch().clone())
    .await;

    logging.shutdown();
    code
}
