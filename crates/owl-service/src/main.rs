use anyhow::Result;
use clap::{Parser, Subcommand};
use owl_core::storage::load_settings;
use owl_core::{OwlSettings, RuleStore};
use owl_service::daemon::{self, DaemonConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "File Owl integrity monitor", long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch a directory tree until interrupted
    Run {
        /// Directory to watch recursively
        directory: Option<PathBuf>,
        /// File the buffered events are appended to
        event_log: Option<PathBuf>,
        /// JSON file with protection rules
        rules: Option<PathBuf>,
        /// Alert log destination
        #[arg(long)]
        alert_log: Option<PathBuf>,
        /// JSON settings file; command-line values take precedence
        #[arg(long)]
        config: Option<PathBuf>,
        /// Seconds between buffer flushes
        #[arg(long)]
        flush_interval: Option<u64>,
        /// Also watch directories created after startup
        #[arg(long)]
        follow_new_dirs: bool,
    },
    /// Print the protection rules a rule file yields
    Rules {
        rules: PathBuf,
    },
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    match cli.command {
        Commands::Run {
            directory,
            event_log,
            rules,
            alert_log,
            config,
            flush_interval,
            follow_new_dirs,
        } => {
            let mut settings = match config {
                Some(path) => load_settings(&path)?,
                None => OwlSettings::default(),
            };
            if directory.is_some() {
                settings.watch_root = directory;
            }
            if event_log.is_some() {
                settings.event_log = event_log;
            }
            if rules.is_some() {
                settings.rules_file = rules;
            }
            if alert_log.is_some() {
                settings.alert_log = alert_log;
            }
            if let Some(secs) = flush_interval {
                settings.flush_interval_secs = secs;
            }
            settings.follow_new_directories |= follow_new_dirs;
            daemon::run(DaemonConfig::from_settings(settings)?).await
        }
        Commands::Rules { rules } => rules_command(rules),
    }
}

fn rules_command(path: PathBuf) -> Result<()> {
    let store = RuleStore::load(&path)?;
    println!("{}", serde_json::to_string_pretty(store.rules())?);
    Ok(())
}
