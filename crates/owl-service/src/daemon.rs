//! Daemon wiring: registration, event loop thread, flush loop, shutdown.

use crate::flush_loop::spawn_flush_loop;
use crate::pipeline::{run_event_loop, EventPipeline, LoopOptions};
use crate::watcher::{register_tree, NotifySource};
use anyhow::{anyhow, Context, Result};
use owl_core::paths::default_alert_log;
use owl_core::storage::load_rules_or_empty;
use owl_core::{AlertLogger, EventBuffer, OwlSettings, ProtectionGate};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Fully resolved startup parameters.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub watch_root: PathBuf,
    pub event_log: PathBuf,
    pub rules_file: PathBuf,
    pub alert_log: PathBuf,
    pub flush_interval: Duration,
    pub follow_new_directories: bool,
}

impl DaemonConfig {
    pub fn from_settings(settings: OwlSettings) -> Result<Self> {
        settings.validate()?;
        let flush_interval = settings.flush_interval();
        let alert_log = match settings.alert_log {
            Some(path) => path,
            None => {
                let path = default_alert_log()?;
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
                path
            }
        };
        Ok(Self {
            watch_root: settings
                .watch_root
                .ok_or_else(|| anyhow!("no directory to watch"))?,
            event_log: settings
                .event_log
                .ok_or_else(|| anyhow!("no event log destination"))?,
            rules_file: settings
                .rules_file
                .ok_or_else(|| anyhow!("no protection rule file"))?,
            alert_log,
            flush_interval,
            follow_new_directories: settings.follow_new_directories,
        })
    }
}

/// Runs until SIGINT/SIGTERM or until the notification source fails.
pub async fn run(config: DaemonConfig) -> Result<()> {
    run_until(config, async {
        match shutdown_signal().await {
            Ok(name) => info!(signal = name, "shutdown signal received"),
            Err(e) => error!(error = %e, "cannot listen for shutdown signals"),
        }
    })
    .await
}

/// Runs until `shutdown` completes or the notification source fails. The
/// flush loop always gets a final flush before this returns.
pub async fn run_until<F>(config: DaemonConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let rules = Arc::new(load_rules_or_empty(&config.rules_file));

    let mut source = NotifySource::new().context("initializing notification source")?;
    register_tree(&mut source, &config.watch_root)?;

    let buffer = Arc::new(EventBuffer::new());
    let pipeline = EventPipeline::new(
        ProtectionGate::new(rules),
        AlertLogger::new(&config.alert_log),
        buffer.clone(),
    );
    warn!(
        user = pipeline.username(),
        "alerts name the daemon's effective user, not the process that made the change"
    );

    let (flush_task, flush) = spawn_flush_loop(
        buffer.clone(),
        config.event_log.clone(),
        config.flush_interval,
    );

    let options = LoopOptions {
        follow_new_directories: config.follow_new_directories,
    };
    let (done_tx, done_rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("event-loop".into())
        .spawn(move || {
            let result = run_event_loop(&mut source, &pipeline, options);
            let _ = done_tx.send(result);
        })
        .context("spawning event loop thread")?;

    info!(
        root = %config.watch_root.display(),
        events = %config.event_log.display(),
        alerts = %config.alert_log.display(),
        "owl service started"
    );

    let outcome = tokio::select! {
        () = shutdown => {
            info!("shutting down");
            Ok(())
        }
        result = done_rx => match result {
            Ok(Ok(stats)) => {
                info!(?stats, "event loop finished");
                Ok(())
            }
            Ok(Err(e)) => Err(anyhow::Error::new(e).context("notification source failed")),
            Err(_) => Err(anyhow!("event loop thread exited unexpectedly")),
        },
    };

    flush.shutdown();
    if let Err(e) = flush_task.await {
        warn!(error = %e, "flush loop did not shut down cleanly");
    }
    info!("owl service stopped");
    outcome
}

/// Resolves with the name of the first shutdown signal received.
pub(crate) async fn shutdown_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            res = signal::ctrl_c() => res.map(|()| "interrupt"),
            _ = terminate.recv() => Ok("terminate"),
        }
    }
    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.map(|()| "interrupt")
    }
}
