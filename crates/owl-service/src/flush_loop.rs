//! Periodic flush of the event buffer.
//!
//! Drains the shared [`EventBuffer`] to the event log once per interval
//! (one minute by default). The loop can be woken for an immediate flush and
//! always flushes one last time when shut down, so events recorded before
//! shutdown are not lost.

use owl_core::{EventBuffer, FlushOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

/// Control handle for a running flush loop.
pub struct FlushLoopHandle {
    /// Wakes the loop for an immediate flush.
    pub wake: Arc<Notify>,
    /// Send `true` to flush one final time and stop.
    pub shutdown_tx: watch::Sender<bool>,
}

impl FlushLoopHandle {
    pub fn flush_now(&self) {
        self.wake.notify_one();
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

pub fn spawn_flush_loop(
    buffer: Arc<EventBuffer>,
    destination: PathBuf,
    interval: Duration,
) -> (tokio::task::JoinHandle<()>, FlushLoopHandle) {
    let wake = Arc::new(Notify::new());
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let wake_clone = wake.clone();

    let handle = tokio::spawn(async move {
        info!(
            interval_secs = interval.as_secs(),
            destination = %destination.display(),
            "flush loop started"
        );

        let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = wake_clone.notified() => {
                    debug!("flush loop woken early");
                }
                changed = shutdown_rx.changed() => {
                    // A dropped handle also stops the loop.
                    if changed.is_err() || *shutdown_rx.borrow() {
                        flush_once(&buffer, &destination);
                        info!("flush loop shutting down");
                        return;
                    }
                }
            }

            flush_once(&buffer, &destination);
        }
    });

    (handle, FlushLoopHandle { wake, shutdown_tx })
}

fn flush_once(buffer: &EventBuffer, destination: &Path) {
    match buffer.flush(destination) {
        Ok(FlushOutcome::Written(count)) => {
            debug!(count, "event buffer flushed");
        }
        Ok(FlushOutcome::Empty) => {}
        Err(e) => {
            error!(error = %e, "cannot write buffered events; will retry");
        }
    }
}
