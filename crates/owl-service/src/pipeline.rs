//! Event loop: decode, gate, then alert or buffer.
//!
//! Every decoded event is consumed exactly once. Protected hits go to the
//! alert log and never reach the buffer; everything else is buffered for the
//! flush loop.

use crate::watcher::{register_tree, NotificationSource, SourceError};
use owl_core::{
    effective_user_name, ActionKind, AlertLogger, AlertRecord, Event, EventBuffer,
    ProtectionGate, RawEvent,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Alerted(AlertRecord),
    /// Protected hit whose alert could not be written.
    AlertDropped,
    Buffered,
}

pub struct EventPipeline {
    gate: ProtectionGate,
    alerts: AlertLogger,
    buffer: Arc<EventBuffer>,
    username: String,
}

impl EventPipeline {
    /// Alerts are attributed to the daemon's effective user, resolved once here.
    pub fn new(gate: ProtectionGate, alerts: AlertLogger, buffer: Arc<EventBuffer>) -> Self {
        Self::with_username(gate, alerts, buffer, effective_user_name())
    }

    pub fn with_username(
        gate: ProtectionGate,
        alerts: AlertLogger,
        buffer: Arc<EventBuffer>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            gate,
            alerts,
            buffer,
            username: username.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn buffer(&self) -> &Arc<EventBuffer> {
        &self.buffer
    }

    pub fn process(&self, raw: &RawEvent) -> Disposition {
        self.dispatch(Event::decode(raw))
    }

    pub fn dispatch(&self, event: Event) -> Disposition {
        if !self.gate.is_protected(&event.path, event.action) {
            self.buffer.record(&event);
            return Disposition::Buffered;
        }

        match self
            .alerts
            .log_alert(&event.path, event.action, &self.username)
        {
            Ok(record) => {
                warn!(
                    path = %event.path,
                    action = %event.action,
                    user = %self.username,
                    "protected file touched; alert logged"
                );
                Disposition::Alerted(record)
            }
            Err(e) => {
                error!(path = %event.path, action = %event.action, error = %e, "alert dropped");
                Disposition::AlertDropped
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoopOptions {
    /// Re-run the registrar for directories created while running.
    pub follow_new_directories: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub events: u64,
    pub alerts: u64,
    pub dropped_alerts: u64,
    pub buffered: u64,
}

/// Runs until the source ends (`Ok`) or fails (`Err`). Buffered events are
/// left for the flush loop in both cases.
pub fn run_event_loop<S>(
    source: &mut S,
    pipeline: &EventPipeline,
    options: LoopOptions,
) -> Result<LoopStats, SourceError>
where
    S: NotificationSource + ?Sized,
{
    let mut stats = LoopStats::default();
    loop {
        let batch = match source.next_batch() {
            Ok(Some(batch)) => batch,
            Ok(None) => {
                info!(events = stats.events, "notification source ended");
                return Ok(stats);
            }
            Err(e) => {
                error!(error = %e, "notification source failed; stopping event loop");
                return Err(e);
            }
        };

        for raw in batch {
            let event = Event::decode(&raw);
            if options.follow_new_directories && event.action == ActionKind::Create && raw.is_dir()
            {
                if let Err(e) = register_tree(source, Path::new(&event.path)) {
                    warn!(path = %event.path, error = %e, "cannot watch new directory");
                }
            }

            stats.events += 1;
            match pipeline.dispatch(event) {
                Disposition::Alerted(_) => stats.alerts += 1,
                Disposition::AlertDropped => stats.dropped_alerts += 1,
                Disposition::Buffered => stats.buffered += 1,
            }
        }
    }
}
