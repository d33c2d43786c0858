//! Core of the File Owl integrity monitor: event model and decoder,
//! protection rules and gate, alert log and buffered event log.

pub mod alert;
pub mod buffer;
pub mod event;
pub mod gate;
pub mod paths;
pub mod rules;
pub mod settings;
pub mod sink;
pub mod storage;

pub use alert::{effective_user_name, AlertLogger, AlertRecord};
pub use buffer::{EventBuffer, FlushOutcome};
pub use event::{ActionKind, ChangeMask, Event, RawEvent};
pub use gate::ProtectionGate;
pub use rules::{ProtectionRule, RuleStore};
pub use settings::OwlSettings;
pub use sink::SinkError;
