use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OwlSettings {
    /// Directory tree to watch. Usually supplied on the command line.
    #[serde(default)]
    pub watch_root: Option<PathBuf>,
    /// Destination of the buffered event log.
    #[serde(default)]
    pub event_log: Option<PathBuf>,
    #[serde(default)]
    pub rules_file: Option<PathBuf>,
    /// Alert log destination; falls back to the data directory when unset.
    #[serde(default)]
    pub alert_log: Option<PathBuf>,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// Register watches for directories created after startup.
    #[serde(default)]
    pub follow_new_directories: bool,
}

impl Default for OwlSettings {
    fn default() -> Self {
        Self {
            watch_root: None,
            event_log: None,
            rules_file: None,
            alert_log: None,
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
            follow_new_directories: false,
        }
    }
}

impl OwlSettings {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.flush_interval_secs == 0 {
            anyhow::bail!("flush interval must be at least one second");
        }
        Ok(())
    }
}

fn default_flush_interval_secs() -> u64 {
    DEFAULT_FLUSH_INTERVAL_SECS
}
