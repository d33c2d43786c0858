//! Durable alert log for protection violations.
//!
//! Each alert is one appended line; the file is opened and closed per alert
//! so an interrupted write can at worst damage the line being written.
//!
//! **Identity limitation**: the username recorded is the daemon's own
//! effective user, not whoever performed the filesystem change. Filesystem
//! notifications carry no actor information, so treat the field as a
//! placeholder rather than attribution.

use crate::event::{ActionKind, TIMESTAMP_FORMAT};
use crate::sink::{open_for_append, write_failed, SinkError};
use chrono::{DateTime, Local};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Username used when the effective user cannot be resolved.
pub const UNKNOWN_USER: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRecord {
    pub timestamp: DateTime<Local>,
    pub username: String,
    pub action: ActionKind,
    pub path: String,
}

impl fmt::Display for AlertRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - User: {} attempted to {} protected file: {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.username,
            self.action,
            self.path
        )
    }
}

#[derive(Debug, Clone)]
pub struct AlertLogger {
    path: PathBuf,
}

impl AlertLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_alert(
        &self,
        path: &str,
        action: ActionKind,
        username: &str,
    ) -> Result<AlertRecord, SinkError> {
        let record = AlertRecord {
            timestamp: Local::now(),
            username: username.to_string(),
            action,
            path: path.to_string(),
        };
        self.append(&record)?;
        Ok(record)
    }

    pub fn append(&self, record: &AlertRecord) -> Result<(), SinkError> {
        let mut file = open_for_append(&self.path)?;
        writeln!(file, "{}", record)
            .and_then(|_| file.flush())
            .map_err(|e| write_failed(&self.path, e))
    }
}

/// Name of the daemon's effective user. See the module docs for why this is
/// not the actor behind the change.
#[cfg(unix)]
pub fn effective_user_name() -> String {
    use nix::unistd::{geteuid, User};
    match User::from_uid(geteuid()) {
        Ok(Some(user)) => user.name,
        _ => UNKNOWN_USER.to_string(),
    }
}

#[cfg(not(unix))]
pub fn effective_user_name() -> String {
    UNKNOWN_USER.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn record_formats_as_alert_line() {
        let record = AlertRecord {
            timestamp: Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            username: "root".into(),
            action: ActionKind::Delete,
            path: "/etc/passwd".into(),
        };
        assert_eq!(
            record.to_string(),
            "2024-01-02 03:04:05 - User: root attempted to DELETE protected file: /etc/passwd"
        );
    }

    #[test]
    fn alerts_are_appended() {
        let dir = tempdir().unwrap();
        let logger = AlertLogger::new(dir.path().join("alert.csv"));
        logger.log_alert("/w/a", ActionKind::Modify, "alice").unwrap();
        logger.log_alert("/w/b", ActionKind::Move, "alice").unwrap();

        let content = fs::read_to_string(logger.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("- User: alice attempted to MODIFY protected file: /w/a"));
        assert!(lines[1].ends_with("- User: alice attempted to MOVE protected file: /w/b"));
    }

    #[test]
    fn missing_directory_is_a_sink_error() {
        let dir = tempdir().unwrap();
        let logger = AlertLogger::new(dir.path().join("no-such-dir").join("alert.csv"));
        let err = logger
            .log_alert("/w/a", ActionKind::Create, "alice")
            .unwrap_err();
        assert!(matches!(err, SinkError::Open { .. }));
    }

    #[test]
    fn effective_user_resolves_to_a_name() {
        assert!(!effective_user_name().is_empty());
    }
}
