//! Event model and decoder.
//!
//! Raw change records carry a closed set of change flags and an optional
//! name. The decoder turns each record into exactly one [`Event`], picking
//! the action kind from a fixed priority table so a record carrying several
//! flags is always classified the same way.

use bitflags::bitflags;
use chrono::{DateTime, Local, SubsecRound};
use std::fmt;
use std::str::FromStr;

/// Display format shared by the buffered event log and the alert log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Path recorded when a raw record carries no associated name.
pub const UNKNOWN_PATH: &str = "unknown";

bitflags! {
    /// Change classes carried by a raw notification.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChangeMask: u32 {
        const CREATE     = 0b0000_0001;
        const DELETE     = 0b0000_0010;
        const MODIFY     = 0b0000_0100;
        const MOVED_FROM = 0b0000_1000;
        const MOVED_TO   = 0b0001_0000;
        /// Qualifier only; never affects classification.
        const IS_DIR     = 0b0010_0000;

        const MOVE = Self::MOVED_FROM.bits() | Self::MOVED_TO.bits();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Create,
    Delete,
    Modify,
    /// Both move directions. Older rule files call this `COPY`.
    Move,
    Unknown,
}

/// Classification order. The first flag present wins.
const DECODE_ORDER: [(ChangeMask, ActionKind); 4] = [
    (ChangeMask::CREATE, ActionKind::Create),
    (ChangeMask::DELETE, ActionKind::Delete),
    (ChangeMask::MODIFY, ActionKind::Modify),
    (ChangeMask::MOVE, ActionKind::Move),
];

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Create,
        ActionKind::Delete,
        ActionKind::Modify,
        ActionKind::Move,
        ActionKind::Unknown,
    ];

    pub fn from_mask(mask: ChangeMask) -> Self {
        DECODE_ORDER
            .iter()
            .find(|(flag, _)| mask.intersects(*flag))
            .map(|(_, kind)| *kind)
            .unwrap_or(ActionKind::Unknown)
    }

    pub fn label(self) -> &'static str {
        match self {
            ActionKind::Create => "CREATE",
            ActionKind::Delete => "DELETE",
            ActionKind::Modify => "MODIFY",
            ActionKind::Move => "MOVE",
            ActionKind::Unknown => "UNKNOWN",
        }
    }

    /// Case-insensitive label comparison. `move` and `copy` name the same kind.
    pub fn matches_label(self, label: &str) -> bool {
        match self {
            ActionKind::Move => {
                label.eq_ignore_ascii_case("move") || label.eq_ignore_ascii_case("copy")
            }
            other => label.eq_ignore_ascii_case(other.label()),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized action label: {0}")]
pub struct ParseActionError(pub String);

impl FromStr for ActionKind {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.matches_label(s))
            .ok_or_else(|| ParseActionError(s.to_string()))
    }
}

/// Undecoded change record as delivered by the notification source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub mask: ChangeMask,
    pub name: Option<String>,
}

impl RawEvent {
    pub fn new(mask: ChangeMask, name: impl Into<String>) -> Self {
        Self {
            mask,
            name: Some(name.into()),
        }
    }

    pub fn nameless(mask: ChangeMask) -> Self {
        Self { mask, name: None }
    }

    pub fn is_dir(&self) -> bool {
        self.mask.contains(ChangeMask::IS_DIR)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub timestamp: DateTime<Local>,
    pub action: ActionKind,
    pub path: String,
}

impl Event {
    /// Decode a raw record, stamping it with the current local time.
    pub fn decode(raw: &RawEvent) -> Self {
        Self::decode_at(raw, Local::now())
    }

    pub fn decode_at(raw: &RawEvent, now: DateTime<Local>) -> Self {
        Self {
            timestamp: now.trunc_subsecs(0),
            action: ActionKind::from_mask(raw.mask),
            path: raw
                .name
                .clone()
                .unwrap_or_else(|| UNKNOWN_PATH.to_string()),
        }
    }

    /// Line written to the buffered event log.
    pub fn to_log_line(&self) -> String {
        format!(
            "{}, {}, {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.action,
            self.path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn nameless_modify_decodes_to_unknown_path() {
        let event = Event::decode(&RawEvent::nameless(ChangeMask::MODIFY));
        assert_eq!(event.action, ActionKind::Modify);
        assert_eq!(event.path, "unknown");
    }

    #[test]
    fn priority_order_is_fixed() {
        let all = ChangeMask::CREATE | ChangeMask::DELETE | ChangeMask::MODIFY | ChangeMask::MOVE;
        assert_eq!(ActionKind::from_mask(all), ActionKind::Create);
        assert_eq!(
            ActionKind::from_mask(ChangeMask::DELETE | ChangeMask::MODIFY),
            ActionKind::Delete
        );
        assert_eq!(
            ActionKind::from_mask(ChangeMask::MODIFY | ChangeMask::MOVED_TO),
            ActionKind::Modify
        );
    }

    #[test]
    fn move_directions_coalesce() {
        assert_eq!(ActionKind::from_mask(ChangeMask::MOVED_FROM), ActionKind::Move);
        assert_eq!(ActionKind::from_mask(ChangeMask::MOVED_TO), ActionKind::Move);
    }

    #[test]
    fn empty_or_dir_only_mask_is_unknown() {
        assert_eq!(ActionKind::from_mask(ChangeMask::empty()), ActionKind::Unknown);
        assert_eq!(ActionKind::from_mask(ChangeMask::IS_DIR), ActionKind::Unknown);
        assert_eq!(
            ActionKind::from_mask(ChangeMask::CREATE | ChangeMask::IS_DIR),
            ActionKind::Create
        );
    }

    #[test]
    fn timestamp_has_second_precision() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
            + chrono::Duration::milliseconds(830);
        let event = Event::decode_at(&RawEvent::new(ChangeMask::CREATE, "/w/a.txt"), now);
        assert_eq!(event.timestamp.nanosecond(), 0);
        assert_eq!(event.to_log_line(), "2024-03-09 14:05:07, CREATE, /w/a.txt");
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("Delete".parse::<ActionKind>().unwrap(), ActionKind::Delete);
        assert_eq!("copy".parse::<ActionKind>().unwrap(), ActionKind::Move);
        assert_eq!("MOVE".parse::<ActionKind>().unwrap(), ActionKind::Move);
        assert!("rename".parse::<ActionKind>().is_err());
    }
}
