//! Protection rules and the in-memory rule store.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Rule action that matches every observed action kind.
pub const ACTION_ALL: &str = "all";

/// Only rules of this type are loaded; anything else in the file is skipped.
pub const PROTECTION_RULE_TYPE: &str = "protection";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionRule {
    pub path: String,
    /// An action label (`create`, `delete`, `modify`, `move`/`copy`, `unknown`) or `all`.
    pub action: String,
}

impl ProtectionRule {
    pub fn new(path: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            action: action.into(),
        }
    }

    pub fn applies_to_all_actions(&self) -> bool {
        self.action.eq_ignore_ascii_case(ACTION_ALL)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuleLoadError {
    #[error("cannot read rule file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid rule file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk rule entry. `type` defaults to `protection`.
#[derive(Debug, Deserialize)]
struct RuleEntry {
    path: String,
    action: String,
    #[serde(rename = "type", default = "default_rule_type")]
    rule_type: String,
}

fn default_rule_type() -> String {
    PROTECTION_RULE_TYPE.to_string()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RuleFile {
    Wrapped { rules: Vec<RuleEntry> },
    Bare(Vec<RuleEntry>),
}

/// Immutable rule set, built once at startup and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    rules: Vec<ProtectionRule>,
}

impl RuleStore {
    pub fn new(rules: Vec<ProtectionRule>) -> Self {
        Self { rules }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let entries = match serde_json::from_str::<RuleFile>(json)? {
            RuleFile::Wrapped { rules } | RuleFile::Bare(rules) => rules,
        };
        let rules = entries
            .into_iter()
            .filter(|entry| entry.rule_type == PROTECTION_RULE_TYPE)
            .map(|entry| ProtectionRule::new(entry.path, entry.action))
            .collect();
        Ok(Self { rules })
    }

    pub fn load(path: &Path) -> Result<Self, RuleLoadError> {
        let json = fs::read_to_string(path).map_err(|source| RuleLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json).map_err(|source| RuleLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn rules(&self) -> &[ProtectionRule] {
        &self.rules
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProtectionRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
