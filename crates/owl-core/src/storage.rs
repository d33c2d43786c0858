use crate::rules::RuleStore;
use crate::settings::OwlSettings;
use anyhow::Context;
use std::path::Path;
use tracing::{error, info};

pub fn load_settings(path: &Path) -> anyhow::Result<OwlSettings> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings {}", path.display()))?;
    let settings: OwlSettings = serde_json::from_str(&data)
        .with_context(|| format!("parsing settings {}", path.display()))?;
    settings.validate()?;
    Ok(settings)
}

/// Loads the rule file, falling back to an empty rule set when it cannot be
/// read or parsed. The daemon keeps monitoring either way.
pub fn load_rules_or_empty(path: &Path) -> RuleStore {
    match RuleStore::load(path) {
        Ok(store) => {
            info!(rules = store.len(), path = %path.display(), "protection rules loaded");
            store
        }
        Err(e) => {
            error!(error = %e, "failed to load protection rules; continuing with none");
            RuleStore::default()
        }
    }
}
