//! Protection gate: decides whether an observed action on a path violates a rule.

use crate::event::ActionKind;
use crate::rules::RuleStore;
use std::sync::Arc;
use tracing::{debug, trace};

/// Linear scan over the rule store. The store is immutable, so the gate can
/// be cloned into any number of threads without locking.
#[derive(Debug, Clone)]
pub struct ProtectionGate {
    rules: Arc<RuleStore>,
}

impl ProtectionGate {
    pub fn new(rules: Arc<RuleStore>) -> Self {
        Self { rules }
    }

    /// Path must match byte for byte; the action matches case-insensitively
    /// or through an `all` rule. The first matching rule wins.
    pub fn is_protected(&self, path: &str, action: ActionKind) -> bool {
        debug!(path, %action, rules = self.rules.len(), "checking protection");
        for rule in self.rules.iter() {
            trace!(rule_path = %rule.path, rule_action = %rule.action, "scanning rule");
            if rule.path == path
                && (rule.applies_to_all_actions() || action.matches_label(&rule.action))
            {
                debug!(path, %action, rule_action = %rule.action, "path is protected");
                return true;
            }
        }
        debug!(path, %action, "path is not protected");
        false
    }
}
