//! Applying a matched rule's actions to an in-progress decision.
//!
//! Every step takes the current [`EvaluationResult`] by value and returns the
//! next one; nothing is shared across the action list.

use crate::domain::{Action, EvaluationResult};
use metrics::counter;

pub const DEFAULT_BLOCK_REASON: &str = "Access blocked by security policy";
pub const NO_METHODS_REASON: &str = "No authentication methods allowed";

/// Result of applying a single action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStep {
    Continue(EvaluationResult),
    /// `block_access` ran; the rest of the list is skipped.
    Stop(EvaluationResult),
}

pub fn apply_action(result: EvaluationResult, action: &Action) -> ActionStep {
    match action {
        Action::BlockAccess { reason } => ActionStep::Stop(EvaluationResult {
            allowed: false,
            allowed_methods: Default::default(),
            block_reason: Some(
                reason
                    .clone()
                    .unwrap_or_else(|| DEFAULT_BLOCK_REASON.to_string()),
            ),
            ..result
        }),
        Action::Require2fa => {
            tracing::debug!("require_2fa action is reserved and has no effect");
            ActionStep::Continue(result)
        }
        Action::AllowMethods {
            methods: Some(methods),
        } => ActionStep::Continue(EvaluationResult {
            allowed_methods: methods.iter().cloned().collect(),
            ..result
        }),
        Action::DenyMethods {
            methods: Some(methods),
        } => {
            let mut allowed_methods = result.allowed_methods;
            let mut denied_methods = result.denied_methods;
            for method in methods {
                allowed_methods.remove(method);
                denied_methods.insert(method.clone());
            }
            ActionStep::Continue(EvaluationResult {
                allowed_methods,
                denied_methods,
                ..result
            })
        }
        Action::AllowMethods { methods: None } | Action::DenyMethods { methods: None } => {
            tracing::warn!(action = action.kind(), "action is missing `methods`, skipping");
            counter!("authgate_rules_config_warnings_total", "kind" => "missing_methods")
                .increment(1);
            ActionStep::Continue(result)
        }
        Action::Unknown => {
            tracing::warn!("unknown action type, skipping");
            counter!("authgate_rules_config_warnings_total", "kind" => "unknown_action")
                .increment(1);
            ActionStep::Continue(result)
        }
    }
}

/// Apply one rule's action list in order.
///
/// Stops at the first `block_access`. Otherwise, an empty allowed set at the
/// end blocks access, keeping any block reason already recorded.
pub fn apply_actions(result: EvaluationResult, actions: &[Action]) -> EvaluationResult {
    let mut current = result;
    for action in actions {
        match apply_action(current, action) {
            ActionStep::Continue(next) => current = next,
            ActionStep::Stop(blocked) => return blocked,
        }
    }

    if current.allowed_methods.is_empty() {
        let block_reason = current
            .block_reason
            .take()
            .unwrap_or_else(|| NO_METHODS_REASON.to_string());
        return EvaluationResult {
            allowed: false,
            block_reason: Some(block_reason),
            ..current
        };
    }

    current
}
