//! Authentication rules engine.
//!
//! Decides which sign-in methods a user may use for one authentication
//! attempt. Enabled rules run in ascending priority; a matching rule applies
//! its actions, and the first rule that blocks access ends the evaluation.

pub mod action;
pub mod condition;
pub mod ip;
pub mod signal;

pub use action::{apply_action, apply_actions, ActionStep};
pub use condition::ConditionEvaluator;
pub use ip::is_ip_in_range;
pub use signal::SignalEvaluator;

use crate::config::RulesEngineConfig;
use crate::domain::{AuthContext, EvaluationOutcome, EvaluationResult};
use crate::error::Result;
use crate::repository::{ActivityRepository, RuleRepository};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

pub struct RulesEngine<R: RuleRepository, A: ActivityRepository> {
    rule_repo: Arc<R>,
    conditions: ConditionEvaluator<A>,
    config: RulesEngineConfig,
}

impl<R: RuleRepository, A: ActivityRepository> RulesEngine<R, A> {
    pub fn new(rule_repo: Arc<R>, activity_repo: Arc<A>, config: RulesEngineConfig) -> Self {
        Self {
            rule_repo,
            conditions: ConditionEvaluator::new(activity_repo),
            config,
        }
    }

    /// Evaluate the rules for one authentication attempt.
    ///
    /// Never fails. If the rule store, a signal query or a stored rule
    /// document breaks, the result fails open: the user's registered methods
    /// (or the configured defaults) are allowed and the outcome is
    /// [`EvaluationOutcome::DegradedAllow`] carrying the error. A broken rule
    /// therefore stops enforcing its policy until it is fixed.
    #[tracing::instrument(
        name = "rules.evaluate",
        skip_all,
        fields(username = ?context.username, ip = ?context.ip_address)
    )]
    pub async fn evaluate(&self, context: &AuthContext) -> EvaluationOutcome {
        let started = Instant::now();

        let outcome = match self.try_evaluate(context).await {
            Ok(result) => EvaluationOutcome::Decided(result),
            Err(err) => {
                tracing::error!(
                    error = %err,
                    kind = err.kind(),
                    "rules evaluation failed, allowing registered methods"
                );
                EvaluationOutcome::DegradedAllow {
                    result: self.initial_result(context),
                    error: err.to_string(),
                }
            }
        };

        histogram!("authgate_rules_evaluation_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        counter!("authgate_rules_evaluations_total", "outcome" => outcome.label()).increment(1);

        outcome
    }

    async fn try_evaluate(&self, context: &AuthContext) -> Result<EvaluationResult> {
        let mut rules = self.rule_repo.list_enabled_by_priority().await?;
        let mut result = self.initial_result(context);

        if rules.is_empty() {
            tracing::debug!("no rules configured, allowing registered methods");
            return Ok(result);
        }

        // Stable, so equal priorities keep the store's order.
        rules.sort_by_key(|rule| rule.priority);

        for rule in rules.iter().filter(|rule| rule.is_enabled) {
            if !self.conditions.evaluate_group(&rule.conditions, context).await? {
                continue;
            }

            tracing::debug!(rule_id = rule.id, rule = %rule.name, priority = rule.priority, "rule matched");
            counter!("authgate_rules_applied_total").increment(1);

            result.applied_rules.push(rule.applied());
            result = apply_actions(result, rule.actions.as_slice());

            if !result.allowed {
                tracing::info!(
                    rule_id = rule.id,
                    rule = %rule.name,
                    reason = result.block_reason.as_deref().unwrap_or_default(),
                    "access blocked"
                );
                break;
            }
        }

        Ok(result)
    }

    fn initial_result(&self, context: &AuthContext) -> EvaluationResult {
        if context.user_auth_methods.is_empty() {
            EvaluationResult::initial(self.config.default_auth_methods.iter().cloned())
        } else {
            EvaluationResult::initial(context.user_auth_methods.iter().cloned())
        }
    }
}
