//! Evaluation results produced by the rules engine

use super::rule::AppliedRule;
use serde::Serialize;
use std::collections::BTreeSet;

/// The decision for one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub allowed: bool,
    pub allowed_methods: BTreeSet<String>,
    pub denied_methods: BTreeSet<String>,
    pub applied_rules: Vec<AppliedRule>,
    pub block_reason: Option<String>,
}

impl EvaluationResult {
    /// Starting state: everything in `methods` is allowed, nothing applied.
    pub fn initial<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: true,
            allowed_methods: methods.into_iter().map(Into::into).collect(),
            denied_methods: BTreeSet::new(),
            applied_rules: Vec::new(),
            block_reason: None,
        }
    }
}

/// Outcome of [`crate::policy::RulesEngine::evaluate`].
///
/// `DegradedAllow` means the engine itself failed and fell back to allowing
/// the user's registered methods. Callers should alert on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Decided(EvaluationResult),
    DegradedAllow {
        #[serde(flatten)]
        result: EvaluationResult,
        error: String,
    },
}

impl EvaluationOutcome {
    pub fn result(&self) -> &EvaluationResult {
        match self {
            EvaluationOutcome::Decided(result) => result,
            EvaluationOutcome::DegradedAllow { result, .. } => result,
        }
    }

    pub fn into_result(self) -> EvaluationResult {
        match self {
            EvaluationOutcome::Decided(result) => result,
            EvaluationOutcome::DegradedAllow { result, .. } => result,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, EvaluationOutcome::DegradedAllow { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            EvaluationOutcome::Decided(_) => None,
            EvaluationOutcome::DegradedAllow { error, .. } => Some(error),
        }
    }

    /// Label used for the evaluation counter
    pub fn label(&self) -> &'static str {
        match self {
            EvaluationOutcome::DegradedAllow { .. } => "degraded",
            EvaluationOutcome::Decided(result) if result.allowed => "allowed",
            EvaluationOutcome::Decided(_) => "blocked",
        }
    }
}
