//! Authentication rule domain models.
//!
//! Rules are stored as JSON documents (conditions and actions) and parsed into
//! closed enums here, so the evaluator matches exhaustively instead of
//! branching on strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A prioritized (conditions -> actions) policy entry. Lower priority runs first.
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
    #[serde(default)]
    pub conditions: ConditionGroup,
    #[serde(default)]
    pub actions: RuleActions,
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    pub fn applied(&self) -> AppliedRule {
        AppliedRule {
            id: self.id,
            name: self.name.clone(),
            priority: self.priority,
        }
    }
}

/// Summary of a rule whose conditions matched during an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedRule {
    pub id: i64,
    pub name: String,
    pub priority: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConditionGroup {
    #[serde(default)]
    pub operator: GroupOperator,
    #[serde(default)]
    pub rules: Vec<Condition>,
}

/// `AND` / `OR`; anything else, including a missing operator, never matches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum GroupOperator {
    And,
    Or,
    Unknown(String),
}

impl Default for GroupOperator {
    fn default() -> Self {
        GroupOperator::Unknown(String::new())
    }
}

impl From<String> for GroupOperator {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "AND" => GroupOperator::And,
            "OR" => GroupOperator::Or,
            _ => GroupOperator::Unknown(raw),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub field: ConditionField,
    #[serde(default)]
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: Value,
}

/// What a condition reads: a context attribute or a historical-activity signal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ConditionField {
    Signal(SignalKind),
    Path(String),
}

impl From<String> for ConditionField {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "ip_activity_threshold" => ConditionField::Signal(SignalKind::IpActivityThreshold),
            "ip_multi_account" => ConditionField::Signal(SignalKind::IpMultiAccount),
            "user_country_jump" => ConditionField::Signal(SignalKind::UserCountryJump),
            "country" => ConditionField::Path("geo_country".to_string()),
            "city" => ConditionField::Path("geo_city".to_string()),
            "ip" => ConditionField::Path("ip_address".to_string()),
            _ => ConditionField::Path(raw),
        }
    }
}

/// Stateful checks backed by the activity log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    IpActivityThreshold,
    IpMultiAccount,
    UserCountryJump,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::IpActivityThreshold => "ip_activity_threshold",
            SignalKind::IpMultiAccount => "ip_multi_account",
            SignalKind::UserCountryJump => "user_country_jump",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    IpInRange,
    IpEquals,
    CountryEquals,
    CountryIn,
    CountryNotIn,
    /// Count comparison, only meaningful for signal conditions
    Threshold(ThresholdComparator),
    Unknown(String),
}

impl Default for ConditionOperator {
    fn default() -> Self {
        ConditionOperator::Unknown(String::new())
    }
}

impl From<String> for ConditionOperator {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "equals" => ConditionOperator::Equals,
            "not_equals" => ConditionOperator::NotEquals,
            "contains" => ConditionOperator::Contains,
            "not_contains" => ConditionOperator::NotContains,
            "starts_with" => ConditionOperator::StartsWith,
            "ends_with" => ConditionOperator::EndsWith,
            "in" => ConditionOperator::In,
            "not_in" => ConditionOperator::NotIn,
            "ip_in_range" => ConditionOperator::IpInRange,
            "ip_equals" => ConditionOperator::IpEquals,
            "country_equals" => ConditionOperator::CountryEquals,
            "country_in" => ConditionOperator::CountryIn,
            "country_not_in" => ConditionOperator::CountryNotIn,
            _ => match raw.parse::<ThresholdComparator>() {
                Ok(cmp) => ConditionOperator::Threshold(cmp),
                Err(_) => ConditionOperator::Unknown(raw),
            },
        }
    }
}

impl std::fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionOperator::Equals => write!(f, "equals"),
            ConditionOperator::NotEquals => write!(f, "not_equals"),
            ConditionOperator::Contains => write!(f, "contains"),
            ConditionOperator::NotContains => write!(f, "not_contains"),
            ConditionOperator::StartsWith => write!(f, "starts_with"),
            ConditionOperator::EndsWith => write!(f, "ends_with"),
            ConditionOperator::In => write!(f, "in"),
            ConditionOperator::NotIn => write!(f, "not_in"),
            ConditionOperator::IpInRange => write!(f, "ip_in_range"),
            ConditionOperator::IpEquals => write!(f, "ip_equals"),
            ConditionOperator::CountryEquals => write!(f, "country_equals"),
            ConditionOperator::CountryIn => write!(f, "country_in"),
            ConditionOperator::CountryNotIn => write!(f, "country_not_in"),
            ConditionOperator::Threshold(cmp) => write!(f, "{}", cmp),
            ConditionOperator::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdComparator {
    #[default]
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

impl ThresholdComparator {
    pub fn compare(&self, count: i64, threshold: f64) -> bool {
        let count = count as f64;
        match self {
            ThresholdComparator::Gt => count > threshold,
            ThresholdComparator::Gte => count >= threshold,
            ThresholdComparator::Lt => count < threshold,
            ThresholdComparator::Lte => count <= threshold,
            ThresholdComparator::Eq => count == threshold,
            ThresholdComparator::Neq => count != threshold,
        }
    }
}

impl std::str::FromStr for ThresholdComparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gt" => Ok(ThresholdComparator::Gt),
            "gte" => Ok(ThresholdComparator::Gte),
            "lt" => Ok(ThresholdComparator::Lt),
            "lte" => Ok(ThresholdComparator::Lte),
            "eq" => Ok(ThresholdComparator::Eq),
            "neq" => Ok(ThresholdComparator::Neq),
            _ => Err(format!("Unknown threshold operator: {}", s)),
        }
    }
}

impl std::fmt::Display for ThresholdComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThresholdComparator::Gt => write!(f, "gt"),
            ThresholdComparator::Gte => write!(f, "gte"),
            ThresholdComparator::Lt => write!(f, "lt"),
            ThresholdComparator::Lte => write!(f, "lte"),
            ThresholdComparator::Eq => write!(f, "eq"),
            ThresholdComparator::Neq => write!(f, "neq"),
        }
    }
}

/// Configuration object carried in a signal condition's `value`.
///
/// Numbers are read as `f64`: JSON columns hand back `10.0` as readily as `10`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalConfig {
    #[serde(default)]
    pub time_window_minutes: Option<f64>,
    #[serde(default)]
    pub activity_threshold: Option<f64>,
    #[serde(default)]
    pub account_threshold: Option<f64>,
    #[serde(default)]
    pub operator: Option<String>,
}

impl SignalConfig {
    /// `None` when the value is absent, not an object, or has badly typed fields.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    BlockAccess {
        #[serde(default)]
        reason: Option<String>,
    },
    /// Reserved; parsed but carries no effect yet
    #[serde(rename = "require_2fa")]
    Require2fa,
    AllowMethods {
        #[serde(default)]
        methods: Option<Vec<String>>,
    },
    DenyMethods {
        #[serde(default)]
        methods: Option<Vec<String>>,
    },
    #[serde(other)]
    Unknown,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::BlockAccess { .. } => "block_access",
            Action::Require2fa => "require_2fa",
            Action::AllowMethods { .. } => "allow_methods",
            Action::DenyMethods { .. } => "deny_methods",
            Action::Unknown => "unknown",
        }
    }
}

/// A rule's actions, stored either as a single object or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RuleActions {
    Many(Vec<Action>),
    One(Action),
}

impl Default for RuleActions {
    fn default() -> Self {
        RuleActions::Many(Vec::new())
    }
}

impl RuleActions {
    pub fn as_slice(&self) -> &[Action] {
        match self {
            RuleActions::Many(actions) => actions,
            RuleActions::One(action) => std::slice::from_ref(action),
        }
    }
}
