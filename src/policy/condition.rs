//! Condition evaluation: single predicates and AND/OR groups

use super::ip::is_ip_in_range;
use super::signal::SignalEvaluator;
use crate::domain::{AuthContext, Condition, ConditionField, ConditionGroup, ConditionOperator, GroupOperator};
use crate::error::Result;
use crate::repository::ActivityRepository;
use futures::future::try_join_all;
use metrics::counter;
use serde_json::Value;
use std::sync::Arc;

pub struct ConditionEvaluator<A: ActivityRepository> {
    signals: SignalEvaluator<A>,
}

impl<A: ActivityRepository> ConditionEvaluator<A> {
    pub fn new(activity_repo: Arc<A>) -> Self {
        Self {
            signals: SignalEvaluator::new(activity_repo),
        }
    }

    /// Combine a group's conditions. An empty group always matches; an
    /// unrecognized group operator never does.
    pub async fn evaluate_group(&self, group: &ConditionGroup, context: &AuthContext) -> Result<bool> {
        if group.rules.is_empty() {
            return Ok(true);
        }

        if let GroupOperator::Unknown(op) = &group.operator {
            tracing::warn!(operator = %op, "unknown condition group operator, group never matches");
            counter!("authgate_rules_config_warnings_total", "kind" => "unknown_group_operator")
                .increment(1);
            return Ok(false);
        }

        let outcomes = try_join_all(group.rules.iter().map(|c| self.evaluate(c, context))).await?;

        Ok(match group.operator {
            GroupOperator::And => outcomes.iter().all(|matched| *matched),
            GroupOperator::Or => outcomes.iter().any(|matched| *matched),
            GroupOperator::Unknown(_) => false,
        })
    }

    pub async fn evaluate(&self, condition: &Condition, context: &AuthContext) -> Result<bool> {
        let matched = match &condition.field {
            ConditionField::Signal(kind) => {
                self.signals
                    .check(*kind, &condition.operator, &condition.value, context)
                    .await?
            }
            ConditionField::Path(path) => {
                compare_field(path, &condition.operator, &condition.value, context)
            }
        };

        tracing::trace!(
            field = ?condition.field,
            operator = %condition.operator,
            matched,
            "condition evaluated"
        );
        Ok(matched)
    }
}

/// Evaluate a non-signal condition against the context.
pub fn compare_field(
    path: &str,
    operator: &ConditionOperator,
    expected: &Value,
    context: &AuthContext,
) -> bool {
    let actual = context.resolve(path);

    match operator {
        ConditionOperator::Equals => actual.as_ref() == Some(expected),
        ConditionOperator::NotEquals => actual.as_ref() != Some(expected),
        ConditionOperator::Contains => match actual.as_ref().filter(|v| is_truthy(v)) {
            Some(v) => coerce_string(v).contains(&coerce_string(expected)),
            None => false,
        },
        ConditionOperator::NotContains => match actual.as_ref().filter(|v| is_truthy(v)) {
            Some(v) => !coerce_string(v).contains(&coerce_string(expected)),
            None => true,
        },
        ConditionOperator::StartsWith => match present(actual.as_ref()) {
            Some(v) => coerce_string(v).starts_with(&coerce_string(expected)),
            None => false,
        },
        ConditionOperator::EndsWith => match present(actual.as_ref()) {
            Some(v) => coerce_string(v).ends_with(&coerce_string(expected)),
            None => false,
        },
        ConditionOperator::In => match (expected.as_array(), actual.as_ref()) {
            (Some(candidates), Some(v)) => candidates.contains(v),
            _ => false,
        },
        ConditionOperator::NotIn => match (expected.as_array(), actual.as_ref()) {
            (Some(candidates), Some(v)) => !candidates.contains(v),
            _ => true,
        },
        ConditionOperator::IpInRange => match (actual.as_ref().and_then(Value::as_str), expected.as_str()) {
            (Some(ip), Some(range)) => is_ip_in_range(ip, range),
            _ => false,
        },
        ConditionOperator::IpEquals => match (context.ip_address(), expected.as_str()) {
            (Some(ip), Some(wanted)) => ip == wanted,
            _ => false,
        },
        ConditionOperator::CountryEquals => match (context.geo_country(), expected.as_str()) {
            (Some(country), Some(wanted)) => country == wanted,
            _ => false,
        },
        ConditionOperator::CountryIn => match (expected.as_array(), context.geo_country()) {
            (Some(countries), Some(country)) => countries.iter().any(|c| c.as_str() == Some(country)),
            _ => false,
        },
        ConditionOperator::CountryNotIn => match (expected.as_array(), context.geo_country()) {
            (Some(countries), Some(country)) => !countries.iter().any(|c| c.as_str() == Some(country)),
            _ => true,
        },
        ConditionOperator::Threshold(_) | ConditionOperator::Unknown(_) => {
            tracing::warn!(field = path, operator = %operator, "unsupported condition operator");
            counter!("authgate_rules_config_warnings_total", "kind" => "unknown_operator")
                .increment(1);
            false
        }
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// String form of a JSON value, as used by the substring operators.
fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => coerce_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SignalKind, ThresholdComparator};
    use crate::error::AppError;
    use crate::repository::activity::MockActivityRepository;
    use rstest::rstest;
    use serde_json::json;

    fn context() -> AuthContext {
        serde_json::from_value(json!({
            "username": "alice",
            "email": "alice@example.com",
            "ip_address": "192.168.1.42",
            "geo_country": "FR",
            "geo_city": "Paris",
            "user_auth_methods": ["passkey", "email_otp"],
            "device": { "platform": "ios" }
        }))
        .unwrap()
    }

    fn condition(value: Value) -> Condition {
        serde_json::from_value(value).unwrap()
    }

    fn evaluator() -> ConditionEvaluator<MockActivityRepository> {
        ConditionEvaluator::new(Arc::new(MockActivityRepository::new()))
    }

    #[rstest]
    #[case("geo_country", "equals", json!("FR"), true)]
    #[case("country", "equals", json!("RU"), false)]
    #[case("geo_country", "not_equals", json!("RU"), true)]
    #[case("email", "contains", json!("@example."), true)]
    #[case("email", "not_contains", json!("@example."), false)]
    #[case("geo_city", "not_contains", json!("Lyon"), true)]
    #[case("missing", "contains", json!("x"), false)]
    #[case("missing", "not_contains", json!("x"), true)]
    #[case("username", "starts_with", json!("ali"), true)]
    #[case("email", "ends_with", json!(".org"), false)]
    #[case("missing", "starts_with", json!(""), false)]
    #[case("city", "in", json!(["Paris", "Berlin"]), true)]
    #[case("city", "in", json!("Paris"), false)]
    #[case("city", "not_in", json!(["Berlin"]), true)]
    #[case("city", "not_in", json!("Paris"), true)]
    #[case("missing", "not_in", json!(["Paris"]), true)]
    #[case("ip", "ip_in_range", json!("192.168.1.0/24"), true)]
    #[case("ip_address", "ip_in_range", json!("192.168.2.0/24"), false)]
    #[case("device.platform", "equals", json!("ios"), true)]
    #[case("device.model", "equals", json!("ios"), false)]
    #[case("user_auth_methods", "contains", json!("email_otp"), true)]
    #[case("username", "ip_equals", json!("192.168.1.42"), true)]
    #[case("username", "country_equals", json!("FR"), true)]
    #[case("username", "country_in", json!(["DE", "FR"]), true)]
    #[case("username", "country_in", json!("FR"), false)]
    #[case("username", "country_not_in", json!(["DE", "FR"]), false)]
    #[case("username", "country_not_in", json!(null), true)]
    #[case("username", "matches", json!("alice"), false)]
    #[case("username", "gt", json!(1), false)]
    fn test_compare_field(
        #[case] field: &str,
        #[case] operator: &str,
        #[case] value: Value,
        #[case] expected: bool,
    ) {
        let cond = condition(json!({ "field": field, "operator": operator, "value": value }));
        let ConditionField::Path(path) = &cond.field else {
            panic!("expected a path field");
        };
        assert_eq!(
            compare_field(path, &cond.operator, &cond.value, &context()),
            expected
        );
    }

    #[test]
    fn test_equals_is_strict() {
        let ctx: AuthContext = serde_json::from_value(json!({ "risk": { "score": 5 } })).unwrap();
        assert!(compare_field("risk.score", &ConditionOperator::Equals, &json!(5), &ctx));
        assert!(!compare_field("risk.score", &ConditionOperator::Equals, &json!("5"), &ctx));
    }

    #[test]
    fn test_country_operators_without_country() {
        let ctx = AuthContext::default();
        assert!(!compare_field("x", &ConditionOperator::CountryEquals, &json!("FR"), &ctx));
        assert!(!compare_field("x", &ConditionOperator::CountryIn, &json!(["FR"]), &ctx));
        assert!(compare_field("x", &ConditionOperator::CountryNotIn, &json!(["FR"]), &ctx));
        assert!(!compare_field("x", &ConditionOperator::IpEquals, &json!("1.2.3.4"), &ctx));
    }

    #[tokio::test]
    async fn test_group_and_or() {
        let evaluator = evaluator();
        let mut group: ConditionGroup = serde_json::from_value(json!({
            "operator": "AND",
            "rules": [
                { "field": "geo_country", "operator": "equals", "value": "FR" },
                { "field": "geo_country", "operator": "equals", "value": "RU" }
            ]
        }))
        .unwrap();

        assert!(!evaluator.evaluate_group(&group, &context()).await.unwrap());

        group.operator = GroupOperator::Or;
        assert!(evaluator.evaluate_group(&group, &context()).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_group_matches() {
        let group = ConditionGroup {
            operator: GroupOperator::Unknown("XOR".to_string()),
            rules: vec![],
        };
        assert!(evaluator().evaluate_group(&group, &context()).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_group_operator_never_matches() {
        let group: ConditionGroup = serde_json::from_value(json!({
            "operator": "XOR",
            "rules": [{ "field": "geo_country", "operator": "equals", "value": "FR" }]
        }))
        .unwrap();
        assert!(!evaluator().evaluate_group(&group, &context()).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_group_operator_never_matches() {
        let group: ConditionGroup = serde_json::from_value(json!({
            "rules": [{ "field": "geo_country", "operator": "equals", "value": "FR" }]
        }))
        .unwrap();
        assert_eq!(group.operator, GroupOperator::Unknown(String::new()));
        assert!(!evaluator().evaluate_group(&group, &context()).await.unwrap());
    }

    #[tokio::test]
    async fn test_signal_condition_delegates() {
        let mut mock = MockActivityRepository::new();
        mock.expect_count_by_ip().returning(|_, _, _| Ok(10));
        let evaluator = ConditionEvaluator::new(Arc::new(mock));

        let cond = condition(json!({
            "field": "ip_activity_threshold",
            "operator": "gte",
            "value": { "activityThreshold": 10 }
        }));
        assert_eq!(
            cond.field,
            ConditionField::Signal(SignalKind::IpActivityThreshold)
        );
        assert_eq!(
            cond.operator,
            ConditionOperator::Threshold(ThresholdComparator::Gte)
        );
        assert!(evaluator.evaluate(&cond, &context()).await.unwrap());
    }

    #[tokio::test]
    async fn test_group_propagates_signal_error() {
        let mut mock = MockActivityRepository::new();
        mock.expect_distinct_countries_by_username()
            .returning(|_, _| Err(AppError::Database(sqlx::Error::PoolClosed)));
        let evaluator = ConditionEvaluator::new(Arc::new(mock));

        let group: ConditionGroup = serde_json::from_value(json!({
            "operator": "OR",
            "rules": [
                { "field": "geo_country", "operator": "equals", "value": "FR" },
                { "field": "user_country_jump", "value": {} }
            ]
        }))
        .unwrap();

        let err = evaluator.evaluate_group(&group, &context()).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn test_coerce_string() {
        assert_eq!(coerce_string(&json!(["a", null, 3])), "a,,3");
        assert_eq!(coerce_string(&json!({ "k": 1 })), "[object Object]");
        assert_eq!(coerce_string(&json!(true)), "true");
        assert_eq!(coerce_string(&json!(2.5)), "2.5");
    }

    #[test]
    fn test_is_truthy() {
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(false)));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!("0")));
    }
}
