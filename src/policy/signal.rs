//! Velocity and anomaly signals backed by the activity log

use crate::domain::{AuthContext, ConditionOperator, SignalConfig, SignalKind, ThresholdComparator};
use crate::error::Result;
use crate::repository::ActivityRepository;
use chrono::{DateTime, TimeDelta, Utc};
use metrics::counter;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Defaults applied when a signal's configuration omits a field
pub const IP_ACTIVITY_WINDOW_MINS: f64 = 5.0;
pub const IP_ACTIVITY_THRESHOLD: f64 = 10.0;
pub const MULTI_ACCOUNT_WINDOW_MINS: f64 = 10.0;
pub const MULTI_ACCOUNT_THRESHOLD: f64 = 3.0;
pub const COUNTRY_JUMP_WINDOW_MINS: f64 = 30.0;

pub struct SignalEvaluator<A: ActivityRepository> {
    activity_repo: Arc<A>,
}

impl<A: ActivityRepository> SignalEvaluator<A> {
    pub fn new(activity_repo: Arc<A>) -> Self {
        Self { activity_repo }
    }

    /// Run one signal check.
    ///
    /// `value` is the signal's configuration object; without one, or without
    /// the context attribute the signal keys on, the check is false. Storage
    /// errors propagate.
    pub async fn check(
        &self,
        kind: SignalKind,
        operator: &ConditionOperator,
        value: &Value,
        context: &AuthContext,
    ) -> Result<bool> {
        let Some(config) = SignalConfig::from_value(value) else {
            tracing::warn!(signal = %kind, "signal condition has no usable configuration");
            counter!("authgate_rules_config_warnings_total", "kind" => "signal_config")
                .increment(1);
            return Ok(false);
        };

        let matched = match kind {
            SignalKind::IpActivityThreshold => {
                self.ip_activity_threshold(context, &config, operator).await?
            }
            SignalKind::IpMultiAccount => self.ip_multi_account(context, &config).await?,
            SignalKind::UserCountryJump => self.user_country_jump(context, &config).await?,
        };

        counter!(
            "authgate_rules_signal_checks_total",
            "signal" => kind.as_str(),
            "result" => if matched { "hit" } else { "miss" }
        )
        .increment(1);

        Ok(matched)
    }

    /// Compare all activity from the context IP in the window against a threshold.
    async fn ip_activity_threshold(
        &self,
        context: &AuthContext,
        config: &SignalConfig,
        operator: &ConditionOperator,
    ) -> Result<bool> {
        let Some(ip) = context.ip_address() else {
            return Ok(false);
        };

        let window = config.time_window_minutes.unwrap_or(IP_ACTIVITY_WINDOW_MINS);
        let threshold = config.activity_threshold.unwrap_or(IP_ACTIVITY_THRESHOLD);
        let comparator = resolve_comparator(config, operator);
        let Some(since) = window_start(SignalKind::IpActivityThreshold, window) else {
            return Ok(false);
        };

        let count = self.activity_repo.count_by_ip(ip, since, false).await?;

        let matched = comparator.compare(count, threshold);
        tracing::debug!(
            ip,
            count,
            threshold,
            comparator = %comparator,
            window_minutes = window,
            matched,
            "ip_activity_threshold evaluated"
        );
        Ok(matched)
    }

    /// Many distinct accounts authenticating successfully from one IP.
    async fn ip_multi_account(&self, context: &AuthContext, config: &SignalConfig) -> Result<bool> {
        let Some(ip) = context.ip_address() else {
            return Ok(false);
        };

        let window = config
            .time_window_minutes
            .unwrap_or(MULTI_ACCOUNT_WINDOW_MINS);
        let threshold = config.account_threshold.unwrap_or(MULTI_ACCOUNT_THRESHOLD);
        let Some(since) = window_start(SignalKind::IpMultiAccount, window) else {
            return Ok(false);
        };

        let accounts = self
            .activity_repo
            .count_distinct_usernames_by_ip(ip, since)
            .await?;

        let matched = accounts as f64 >= threshold;
        tracing::debug!(
            ip,
            accounts,
            threshold,
            window_minutes = window,
            matched,
            "ip_multi_account evaluated"
        );
        Ok(matched)
    }

    /// Successful logins for the same user from more than one country.
    async fn user_country_jump(&self, context: &AuthContext, config: &SignalConfig) -> Result<bool> {
        let Some(username) = context.username() else {
            return Ok(false);
        };

        let window = config
            .time_window_minutes
            .unwrap_or(COUNTRY_JUMP_WINDOW_MINS);
        let Some(since) = window_start(SignalKind::UserCountryJump, window) else {
            return Ok(false);
        };

        let countries: BTreeSet<String> = self
            .activity_repo
            .distinct_countries_by_username(username, since)
            .await?
            .into_iter()
            .filter(|c| !c.is_empty())
            .collect();

        let matched = countries.len() > 1;
        tracing::debug!(
            username,
            countries = ?countries,
            window_minutes = window,
            matched,
            "user_country_jump evaluated"
        );
        Ok(matched)
    }
}

/// Start of a trailing window of `minutes`, or `None` (with a warning) when
/// the window is not representable as a timestamp.
fn window_start(kind: SignalKind, minutes: f64) -> Option<DateTime<Utc>> {
    let since = to_millis(minutes)
        .and_then(TimeDelta::try_milliseconds)
        .and_then(|window| Utc::now().checked_sub_signed(window));

    if since.is_none() {
        tracing::warn!(signal = %kind, window_minutes = minutes, "signal time window out of range");
        counter!("authgate_rules_config_warnings_total", "kind" => "signal_config").increment(1);
    }
    since
}

fn to_millis(minutes: f64) -> Option<i64> {
    let millis = (minutes * 60_000.0).round();
    // i64::MAX as f64 rounds up to 2^63, so the bound is exclusive
    (millis.is_finite() && millis.abs() < i64::MAX as f64).then_some(millis as i64)
}

/// The configuration's `operator` wins, then a comparator given as the
/// condition operator, then `gt`.
fn resolve_comparator(config: &SignalConfig, operator: &ConditionOperator) -> ThresholdComparator {
    if let Some(raw) = config.operator.as_deref() {
        return match raw.parse::<ThresholdComparator>() {
            Ok(cmp) => cmp,
            Err(err) => {
                tracing::warn!(operator = raw, "{}, falling back to gt", err);
                counter!("authgate_rules_config_warnings_total", "kind" => "unknown_threshold_operator")
                    .increment(1);
                ThresholdComparator::Gt
            }
        };
    }

    match operator {
        ConditionOperator::Threshold(cmp) => *cmp,
        _ => ThresholdComparator::Gt,
    }
}
