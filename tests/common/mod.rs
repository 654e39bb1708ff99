//! Common test utilities: in-memory storage collaborators

use async_trait::async_trait;
use authgate_rules::domain::Rule;
use authgate_rules::error::{AppError, Result};
use authgate_rules::repository::{ActivityRepository, RuleRepository};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

pub struct InMemoryRuleRepository {
    rules: Vec<Rule>,
    fail: bool,
}

impl InMemoryRuleRepository {
    pub fn empty() -> Self {
        Self {
            rules: vec![],
            fail: false,
        }
    }

    /// Rules as they would come out of the store, in any order.
    pub fn from_json(value: serde_json::Value) -> Self {
        Self {
            rules: serde_json::from_value(value).expect("invalid rule fixture"),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            rules: vec![],
            fail: true,
        }
    }
}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn list_enabled_by_priority(&self) -> Result<Vec<Rule>> {
        if self.fail {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut rules: Vec<Rule> = self.rules.iter().filter(|r| r.is_enabled).cloned().collect();
        rules.sort_by_key(|r| r.priority);
        Ok(rules)
    }
}

#[derive(Debug, Clone)]
pub struct ActivityEvent {
    pub username: String,
    pub ip_address: String,
    pub geo_country: Option<String>,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryActivityRepository {
    events: Vec<ActivityEvent>,
}

impl InMemoryActivityRepository {
    pub fn new(events: Vec<ActivityEvent>) -> Self {
        Self { events }
    }

    fn since(&self, since: DateTime<Utc>) -> impl Iterator<Item = &ActivityEvent> {
        self.events.iter().filter(move |e| e.created_at >= since)
    }
}

#[async_trait]
impl ActivityRepository for InMemoryActivityRepository {
    async fn count_by_ip(
        &self,
        ip_address: &str,
        since: DateTime<Utc>,
        success_only: bool,
    ) -> Result<i64> {
        Ok(self
            .since(since)
            .filter(|e| e.ip_address == ip_address && (!success_only || e.success))
            .count() as i64)
    }

    async fn count_distinct_usernames_by_ip(
        &self,
        ip_address: &str,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let usernames: HashSet<&str> = self
            .since(since)
            .filter(|e| e.ip_address == ip_address && e.success)
            .map(|e| e.username.as_str())
            .collect();
        Ok(usernames.len() as i64)
    }

    async fn distinct_countries_by_username(
        &self,
        username: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let mut countries: Vec<String> = Vec::new();
        for event in self.since(since).filter(|e| e.username == username && e.success) {
            if let Some(country) = &event.geo_country {
                if !countries.contains(country) {
                    countries.push(country.clone());
                }
            }
        }
        Ok(countries)
    }
}
