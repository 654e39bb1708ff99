//! Authentication rule repository (read-only)

use crate::domain::{ConditionGroup, Rule, RuleActions};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::{FromRow, MySqlPool};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// All enabled rules, ascending by priority.
    async fn list_enabled_by_priority(&self) -> Result<Vec<Rule>>;
}

#[derive(Debug, Clone, FromRow)]
struct RuleRow {
    id: i64,
    name: String,
    priority: i32,
    is_enabled: bool,
    conditions: Option<String>,
    actions: Option<String>,
}

impl TryFrom<RuleRow> for Rule {
    type Error = AppError;

    fn try_from(row: RuleRow) -> Result<Self> {
        let conditions: ConditionGroup = match row.conditions.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)?,
            _ => ConditionGroup::default(),
        };
        let actions: RuleActions = match row.actions.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)?,
            _ => RuleActions::default(),
        };

        Ok(Rule {
            id: row.id,
            name: row.name,
            priority: row.priority,
            is_enabled: row.is_enabled,
            conditions,
            actions,
        })
    }
}

pub struct RuleRepositoryImpl {
    pool: MySqlPool,
}

impl RuleRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleRepository for RuleRepositoryImpl {
    async fn list_enabled_by_priority(&self) -> Result<Vec<Rule>> {
        let rows = sqlx::query_as::<_, RuleRow>(
            r#"
            SELECT id, name, priority, is_enabled,
                   CAST(conditions AS CHAR) AS conditions,
                   CAST(actions AS CHAR) AS actions
            FROM auth_rules
            WHERE is_enabled = TRUE
            ORDER BY priority ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Rule::try_from).collect()
    }
}
