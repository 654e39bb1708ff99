//! Activity log queries backing the velocity signals

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

/// Read-only view over the append-only authentication activity log.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Events from `ip_address` since `since`; successful ones only when `success_only`.
    async fn count_by_ip(
        &self,
        ip_address: &str,
        since: DateTime<Utc>,
        success_only: bool,
    ) -> Result<i64>;

    /// Distinct usernames with a successful authentication from `ip_address`.
    async fn count_distinct_usernames_by_ip(
        &self,
        ip_address: &str,
        since: DateTime<Utc>,
    ) -> Result<i64>;

    /// Distinct non-null countries of successful logins for `username`.
    async fn distinct_countries_by_username(
        &self,
        username: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>>;
}

pub struct ActivityRepositoryImpl {
    pool: MySqlPool,
}

impl ActivityRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepository for ActivityRepositoryImpl {
    async fn count_by_ip(
        &self,
        ip_address: &str,
        since: DateTime<Utc>,
        success_only: bool,
    ) -> Result<i64> {
        let sql = if success_only {
            r#"
            SELECT COUNT(*)
            FROM activity_logs
            WHERE ip_address = ?
              AND success = TRUE
              AND created_at >= ?
            "#
        } else {
            r#"
            SELECT COUNT(*)
            FROM activity_logs
            WHERE ip_address = ?
              AND created_at >= ?
            "#
        };

        let row: (i64,) = sqlx::query_as(sql)
            .bind(ip_address)
            .bind(since)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    async fn count_distinct_usernames_by_ip(
        &self,
        ip_address: &str,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT username)
            FROM activity_logs
            WHERE ip_address = ?
              AND success = TRUE
              AND created_at >= ?
            "#,
        )
        .bind(ip_address)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    async fn distinct_countries_by_username(
        &self,
        username: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT geo_country
            FROM activity_logs
            WHERE username = ?
              AND success = TRUE
              AND geo_country IS NOT NULL
              AND created_at >= ?
            "#,
        )
        .bind(username)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(country,)| country).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    #[tokio::test]
    async fn test_mock_count_by_ip() {
        let mut mock = MockActivityRepository::new();
        let since = Utc::now() - chrono::Duration::minutes(5);

        mock.expect_count_by_ip()
            .with(eq("192.168.1.1"), always(), eq(false))
            .returning(|_, _, _| Ok(12));

        let count = mock.count_by_ip("192.168.1.1", since, false).await.unwrap();
        assert_eq!(count, 12);
    }

    #[tokio::test]
    async fn test_mock_distinct_countries() {
        let mut mock = MockActivityRepository::new();
        let since = Utc::now() - chrono::Duration::minutes(30);

        mock.expect_distinct_countries_by_username()
            .with(eq("alice"), always())
            .returning(|_, _| Ok(vec!["US".to_string(), "FR".to_string()]));

        let countries = mock
            .distinct_countries_by_username("alice", since)
            .await
            .unwrap();
        assert_eq!(countries, vec!["US", "FR"]);
    }
}
