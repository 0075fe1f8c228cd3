use super::{CredentialStore, Identity, Profile, ProfilePatch, StoreError, UpdateOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Connection, PgConnection, PgPool, Row};
use std::time::Duration;
use tracing::{info, info_span, Instrument};

pub const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

/// Postgres-backed store. Clones share the same pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool to `dsn`.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Create the `users` table on the database behind `dsn`.
///
/// # Errors
/// Returns an error if the connection or any statement fails.
pub async fn apply_schema(dsn: &str) -> Result<()> {
    let mut connection = PgConnection::connect(dsn)
        .await
        .context("Failed to connect for schema setup")?;

    for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
        sqlx::query(statement)
            .execute(&mut connection)
            .await
            .with_context(|| format!("Failed to execute schema statement {}", index + 1))?;
    }

    info!("Schema applied");

    Ok(())
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }

        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            statements.push(current.trim().trim_end_matches(';').to_string());
            current.clear();
        }
    }

    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }

    statements
}

fn db_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn upsert(&self, identity: &Identity) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO users (email, secret, given_name, family_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET given_name = EXCLUDED.given_name,
                family_name = EXCLUDED.family_name
        ";

        sqlx::query(query)
            .bind(&identity.email)
            .bind(&identity.secret_hash)
            .bind(&identity.given_name)
            .bind(&identity.family_name)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await?;

        Ok(())
    }

    async fn update_profile(
        &self,
        email: &str,
        patch: &ProfilePatch,
    ) -> Result<UpdateOutcome, StoreError> {
        let query = r"
            UPDATE users
            SET given_name = COALESCE($2, given_name),
                family_name = COALESCE($3, family_name)
            WHERE email = $1
        ";

        let result = sqlx::query(query)
            .bind(email)
            .bind(patch.given_name.as_deref())
            .bind(patch.family_name.as_deref())
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await?;

        if result.rows_affected() == 0 {
            Ok(UpdateOutcome::NotFound)
        } else {
            Ok(UpdateOutcome::Updated)
        }
    }

    async fn secret_hash(&self, email: &str) -> Result<Option<String>, StoreError> {
        let query = "SELECT secret FROM users WHERE email = $1";

        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        Ok(row.map(|row| row.get("secret")))
    }

    async fn profile(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        let query = "SELECT email, given_name, family_name FROM users WHERE email = $1";

        Ok(sqlx::query_as::<_, Profile>(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_splits_into_single_statement() {
        let statements = split_sql_statements(SCHEMA_SQL);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS users"));
        assert!(!statements[0].ends_with(';'));
    }

    #[test]
    fn split_ignores_comments_and_blank_lines() {
        let sql = "-- one\nSELECT 1;\n\n-- two\nSELECT\n  2;\n";
        let statements = split_sql_statements(sql);
        assert_eq!(statements, vec!["SELECT 1".to_string(), "SELECT\n  2".to_string()]);
    }
}
