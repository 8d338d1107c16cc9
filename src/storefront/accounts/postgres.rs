use async_trait::async_trait;
use sqlx::{Connection, PgPool, Row};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info_span, Instrument};

use super::{Account, AccountStore, NewAccount, RoleRecord, StoreError};

/// Idempotent schema, applied at startup.
pub const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const UNIQUE_VIOLATION: &str = "23505";
const PING_TIMEOUT_SECONDS: u64 = 2;

fn query_span(operation: &'static str) -> tracing::Span {
    tracing::info_span!("db.query", db.system = "postgresql", db.operation = operation)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
}

#[derive(Clone, Debug)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_account_by_identity(&self, email: &str) -> Result<Vec<Account>, StoreError> {
        let query = "SELECT id, email, password FROM users WHERE email = $1";
        let rows = sqlx::query(query)
            .bind(email)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT"))
            .await?;

        rows.iter()
            .map(|row| -> Result<Account, StoreError> {
                Ok(Account {
                    account_id: row.try_get("id")?,
                    email: row.try_get("email")?,
                    password_hash: row.try_get("password")?,
                })
            })
            .collect()
    }

    async fn find_role_by_account_id(&self, account_id: i64) -> Result<Vec<RoleRecord>, StoreError> {
        let query = r"
            SELECT d.role_id
            FROM users u
            JOIN user_details d ON d.id = u.user_detail_id
            WHERE u.id = $1
        ";
        let rows = sqlx::query(query)
            .bind(account_id)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT"))
            .await?;

        rows.iter()
            .map(|row| -> Result<RoleRecord, StoreError> {
                Ok(RoleRecord {
                    role_id: row.try_get("role_id")?,
                })
            })
            .collect()
    }

    async fn create_account(&self, account: NewAccount) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let detail_query = "INSERT INTO user_details (name, store_name, phone_number, role_id) VALUES ($1, $2, $3, $4) RETURNING id";
        let detail_id: i64 = sqlx::query(detail_query)
            .bind(&account.name)
            .bind(account.store_name.as_deref())
            .bind(account.phone_number.as_deref())
            .bind(account.role.id())
            .fetch_one(&mut *tx)
            .instrument(query_span("INSERT"))
            .await?
            .try_get("id")?;

        let user_query =
            "INSERT INTO users (user_detail_id, email, password) VALUES ($1, $2, $3) RETURNING id";
        let account_id: i64 = sqlx::query(user_query)
            .bind(detail_id)
            .bind(&account.email)
            .bind(&account.password_hash)
            .fetch_one(&mut *tx)
            .instrument(query_span("INSERT"))
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::Duplicate
                } else {
                    StoreError::Database(err)
                }
            })?
            .try_get("id")?;

        tx.commit().await?;

        Ok(account_id)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let probe = async {
            let acquire_span = info_span!(
                "db.acquire",
                db.system = "postgresql",
                db.operation = "ACQUIRE"
            );
            let mut conn = self.pool.acquire().instrument(acquire_span).await?;

            let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
            conn.ping().instrument(ping_span).await?;

            Ok::<(), StoreError>(())
        };

        timeout(Duration::from_secs(PING_TIMEOUT_SECONDS), probe)
            .await
            .map_err(|_| StoreError::Unavailable("database ping timed out".to_string()))?
    }
}
