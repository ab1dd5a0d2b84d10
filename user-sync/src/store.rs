//! User directory storage.
//!
//! Handlers only see the [`UserStore`] trait; [`PgUserStore`] is the Postgres
//! implementation used by the server. Upserts are keyed by user id and are
//! idempotent, and concurrent upserts are serialized by the database.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use thiserror::Error;
use tracing::info;

use crate::models::User;
use crate::Config;

/// Errors returned by a [`UserStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Fetch-all and upsert-by-id access to the user directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Every stored user, ordered by id.
    async fn fetch_all(&self) -> Result<Vec<User>, StoreError>;

    /// Insert the user, or replace the stored record with the same id.
    async fn upsert(&self, user: &User) -> Result<(), StoreError>;
}

const CREATE_USERS_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS users (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL DEFAULT '',
        fields      JSONB NOT NULL DEFAULT '{}'::jsonb,
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
";

/// Postgres-backed user directory.
#[derive(Clone)]
pub struct PgUserStore {
    pool: Arc<PgPool>,
}

impl PgUserStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect using the configured credentials and make sure the schema exists.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        info!(
            db_host = %config.db_host,
            db_name = %config.db_name,
            max_connections = config.db_max_connections,
            "database_connecting"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect_with(config.connect_options())
            .await?;

        let store = Self::new(pool);
        store.initialize().await?;

        info!("database_initialized");
        Ok(store)
    }

    /// Create the users table if it does not exist yet.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_USERS_TABLE).execute(&*self.pool).await?;
        Ok(())
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn fetch_all(&self) -> Result<Vec<User>, StoreError> {
        let rows: Vec<(String, String, Json<Map<String, Value>>)> = sqlx::query_as(
            r"
            SELECT id, name, fields
            FROM users
            ORDER BY id
            ",
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, Json(fields))| User { id, name, fields })
            .collect())
    }

    async fn upsert(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO users (id, name, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                fields = EXCLUDED.fields,
                updated_at = now()
            ",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(Json(&user.fields))
        .execute(&*self.pool)
        .await?;

        Ok(())
    }
}
