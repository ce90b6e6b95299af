//! SQLite 元数据存储
//!
//! 用于单机部署和测试。连接池只保留一个长期连接，因此 `sqlite::memory:`
//! 在整个进程生命周期内保持同一份数据。

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::{DatabaseItem, NewDatabase, NewUser, User};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use super::{rows_into_items, token_digest, DatabaseDao, DatabaseRow, UserDao, UserRow};

const SELECT_DATABASE: &str =
    "SELECT id, jdbc_url, user_name, password, db_type, org_id FROM registered_databases";

/// 基于 SQLite 的存储
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// 打开（必要时创建）SQLite 数据库并确保表结构存在
    pub async fn connect(config: &AppConfig) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| AppError::DatabaseConnection(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;

        let store = Self { pool };
        store.ensure_tables().await?;
        Ok(store)
    }

    async fn ensure_tables(&self) -> AppResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS registered_databases (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                jdbc_url    TEXT    NOT NULL,
                user_name   TEXT    NOT NULL,
                password    TEXT    NOT NULL,
                db_type     TEXT    NOT NULL,
                org_id      INTEGER NOT NULL,
                created_at  TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at  TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseQuery(format!("Failed to create registered_databases table: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_registered_databases_org_id ON registered_databases (org_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                name           TEXT    NOT NULL,
                email          TEXT    NOT NULL UNIQUE,
                org_id         INTEGER NOT NULL,
                system_role    TEXT    NOT NULL,
                api_token_hash TEXT    NOT NULL UNIQUE,
                created_at     TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseQuery(format!("Failed to create users table: {}", e)))?;

        tracing::debug!("Metadata tables `registered_databases`, `users` ensured");
        Ok(())
    }
}

#[async_trait]
impl DatabaseDao for SqliteStore {
    async fn list_by_org_id(&self, org_id: i64) -> AppResult<Vec<DatabaseItem>> {
        let rows = sqlx::query_as::<_, DatabaseRow>(&format!(
            "{SELECT_DATABASE} WHERE org_id = ? ORDER BY id"
        ))
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;
        rows_into_items(rows)
    }

    async fn get_by_id(&self, id: i64, org_id: i64) -> AppResult<Option<DatabaseItem>> {
        sqlx::query_as::<_, DatabaseRow>(&format!(
            "{SELECT_DATABASE} WHERE id = ? AND org_id = ?"
        ))
        .bind(id)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?
        .map(DatabaseRow::into_item)
        .transpose()
    }

    async fn delete_by_id(&self, id: i64, org_id: i64) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM registered_databases WHERE id = ? AND org_id = ?")
            .bind(id)
            .bind(org_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert(&self, database: &NewDatabase) -> AppResult<i64> {
        let result = sqlx::query(
            "INSERT INTO registered_databases (jdbc_url, user_name, password, db_type, org_id)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&database.jdbc_url)
        .bind(&database.user_name)
        .bind(&database.password)
        .bind(database.db_type.as_str())
        .bind(database.org_id)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update(&self, database: &DatabaseItem) -> AppResult<()> {
        sqlx::query(
            "UPDATE registered_databases
             SET jdbc_url = ?, user_name = ?, password = ?, db_type = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ? AND org_id = ?",
        )
        .bind(&database.jdbc_url)
        .bind(&database.user_name)
        .bind(&database.password)
        .bind(database.db_type.as_str())
        .bind(database.id)
        .bind(database.org_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserDao for SqliteStore {
    async fn find_by_token(&self, token: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, org_id, system_role FROM users WHERE api_token_hash = ?",
        )
        .bind(token_digest(token))
        .fetch_optional(&self.pool)
        .await?
        .map(UserRow::into_user)
        .transpose()
    }

    async fn insert_user(&self, user: &NewUser) -> AppResult<i64> {
        let result = sqlx::query(
            "INSERT INTO users (name, email, org_id, system_role, api_token_hash)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.org_id)
        .bind(user.system_role.as_str())
        .bind(token_digest(&user.api_token))
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }
}
