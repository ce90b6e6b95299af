//! MySQL 元数据存储

use std::time::Duration;

use async_trait::async_trait;
use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::{DatabaseItem, NewDatabase, NewUser, User};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;

use super::{rows_into_items, token_digest, DatabaseDao, DatabaseRow, UserDao, UserRow};

const SELECT_DATABASE: &str = "SELECT `id`, `jdbc_url`, `user_name`, `password`, `db_type`, `org_id` FROM `registered_databases`";

/// 基于 MySQL 的存储，生产环境默认后端
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// 连接 MySQL 并确保表结构存在
    pub async fn connect(config: &AppConfig) -> AppResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;

        let store = Self { pool };
        store.ensure_tables().await?;
        Ok(store)
    }

    async fn ensure_tables(&self) -> AppResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS `registered_databases` (
                `id`          BIGINT        NOT NULL AUTO_INCREMENT,
                `jdbc_url`    VARCHAR(2048) NOT NULL,
                `user_name`   VARCHAR(128)  NOT NULL,
                `password`    VARCHAR(512)  NOT NULL,
                `db_type`     VARCHAR(32)   NOT NULL,
                `org_id`      BIGINT        NOT NULL,
                `created_at`  DATETIME      NOT NULL DEFAULT CURRENT_TIMESTAMP,
                `updated_at`  DATETIME      NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                PRIMARY KEY (`id`),
                KEY `idx_org_id` (`org_id`)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseQuery(format!("Failed to create registered_databases table: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS `users` (
                `id`             BIGINT        NOT NULL AUTO_INCREMENT,
                `name`           VARCHAR(128)  NOT NULL,
                `email`          VARCHAR(255)  NOT NULL,
                `org_id`         BIGINT        NOT NULL,
                `system_role`    VARCHAR(16)   NOT NULL,
                `api_token_hash` CHAR(64)      NOT NULL,
                `created_at`     DATETIME      NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (`id`),
                UNIQUE KEY `uk_email` (`email`),
                UNIQUE KEY `uk_api_token_hash` (`api_token_hash`),
                KEY `idx_org_id` (`org_id`)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseQuery(format!("Failed to create users table: {}", e)))?;

        tracing::info!("Metadata tables `registered_databases`, `users` ensured");
        Ok(())
    }
}

#[async_trait]
impl DatabaseDao for MySqlStore {
    async fn list_by_org_id(&self, org_id: i64) -> AppResult<Vec<DatabaseItem>> {
        let rows = sqlx::query_as::<_, DatabaseRow>(&format!(
            "{SELECT_DATABASE} WHERE `org_id` = ? ORDER BY `id`"
        ))
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;
        rows_into_items(rows)
    }

    async fn get_by_id(&self, id: i64, org_id: i64) -> AppResult<Option<DatabaseItem>> {
        sqlx::query_as::<_, DatabaseRow>(&format!(
            "{SELECT_DATABASE} WHERE `id` = ? AND `org_id` = ?"
        ))
        .bind(id)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?
        .map(DatabaseRow::into_item)
        .transpose()
    }

    async fn delete_by_id(&self, id: i64, org_id: i64) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM `registered_databases` WHERE `id` = ? AND `org_id` = ?")
            .bind(id)
            .bind(org_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert(&self, database: &NewDatabase) -> AppResult<i64> {
        let result = sqlx::query(
            "INSERT INTO `registered_databases` (`jdbc_url`, `user_name`, `password`, `db_type`, `org_id`)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&database.jdbc_url)
        .bind(&database.user_name)
        .bind(&database.password)
        .bind(database.db_type.as_str())
        .bind(database.org_id)
        .execute(&self.pool)
        .await?;
        i64::try_from(result.last_insert_id())
            .map_err(|e| AppError::Internal(format!("generated id out of range: {}", e)))
    }

    async fn update(&self, database: &DatabaseItem) -> AppResult<()> {
        sqlx::query(
            "UPDATE `registered_databases`
             SET `jdbc_url` = ?, `user_name` = ?, `password` = ?, `db_type` = ?
             WHERE `id` = ? AND `org_id` = ?",
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
impl UserDao for MySqlStore {
    async fn find_by_token(&self, token: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT `id`, `name`, `email`, `org_id`, `system_role` FROM `users` WHERE `api_token_hash` = ?",
        )
        .bind(token_digest(token))
        .fetch_optional(&self.pool)
        .await?
        .map(UserRow::into_user)
        .transpose()
    }

    async fn insert_user(&self, user: &NewUser) -> AppResult<i64> {
        let result = sqlx::query(
            "INSERT INTO `users` (`name`, `email`, `org_id`, `system_role`, `api_token_hash`)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.org_id)
        .bind(user.system_role.as_str())
        .bind(token_digest(&user.api_token))
        .execute(&self.pool)
        .await?;
        i64::try_from(result.last_insert_id())
            .map_err(|e| AppError::Internal(format!("generated id out of range: {}", e)))
    }
}
