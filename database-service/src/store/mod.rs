//! 元数据存储
//!
//! 数据库注册记录和用户的持久化层，支持 MySQL 与 SQLite 两种后端，
//! 由 `DATABASE_URL` 的 scheme 选择。

mod mysql;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::{DatabaseItem, DbType, NewDatabase, NewUser, SystemRole, User};

use mysql::MySqlStore;
use sqlite::SqliteStore;

/// 数据库注册记录的数据访问接口，所有查询均按组织隔离
#[async_trait]
pub trait DatabaseDao: Send + Sync {
    /// 列出组织下的全部数据库，按 ID 升序
    async fn list_by_org_id(&self, org_id: i64) -> AppResult<Vec<DatabaseItem>>;

    /// 按 ID 获取数据库，不属于该组织时返回 `None`
    async fn get_by_id(&self, id: i64, org_id: i64) -> AppResult<Option<DatabaseItem>>;

    /// 按 ID 删除数据库，返回受影响行数
    async fn delete_by_id(&self, id: i64, org_id: i64) -> AppResult<u64>;

    /// 插入数据库记录，返回生成的 ID
    async fn insert(&self, database: &NewDatabase) -> AppResult<i64>;

    /// 以完整记录覆盖已有记录（按 ID 与组织匹配）
    async fn update(&self, database: &DatabaseItem) -> AppResult<()>;

    /// 检查存储是否可用
    async fn ping(&self) -> AppResult<()>;
}

/// 用户的数据访问接口
#[async_trait]
pub trait UserDao: Send + Sync {
    /// 根据 API Token 查找用户（按摘要匹配）
    async fn find_by_token(&self, token: &str) -> AppResult<Option<User>>;

    /// 插入用户，返回生成的 ID；只持久化 Token 的摘要
    async fn insert_user(&self, user: &NewUser) -> AppResult<i64>;
}

/// 打开的存储后端
#[derive(Clone)]
pub struct Stores {
    pub databases: Arc<dyn DatabaseDao>,
    pub users: Arc<dyn UserDao>,
}

impl Stores {
    fn from_backend<S>(store: S) -> Self
    where
        S: DatabaseDao + UserDao + 'static,
    {
        let store = Arc::new(store);
        Self {
            databases: store.clone(),
            users: store,
        }
    }
}

/// 根据配置连接元数据存储并确保表结构存在
pub async fn connect(config: &AppConfig) -> AppResult<Stores> {
    let url = config.database_url.as_str();
    if url.starts_with("mysql:") || url.starts_with("mariadb:") {
        let store = MySqlStore::connect(config).await?;
        tracing::info!(backend = "mysql", "元数据存储已连接");
        Ok(Stores::from_backend(store))
    } else if url.starts_with("sqlite:") {
        let store = SqliteStore::connect(config).await?;
        tracing::info!(backend = "sqlite", "元数据存储已连接");
        Ok(Stores::from_backend(store))
    } else {
        Err(AppError::Internal(format!(
            "unsupported DATABASE_URL scheme: {}",
            url.split(':').next().unwrap_or_default()
        )))
    }
}

/// API Token 的 SHA-256 摘要（十六进制），存储层只保存和比较该摘要
pub(crate) fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// 确保启动管理员存在（仅当配置了 `BOOTSTRAP_ADMIN_TOKEN`）
pub async fn bootstrap_admin(users: &dyn UserDao, config: &AppConfig) -> AppResult<()> {
    let Some(token) = config.bootstrap_admin_token.as_deref() else {
        return Ok(());
    };
    if users.find_by_token(token).await?.is_some() {
        tracing::debug!("启动管理员已存在");
        return Ok(());
    }

    let id = users
        .insert_user(&NewUser {
            name: "admin".to_string(),
            email: format!("admin@org-{}.local", config.bootstrap_admin_org_id),
            org_id: config.bootstrap_admin_org_id,
            system_role: SystemRole::Admin,
            api_token: token.to_string(),
        })
        .await?;
    tracing::info!(id, org_id = config.bootstrap_admin_org_id, "启动管理员已创建");
    Ok(())
}

/// `registered_databases` 表的一行
#[derive(sqlx::FromRow)]
struct DatabaseRow {
    id: i64,
    jdbc_url: String,
    user_name: String,
    password: String,
    db_type: String,
    org_id: i64,
}

impl DatabaseRow {
    fn into_item(self) -> AppResult<DatabaseItem> {
        let db_type = self
            .db_type
            .parse::<DbType>()
            .map_err(|e| AppError::DatabaseQuery(format!("row {}: {}", self.id, e)))?;
        Ok(DatabaseItem {
            id: self.id,
            jdbc_url: self.jdbc_url,
            user_name: self.user_name,
            password: self.password,
            db_type,
            org_id: self.org_id,
        })
    }
}

/// `users` 表的一行（不含 token）
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    org_id: i64,
    system_role: String,
}

impl UserRow {
    fn into_user(self) -> AppResult<User> {
        let system_role = self
            .system_role
            .parse::<SystemRole>()
            .map_err(|e| AppError::DatabaseQuery(format!("user {}: {}", self.id, e)))?;
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            org_id: self.org_id,
            system_role,
        })
    }
}

fn rows_into_items(rows: Vec<DatabaseRow>) -> AppResult<Vec<DatabaseItem>> {
    rows.into_iter().map(DatabaseRow::into_item).collect()
}
