//! 数据库注册服务模块

use std::sync::Arc;

use async_trait::async_trait;
use validator::Validate;

use common::errors::{AppError, AppResult};
use common::models::{
    CreateDatabaseRequest, DatabaseItem, SystemRole, UpdateDatabaseRequest, User,
};
use crate::store::DatabaseDao;

/// 数据库注册服务 Trait
#[async_trait]
pub trait DatabaseServiceTrait: Send + Sync {
    /// 列出调用者组织下的所有数据库
    async fn list(&self, principal: &User) -> AppResult<Vec<DatabaseItem>>;

    /// 根据 ID 获取数据库，不存在或属于其他组织时返回 `None`
    async fn get(&self, principal: &User, id: i64) -> AppResult<Option<DatabaseItem>>;

    /// 在调用者组织下注册新数据库
    async fn create(&self, principal: &User, req: CreateDatabaseRequest) -> AppResult<DatabaseItem>;

    /// 部分更新数据库
    async fn update(
        &self,
        principal: &User,
        id: i64,
        req: UpdateDatabaseRequest,
    ) -> AppResult<DatabaseItem>;

    /// 删除数据库，记录不存在时同样视为成功
    async fn delete(&self, principal: &User, id: i64) -> AppResult<()>;
}

/// 数据库注册服务
pub struct DatabaseService {
    dao: Arc<dyn DatabaseDao>,
}

impl DatabaseService {
    /// 创建新的服务实例
    pub fn new(dao: Arc<dyn DatabaseDao>) -> Self {
        Self { dao }
    }
}

#[async_trait]
impl DatabaseServiceTrait for DatabaseService {
    async fn list(&self, principal: &User) -> AppResult<Vec<DatabaseItem>> {
        let databases = self.dao.list_by_org_id(principal.org_id).await?;
        tracing::debug!(org_id = principal.org_id, count = databases.len(), "返回数据库列表");
        Ok(databases)
    }

    async fn get(&self, principal: &User, id: i64) -> AppResult<Option<DatabaseItem>> {
        self.dao.get_by_id(id, principal.org_id).await
    }

    async fn create(&self, principal: &User, req: CreateDatabaseRequest) -> AppResult<DatabaseItem> {
        principal.require_any_role(SystemRole::DATABASE_WRITERS)?;
        req.validate()?;

        let id = self.dao.insert(&req.into_new(principal.org_id)).await?;
        let created = self
            .dao
            .get_by_id(id, principal.org_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("database {} vanished after insert", id)))?;

        tracing::info!(id, org_id = principal.org_id, user_id = principal.id, "数据库已注册");
        Ok(created)
    }

    async fn update(
        &self,
        principal: &User,
        id: i64,
        req: UpdateDatabaseRequest,
    ) -> AppResult<DatabaseItem> {
        principal.require_any_role(SystemRole::DATABASE_WRITERS)?;
        req.validate()?;

        let existing = self
            .dao
            .get_by_id(id, principal.org_id)
            .await?
            .ok_or(AppError::DatabaseNotFound(id))?;

        let updated = existing.merge(req);
        self.dao.update(&updated).await?;

        tracing::info!(id, org_id = principal.org_id, user_id = principal.id, "数据库已更新");
        Ok(updated)
    }

    async fn delete(&self, principal: &User, id: i64) -> AppResult<()> {
        principal.require_any_role(SystemRole::DATABASE_WRITERS)?;

        let deleted = self.dao.delete_by_id(id, principal.org_id).await?;
        tracing::info!(id, org_id = principal.org_id, user_id = principal.id, deleted, "数据库已删除");
        Ok(())
    }
}
