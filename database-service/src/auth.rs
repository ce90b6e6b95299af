//! 请求身份认证
//!
//! 从 `Authorization: Bearer <token>` 解析当前用户。

use std::ops::Deref;

use axum::{extract::FromRequestParts, http::request::Parts};

use common::errors::AppError;
use common::middleware::extract_bearer_token;
use common::models::{SystemRole, User};
use crate::state::AppState;

/// 已认证的调用者
#[derive(Debug, Clone)]
pub struct Principal(pub User);

impl Deref for Principal {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let user = state
            .stores
            .users
            .find_by_token(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("invalid bearer token".to_string()))?;

        tracing::trace!(user_id = user.id, org_id = user.org_id, role = %user.system_role, "已认证");
        Ok(Principal(user))
    }
}

/// 具有数据库写权限（ADMIN / DBADMIN）的调用者
///
/// 在请求体解析之前完成角色校验，无权限的调用者总是得到 403。
#[derive(Debug, Clone)]
pub struct DatabaseWriter(pub User);

impl Deref for DatabaseWriter {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

impl FromRequestParts<AppState> for DatabaseWriter {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Principal(user) = Principal::from_request_parts(parts, state).await?;
        user.require_any_role(SystemRole::DATABASE_WRITERS)?;
        Ok(DatabaseWriter(user))
    }
}
