//! Handler模块

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::AppError;
use common::extract::{AppJson, AppPath};
use common::middleware::RequestId;
use common::models::{CreateDatabaseRequest, DatabaseItem, UpdateDatabaseRequest};
use common::response::{Ack, ApiResponse};
use crate::auth::{DatabaseWriter, Principal};
use crate::service::DatabaseServiceTrait;
use crate::state::AppState;
use crate::SERVICE_NAME;

fn respond<T: Serialize>(data: T, request_id: &RequestId) -> Json<ApiResponse<T>> {
    Json(ApiResponse::ok_with_service(data, SERVICE_NAME).with_request_id(request_id.as_str()))
}

/// 列出当前组织的所有数据库
#[utoipa::path(
    get,
    path = "/databases",
    tag = "databases",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "数据库列表", body = ApiResponse<Vec<DatabaseItem>>),
        (status = 401, description = "未认证")
    )
)]
pub async fn list_databases(
    principal: Principal,
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<DatabaseItem>>>, AppError> {
    let data = state.database_service().list(&principal).await?;
    Ok(respond(data, &request_id))
}

/// 根据 ID 获取数据库
///
/// 记录不存在或属于其他组织时 `data` 为 `null`。
#[utoipa::path(
    get,
    path = "/databases/{id}",
    tag = "databases",
    security(("bearer" = [])),
    params(
        ("id" = i64, Path, description = "数据库 ID")
    ),
    responses(
        (status = 200, description = "数据库详情或 null", body = ApiResponse<DatabaseItem>),
        (status = 401, description = "未认证")
    )
)]
pub async fn get_database(
    principal: Principal,
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<ApiResponse<Option<DatabaseItem>>>, AppError> {
    let data = state.database_service().get(&principal, id).await?;
    Ok(respond(data, &request_id))
}

/// 注册新数据库
#[utoipa::path(
    post,
    path = "/databases",
    tag = "databases",
    security(("bearer" = [])),
    request_body = CreateDatabaseRequest,
    responses(
        (status = 200, description = "数据库已注册", body = ApiResponse<DatabaseItem>),
        (status = 400, description = "参数校验失败"),
        (status = 401, description = "未认证"),
        (status = 403, description = "需要 ADMIN 或 DBADMIN 角色")
    )
)]
pub async fn create_database(
    writer: DatabaseWriter,
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    AppJson(req): AppJson<CreateDatabaseRequest>,
) -> Result<Json<ApiResponse<DatabaseItem>>, AppError> {
    let data = state.database_service().create(&writer, req).await?;
    Ok(respond(data, &request_id))
}

/// 部分更新数据库，未提供的字段保持不变
#[utoipa::path(
    put,
    path = "/databases/{id}",
    tag = "databases",
    security(("bearer" = [])),
    params(
        ("id" = i64, Path, description = "数据库 ID")
    ),
    request_body = UpdateDatabaseRequest,
    responses(
        (status = 200, description = "数据库已更新", body = ApiResponse<DatabaseItem>),
        (status = 400, description = "参数校验失败"),
        (status = 401, description = "未认证"),
        (status = 403, description = "需要 ADMIN 或 DBADMIN 角色"),
        (status = 404, description = "数据库未找到")
    )
)]
pub async fn update_database(
    writer: DatabaseWriter,
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateDatabaseRequest>,
) -> Result<Json<ApiResponse<DatabaseItem>>, AppError> {
    let data = state.database_service().update(&writer, id, req).await?;
    Ok(respond(data, &request_id))
}

/// 删除数据库
///
/// 记录不存在时同样返回成功。
#[utoipa::path(
    delete,
    path = "/databases/{id}",
    tag = "databases",
    security(("bearer" = [])),
    params(
        ("id" = i64, Path, description = "数据库 ID")
    ),
    responses(
        (status = 200, description = "数据库已删除", body = ApiResponse<Ack>),
        (status = 401, description = "未认证"),
        (status = 403, description = "需要 ADMIN 或 DBADMIN 角色")
    )
)]
pub async fn delete_database(
    writer: DatabaseWriter,
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<ApiResponse<Ack>>, AppError> {
    state.database_service().delete(&writer, id).await?;
    Ok(respond(Ack::new(format!("Database '{}' deleted", id)), &request_id))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行状态", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_ok = match state.stores.databases.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "元数据存储不可用");
            false
        }
    };

    Json(HealthResponse {
        status: if store_ok { "healthy" } else { "degraded" }.to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        store: store_ok,
    })
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态（healthy / degraded）
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 元数据存储是否可用
    pub store: bool,
}
