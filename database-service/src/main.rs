//! 数据库注册服务
//!
//! 提供按组织隔离的数据库连接信息管理，包括：
//! - 数据库注册信息的增删改查
//! - 基于 Bearer Token 的身份认证
//! - 基于角色的写权限控制（ADMIN / DBADMIN）

mod auth;
mod handlers;
mod routes;
mod service;
mod state;
mod store;

#[cfg(test)]
mod tests;

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use common::config::{AppConfig, LogFormat};
use common::middleware::request_id::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub(crate) const SERVICE_NAME: &str = "database-service";
const DEFAULT_PORT: u16 = 8081;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "数据库注册服务 API",
        version = "0.1.0",
        description = "按组织管理数据库连接信息"
    ),
    paths(
        handlers::list_databases,
        handlers::get_database,
        handlers::create_database,
        handlers::update_database,
        handlers::delete_database,
        handlers::health_check,
    ),
    components(schemas(
        common::models::DatabaseItem,
        common::models::CreateDatabaseRequest,
        common::models::UpdateDatabaseRequest,
        common::models::DbType,
        common::response::Ack,
        handlers::HealthResponse,
    )),
    modifiers(&BearerSecurity),
    tags(
        (name = "databases", description = "数据库注册端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi
            .components
            .get_or_insert_with(Default::default)
            .add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // 加载配置
    let mut config = AppConfig::load_with_service(SERVICE_NAME);
    if std::env::var("SERVER_PORT").is_err() {
        config.port = DEFAULT_PORT;
    }

    init_tracing(config.log_format);

    // 连接元数据存储
    let stores = store::connect(&config)
        .await
        .context("Failed to initialize metadata store (check DATABASE_URL)")?;
    store::bootstrap_admin(stores.users.as_ref(), &config)
        .await
        .context("Failed to bootstrap admin user")?;

    // 创建路由
    let state = AppState::new(config.clone(), stores);
    let app = create_router(state);

    // 启动服务
    let addr = config.bind_addr();
    info!(service = SERVICE_NAME, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务启动失败")?;

    info!(service = SERVICE_NAME, "服务已停止");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

pub(crate) fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "无法监听 Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "无法监听 SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("收到 Ctrl+C，开始优雅停机"),
        _ = terminate => info!("收到 SIGTERM，开始优雅停机"),
    }
}
