//! 路由模块

use axum::{routing::get, Router};

use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/databases",
            get(handlers::list_databases).post(handlers::create_database),
        )
        .route(
            "/databases/{id}",
            get(handlers::get_database)
                .put(handlers::update_database)
                .delete(handlers::delete_database),
        )
        .route("/health", get(handlers::health_check))
}
