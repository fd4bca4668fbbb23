//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router,
    routing::{get, post},
};

use crate::{handlers, state::AppState};

/// 认证路由（公开）
fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(handlers::auth::login))
}

/// 成就审批路由
fn approval_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/achievement-approvals",
            get(handlers::approval::list_approvals).post(handlers::approval::submit_approval),
        )
        .route(
            "/achievement-approvals/{id}",
            get(handlers::approval::get_approval)
                .put(handlers::approval::update_approval)
                .delete(handlers::approval::delete_approval),
        )
        .route(
            "/achievement-approvals/{id}/reviews",
            post(handlers::approval::review_approval),
        )
}

/// 成就查询路由
fn achievement_routes() -> Router<AppState> {
    Router::new()
        .route("/achievements", get(handlers::achievement::list_achievements))
        .route("/achievements/{id}", get(handlers::achievement::get_achievement))
}

/// 用户与班级路由
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(handlers::user::create_user))
        .route(
            "/users/{id}",
            get(handlers::user::get_user).put(handlers::user::update_user),
        )
        .route("/classes", get(handlers::class::list_classes))
}

/// 所有 `/api` 下的路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(approval_routes())
        .merge(achievement_routes())
        .merge(user_routes())
}

/// 完整应用路由（含探针），认证中间件在此挂载
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth_middleware,
        ))
        .with_state(state)
}
