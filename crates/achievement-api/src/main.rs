//! 学生成就审批 API 服务
//!
//! 提供登录、成就提交与审批、成就查询、用户与班级维护 REST API。

use std::sync::Arc;

use achievement_api::{auth::JwtConfig, routes, state::AppState};
use achievement_service::S3ObjectStorage;
use achievement_shared::{
    config::AppConfig,
    database::Database,
    observability::{self, middleware as obs_middleware},
};
use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const SERVICE_NAME: &str = "achievement-api";
const DEFAULT_JWT_SECRET: &str = "achievement-secret-key-change-in-production";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME).unwrap_or_default();

    let obs_config = config.observability.clone().with_service_name(SERVICE_NAME);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting {} on {}", SERVICE_NAME, config.server_addr());

    if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
        if config.is_production() {
            anyhow::bail!("生产环境必须通过 ACHIEVEMENT_AUTH__JWT_SECRET 设置 JWT 密钥");
        }
        warn!("Using default JWT secret - set ACHIEVEMENT_AUTH__JWT_SECRET for production");
    }

    let db = Database::connect(&config.database).await?;
    if config.database.run_migrations {
        db.run_migrations().await?;
    }

    let storage = Arc::new(S3ObjectStorage::from_config(&config.storage).await);
    let state = AppState::new(
        db.clone(),
        storage,
        &config.storage,
        JwtConfig::from(&config.auth),
    );

    let app = routes::app(state)
        .layer(middleware::from_fn(security_headers))
        .layer(cors_layer(&config.server.cors_origins, config.is_production()))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 按逗号分隔的来源列表构建 CORS；`*` 允许所有来源
fn cors_layer(allowed_origins: &str, production: bool) -> CorsLayer {
    if allowed_origins == "*" {
        if production {
            warn!("cors_origins=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        info!("CORS allowed_origins: * (all origins)");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    info!("CORS allowed_origins: {}", allowed_origins);
    let origins: Vec<_> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 为所有响应注入 HTTP 安全头
async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        HeaderName::from_static("strict-transport-security"),
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        HeaderName::from_static("x-xss-protection"),
        HeaderValue::from_static("0"),
    );
    response
}

/// 监听 Ctrl+C 或 SIGTERM，触发优雅关闭
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
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
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
