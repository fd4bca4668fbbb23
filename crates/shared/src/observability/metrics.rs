//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new()
        .add_global_label("service", config.service_name.clone())
        .install_recorder()?;

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标的 HELP 描述
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "approval_submissions_total",
        "Total number of achievement approval submissions"
    );
    metrics::describe_histogram!(
        "approval_submission_duration_seconds",
        "Achievement approval submission duration in seconds"
    );
    metrics::describe_counter!(
        "approval_reviews_total",
        "Total number of achievement approval reviews"
    );
    metrics::describe_counter!(
        "optimistic_lock_conflicts_total",
        "Total number of rejected version-conditioned writes"
    );
    metrics::describe_counter!(
        "object_copies_total",
        "Total number of object storage copy operations"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, route: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录审批提交
#[inline]
pub fn record_approval_submission(role: &str, status: &str, duration_secs: f64) {
    metrics::counter!(
        "approval_submissions_total",
        "role" => role.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "approval_submission_duration_seconds",
        "role" => role.to_string()
    )
    .record(duration_secs);
}

/// 记录审批审核
#[inline]
pub fn record_approval_review(decision: &str) {
    metrics::counter!("approval_reviews_total", "decision" => decision.to_string()).increment(1);
}

/// 记录乐观锁冲突
#[inline]
pub fn record_optimistic_lock_conflict(entity: &str) {
    metrics::counter!(
        "optimistic_lock_conflicts_total",
        "entity" => entity.to_string()
    )
    .increment(1);
}

/// 记录对象复制
#[inline]
pub fn record_object_copy(status: &str) {
    metrics::counter!("object_copies_total", "status" => status.to_string()).increment(1);
}
