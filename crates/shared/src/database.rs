//! 数据库连接管理模块
//!
//! 连接池由启动代码显式创建并注入到各仓储，不使用全局单例。

use std::time::Duration;

use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument, warn};

use crate::config::DatabaseConfig;
use crate::error::{Result, SharedError};

/// 数据库连接池包装
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// 连接池占用情况，随就绪探针输出
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatus {
    pub size: u32,
    pub idle: usize,
}

impl Database {
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!(
            url = %redact_url(&config.url),
            max_connections = config.max_connections,
            "Connecting to database..."
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
            .inspect_err(|e| warn!(error = %e, "数据库连接失败"))?;

        info!("Database connection pool created");

        Ok(Self { pool })
    }

    /// 包装已有连接池
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
        }
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(SharedError::from)
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }

    /// 运行工作区根目录 migrations/ 下的迁移脚本
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<()> {
        let migrator = sqlx::migrate!("../../migrations");
        info!(count = migrator.iter().count(), "Running database migrations...");
        migrator.run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }
}

/// 隐去连接串中的密码，用于日志输出
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}
