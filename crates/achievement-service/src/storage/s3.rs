//! S3 对象存储实现

use std::time::Duration;

use achievement_shared::config::StorageConfig;
use achievement_shared::observability::metrics;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use tracing::{debug, error, info, instrument};

use super::ObjectStorage;
use super::url::encode_uri_component;
use crate::error::{AchievementError, Result};

/// S3 对象存储
///
/// 客户端在启动时构建一次，随应用状态注入各服务
#[derive(Clone)]
pub struct S3ObjectStorage {
    client: Client,
}

impl S3ObjectStorage {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// 按配置构建客户端；配置了自定义端点（MinIO 等）时使用 path-style 寻址
    pub async fn from_config(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint.is_some())
            .build();

        info!(region = %config.region, endpoint = ?config.endpoint, "S3 客户端已初始化");
        Self::new(Client::from_conf(s3_config))
    }

    async fn copy_and_measure(
        &self,
        dest_bucket: &str,
        source_bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<i64> {
        self.client
            .copy_object()
            .bucket(dest_bucket)
            .copy_source(copy_source(source_bucket, source_key))
            .key(dest_key)
            .send()
            .await
            .map_err(|e| {
                AchievementError::Storage(format!(
                    "复制对象失败 {}/{} -> {}/{}: {}",
                    source_bucket,
                    source_key,
                    dest_bucket,
                    dest_key,
                    DisplayErrorContext(&e)
                ))
            })?;

        let head = self
            .client
            .head_object()
            .bucket(dest_bucket)
            .key(dest_key)
            .send()
            .await
            .map_err(|e| {
                AchievementError::Storage(format!(
                    "读取对象元数据失败 {}/{}: {}",
                    dest_bucket,
                    dest_key,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(head.content_length().unwrap_or_default())
    }
}

/// CopySource 需要 URL 编码，保留路径分隔符
fn copy_source(bucket: &str, key: &str) -> String {
    let encoded_key = key
        .split('/')
        .map(encode_uri_component)
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", bucket, encoded_key)
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    #[instrument(skip(self))]
    async fn copy_object(
        &self,
        dest_bucket: &str,
        source_bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<i64> {
        match self
            .copy_and_measure(dest_bucket, source_bucket, source_key, dest_key)
            .await
        {
            Ok(size) => {
                metrics::record_object_copy("success");
                debug!(size, "对象复制完成");
                Ok(size)
            }
            Err(e) => {
                metrics::record_object_copy("failure");
                error!(error = %e, "对象复制失败");
                Err(e)
            }
        }
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        debug!(bucket, key, "删除对象");

        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AchievementError::Storage(format!(
                    "删除对象失败 {}/{}: {}",
                    bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(())
    }

    async fn signed_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| AchievementError::Storage(format!("签名参数无效: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| {
                AchievementError::Storage(format!(
                    "生成签名地址失败 {}/{}: {}",
                    bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(request.uri().to_string())
    }
}
