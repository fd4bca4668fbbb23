//! 对象存储
//!
//! - `ObjectStorage`: 复制、删除、签名地址等对象操作的抽象
//! - `S3ObjectStorage`: 基于 aws-sdk-s3 的实现
//! - `AttachmentUrlResolver`: 附件下载地址解析（公开桶直链，其余签名）

mod s3;
mod url;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use s3::S3ObjectStorage;
pub use url::{AttachmentUrlResolver, encode_uri_component};

/// 对象存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// 将 `source_bucket/source_key` 复制到 `dest_bucket/dest_key`，返回目标对象字节数
    async fn copy_object(
        &self,
        dest_bucket: &str,
        source_bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<i64>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// 生成带签名的临时下载地址
    async fn signed_get_url(&self, bucket: &str, key: &str, expires_in: Duration)
    -> Result<String>;
}
