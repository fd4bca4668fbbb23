//! 附件下载地址

use std::sync::Arc;
use std::time::Duration;

use achievement_shared::config::StorageConfig;

use super::ObjectStorage;
use crate::error::Result;

/// 按 ECMAScript `encodeURIComponent` 规则编码
///
/// 保留 `A-Z a-z 0-9 - _ . ! ~ * ' ( )`，其余按 UTF-8 字节编码为 `%XX`
pub fn encode_uri_component(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// 附件地址解析器
///
/// 公开桶返回固定格式的直链，其他桶返回带签名的临时地址
#[derive(Clone)]
pub struct AttachmentUrlResolver {
    storage: Arc<dyn ObjectStorage>,
    public_bucket: String,
    region: String,
    expiry: Duration,
}

impl AttachmentUrlResolver {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        public_bucket: impl Into<String>,
        region: impl Into<String>,
        expiry: Duration,
    ) -> Self {
        Self {
            storage,
            public_bucket: public_bucket.into(),
            region: region.into(),
            expiry,
        }
    }

    pub fn from_config(storage: Arc<dyn ObjectStorage>, config: &StorageConfig) -> Self {
        Self::new(
            storage,
            config.public_bucket.clone(),
            config.region.clone(),
            Duration::from_secs(config.signed_url_expiry_seconds),
        )
    }

    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            bucket,
            self.region,
            encode_uri_component(key)
        )
    }

    pub async fn resolve(&self, bucket: &str, key: &str) -> Result<String> {
        if bucket == self.public_bucket {
            Ok(self.public_url(bucket, key))
        } else {
            self.storage.signed_get_url(bucket, key, self.expiry).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MockObjectStorage;

    #[test]
    fn test_encode_uri_component() {
        assert_eq!(encode_uri_component("a/b c.pdf"), "a%2Fb%20c.pdf");
        assert_eq!(encode_uri_component("it's(1)!~*"), "it's(1)!~*");
        assert_eq!(encode_uri_component("證書"), "%E8%AD%89%E6%9B%B8");
        assert_eq!(encode_uri_component("x+y=z&q"), "x%2By%3Dz%26q");
    }

    #[tokio::test]
    async fn test_public_bucket_uses_direct_url() {
        let mut storage = MockObjectStorage::new();
        storage.expect_signed_get_url().never();

        let resolver = AttachmentUrlResolver::new(
            Arc::new(storage),
            "achievement-public",
            "ap-east-1",
            Duration::from_secs(3600),
        );

        let url = resolver
            .resolve("achievement-public", "activity/1/student/S001/award.pdf")
            .await
            .unwrap();
        assert_eq!(
            url,
            "https://achievement-public.s3.ap-east-1.amazonaws.com/activity%2F1%2Fstudent%2FS001%2Faward.pdf"
        );
    }

    #[tokio::test]
    async fn test_private_bucket_uses_signed_url() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_signed_get_url()
            .withf(|bucket, key, expires| {
                bucket == "achievement-approval"
                    && key == "activity/1/student/S001/award.pdf"
                    && *expires == Duration::from_secs(3600)
            })
            .times(1)
            .returning(|_, _, _| Ok("https://signed.example/award.pdf?X-Amz-Signature=abc".to_string()));

        let resolver = AttachmentUrlResolver::new(
            Arc::new(storage),
            "achievement-public",
            "ap-east-1",
            Duration::from_secs(3600),
        );

        let url = resolver
            .resolve("achievement-approval", "activity/1/student/S001/award.pdf")
            .await
            .unwrap();
        assert!(url.starts_with("https://signed.example/"));
    }
}
