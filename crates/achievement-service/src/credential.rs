//! 密码处理
//!
//! 登录时通过 `CredentialVerifier` 校验密码，默认实现为 bcrypt

use bcrypt::{DEFAULT_COST, hash, verify};
use tracing::warn;

use crate::error::{AchievementError, Result};

/// 凭证校验
#[cfg_attr(test, mockall::automock)]
pub trait CredentialVerifier: Send + Sync {
    /// 比较存储的凭证与用户提供的明文密码
    fn verify(&self, stored: &str, provided: &str) -> bool;
}

/// bcrypt 凭证校验与哈希
#[derive(Debug, Clone, Copy)]
pub struct BcryptVerifier {
    cost: u32,
}

impl Default for BcryptVerifier {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl BcryptVerifier {
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    /// 对密码进行哈希处理
    pub fn hash_password(&self, password: &str) -> Result<String> {
        hash(password, self.cost)
            .map_err(|e| AchievementError::Internal(format!("密码哈希失败: {}", e)))
    }
}

impl CredentialVerifier for BcryptVerifier {
    fn verify(&self, stored: &str, provided: &str) -> bool {
        match verify(provided, stored) {
            Ok(matched) => matched,
            Err(e) => {
                // 存储的哈希格式损坏时按校验失败处理
                warn!(error = %e, "密码哈希无法解析");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let verifier = BcryptVerifier::with_cost(4);
        let hashed = tokio_test::assert_ok!(verifier.hash_password("test_password_123"));

        assert!(verifier.verify(&hashed, "test_password_123"));
        assert!(!verifier.verify(&hashed, "wrong_password"));
    }

    #[test]
    fn test_malformed_hash_is_rejected() {
        let verifier = BcryptVerifier::default();
        assert!(!verifier.verify("plaintext-password", "plaintext-password"));
    }
}
