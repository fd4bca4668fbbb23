//! JWT Token 处理
//!
//! 登录成功后签发 Token，载荷携带用户 oid、角色与审批权限

use achievement_service::{AchievementError, AuthenticatedUser, UserRole};
use achievement_shared::config::AuthConfig;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// JWT 配置
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// 签名密钥
    pub secret: String,
    /// Token 过期时间（秒）
    pub expires_in_secs: i64,
    /// Token 签发者
    pub issuer: String,
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            expires_in_secs: config.jwt_expires_secs,
            issuer: config.jwt_issuer.clone(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

/// JWT Claims（Token 载荷）
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// 用户 oid
    pub sub: String,
    pub role: UserRole,
    pub with_approval_right: bool,
    /// 签发时间
    pub iat: i64,
    /// 过期时间
    pub exp: i64,
    /// 签发者
    pub iss: String,
}

impl Claims {
    /// 转换为服务层的操作人
    pub fn principal(&self) -> Result<AuthenticatedUser, ApiError> {
        let oid = self
            .sub
            .parse()
            .map_err(|_| ApiError::Unauthorized("无效的用户 ID".to_string()))?;

        Ok(AuthenticatedUser {
            oid,
            role: self.role,
            with_approval_right: self.with_approval_right,
        })
    }
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 为已认证用户生成 Token，返回 (token, 过期时间戳)
    pub fn generate_token(&self, user: &AuthenticatedUser) -> Result<(String, i64), ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.expires_in_secs);

        let claims = Claims {
            sub: user.oid.to_string(),
            role: user.role,
            with_approval_right: user.with_approval_right,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AchievementError::Internal(format!("JWT 生成失败: {}", e)))?;

        Ok((token, exp.timestamp()))
    }

    /// 验证并解析 JWT Token
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthorized("Token 已过期".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    ApiError::Unauthorized("无效的 Token".to_string())
                }
                _ => ApiError::Unauthorized(format!("Token 验证失败: {}", e)),
            },
        )?;

        Ok(token_data.claims)
    }

    pub fn expires_in_secs(&self) -> i64 {
        self.config.expires_in_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teacher_principal() -> AuthenticatedUser {
        AuthenticatedUser {
            oid: 42,
            role: UserRole::Teacher,
            with_approval_right: true,
        }
    }

    #[test]
    fn test_generate_and_verify_token() {
        let manager = JwtManager::new(JwtConfig::default());

        let (token, exp) = tokio_test::assert_ok!(manager.generate_token(&teacher_principal()));
        let claims = tokio_test::assert_ok!(manager.verify_token(&token));

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role, UserRole::Teacher);
        assert!(claims.with_approval_right);
        assert_eq!(claims.exp, exp);
        assert_eq!(claims.principal().unwrap(), teacher_principal());
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let issuer = JwtManager::new(JwtConfig {
            secret: "another-secret".to_string(),
            ..JwtConfig::default()
        });
        let manager = JwtManager::new(JwtConfig::default());

        let (token, _) = issuer.generate_token(&teacher_principal()).unwrap();
        let err = tokio_test::assert_err!(manager.verify_token(&token));

        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let manager = JwtManager::new(JwtConfig {
            expires_in_secs: -3600,
            ..JwtConfig::default()
        });

        let (token, _) = manager.generate_token(&teacher_principal()).unwrap();
        let err = manager.verify_token(&token).unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized(msg) if msg.contains("过期")));
    }

    #[test]
    fn test_malformed_subject_is_unauthorized() {
        let claims = Claims {
            sub: "not-a-number".to_string(),
            role: UserRole::Student,
            with_approval_right: false,
            iat: 0,
            exp: 0,
            iss: "achievement-api".to_string(),
        };

        assert!(matches!(claims.principal(), Err(ApiError::Unauthorized(_))));
    }
}
