//! 登录认证服务
//!
//! 邮箱 + 密码登录。所有失败情形统一返回 `InvalidCredentials`，不区分账号不存在、
//! 账号停用与密码错误。

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use super::AuthenticatedUser;
use super::dto::AuthenticationResult;
use crate::credential::CredentialVerifier;
use crate::error::{AchievementError, Result};
use crate::mapper::user as user_mapper;
use crate::repository::UserRepositoryTrait;

const LOGIN_SUCCESS: &str = "Success";

pub struct AuthService {
    user_repo: Arc<dyn UserRepositoryTrait>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl AuthService {
    pub fn new(user_repo: Arc<dyn UserRepositoryTrait>, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            user_repo,
            verifier,
        }
    }

    /// 校验邮箱与密码
    ///
    /// 成功后记录本次登录时间；返回的用户信息携带更新前的上次登录时间
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(AuthenticatedUser, AuthenticationResult)> {
        let mut matches = self.user_repo.find_by_email(email).await?;
        if matches.len() != 1 {
            warn!(count = matches.len(), "登录邮箱未匹配到唯一用户");
            return Err(AchievementError::InvalidCredentials);
        }
        let entity = matches.remove(0);
        let user = &entity.user;

        if !user.is_active() {
            warn!(user_oid = user.oid, "停用账号尝试登录");
            return Err(AchievementError::InvalidCredentials);
        }

        let Some(stored) = user.password_hash.as_deref() else {
            warn!(user_oid = user.oid, "账号未设置密码");
            return Err(AchievementError::InvalidCredentials);
        };

        if !self.verifier.verify(stored, password) {
            warn!(user_oid = user.oid, "密码错误");
            return Err(AchievementError::InvalidCredentials);
        }

        self.user_repo.record_login(user.oid, Utc::now()).await?;
        info!(user_oid = user.oid, "用户登录成功");

        let principal = AuthenticatedUser {
            oid: user.oid,
            role: user.role,
            with_approval_right: user.with_approval_right,
        };
        let result = AuthenticationResult {
            user: user_mapper::entity_to_dto(&entity),
            status: LOGIN_SUCCESS.to_string(),
        };
        Ok((principal, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    use crate::credential::MockCredentialVerifier;
    use crate::models::{User, UserRole, UserStatus, UserWithStudents};
    use crate::repository::MockUserRepositoryTrait;

    fn last_login() -> DateTime<Utc> {
        "2025-02-01T08:00:00Z".parse().unwrap()
    }

    fn user(oid: i64, status: UserStatus, password_hash: Option<&str>) -> UserWithStudents {
        let created = "2025-01-01T00:00:00Z".parse().unwrap();
        UserWithStudents {
            user: User {
                oid,
                email: "teacher@school.edu".to_string(),
                password_hash: password_hash.map(str::to_string),
                name_en: Some("Ms Lee".to_string()),
                name_zh_hant: None,
                name_zh_hans: None,
                role: UserRole::Teacher,
                status,
                last_login_datetime: Some(last_login()),
                password_expiry_datetime: None,
                with_approval_right: true,
                created_by_user_oid: 1,
                created_at: created,
                updated_by_user_oid: 1,
                updated_at: created,
                version: 1,
            },
            entitled_students: Vec::new(),
        }
    }

    fn accepting_verifier() -> MockCredentialVerifier {
        let mut verifier = MockCredentialVerifier::new();
        verifier
            .expect_verify()
            .returning(|stored, provided| stored == "hash" && provided == "secret");
        verifier
    }

    #[tokio::test]
    async fn test_successful_login_returns_previous_login_time() {
        let mut repo = MockUserRepositoryTrait::new();
        repo.expect_find_by_email()
            .returning(|_| Ok(vec![user(11, UserStatus::Active, Some("hash"))]));
        repo.expect_record_login()
            .withf(|oid, at| *oid == 11 && *at > last_login())
            .times(1)
            .returning(|_, _| Ok(()));

        let service = AuthService::new(Arc::new(repo), Arc::new(accepting_verifier()));
        let (principal, result) = service
            .authenticate("teacher@school.edu", "secret")
            .await
            .unwrap();

        assert_eq!(principal.oid, 11);
        assert!(principal.with_approval_right);
        assert_eq!(result.status, "Success");
        assert_eq!(result.user.last_login_datetime, Some(last_login()));
    }

    #[tokio::test]
    async fn test_inactive_account_is_rejected_without_login_update() {
        let mut repo = MockUserRepositoryTrait::new();
        repo.expect_find_by_email()
            .returning(|_| Ok(vec![user(11, UserStatus::Inactive, Some("hash"))]));
        repo.expect_record_login().never();

        let service = AuthService::new(Arc::new(repo), Arc::new(accepting_verifier()));
        let err = service
            .authenticate("teacher@school.edu", "secret")
            .await
            .unwrap_err();

        assert!(matches!(err, AchievementError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let cases: Vec<(Vec<UserWithStudents>, &str)> = vec![
            (Vec::new(), "secret"),
            (
                vec![
                    user(11, UserStatus::Active, Some("hash")),
                    user(12, UserStatus::Active, Some("hash")),
                ],
                "secret",
            ),
            (vec![user(11, UserStatus::Active, None)], "secret"),
            (vec![user(11, UserStatus::Active, Some("hash"))], "wrong"),
        ];

        for (users, password) in cases {
            let mut repo = MockUserRepositoryTrait::new();
            repo.expect_find_by_email()
                .return_once(move |_| Ok(users));
            repo.expect_record_login().never();

            let service = AuthService::new(Arc::new(repo), Arc::new(accepting_verifier()));
            let err = service
                .authenticate("teacher@school.edu", password)
                .await
                .unwrap_err();
            assert!(matches!(err, AchievementError::InvalidCredentials));
        }
    }

    #[tokio::test]
    async fn test_login_update_failure_is_propagated() {
        let mut repo = MockUserRepositoryTrait::new();
        repo.expect_find_by_email()
            .returning(|_| Ok(vec![user(11, UserStatus::Active, Some("hash"))]));
        repo.expect_record_login()
            .returning(|_, _| Err(AchievementError::Database(sqlx::Error::PoolTimedOut)));

        let service = AuthService::new(Arc::new(repo), Arc::new(accepting_verifier()));
        let err = service
            .authenticate("teacher@school.edu", "secret")
            .await
            .unwrap_err();

        assert!(matches!(err, AchievementError::Database(_)));
    }
}
