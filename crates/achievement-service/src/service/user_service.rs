//! 用户维护服务

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use super::AuthenticatedUser;
use super::dto::{UserCreationDto, UserDto, UserUpdateDto};
use crate::credential::BcryptVerifier;
use crate::error::{AchievementError, Result};
use crate::mapper::user as user_mapper;
use crate::models::UserWithStudents;
use crate::repository::{UserRepositoryTrait, parse_oid};

pub struct UserService {
    user_repo: Arc<dyn UserRepositoryTrait>,
    hasher: BcryptVerifier,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepositoryTrait>, hasher: BcryptVerifier) -> Self {
        Self { user_repo, hasher }
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: &str) -> Result<UserDto> {
        let entity = self.load(id).await?;
        Ok(user_mapper::entity_to_dto(&entity))
    }

    /// 创建用户，初始密码可选
    #[instrument(skip(self, dto), fields(email = %dto.email))]
    pub async fn create_user(&self, actor: &AuthenticatedUser, dto: UserCreationDto) -> Result<UserDto> {
        let password_hash = self.hash_optional(dto.password.as_deref())?;
        let new_user = user_mapper::creation_dto_to_entity(&dto, password_hash, actor.oid, Utc::now());

        let user = self.user_repo.create(&new_user).await?;
        info!(user_oid = user.oid, "用户已创建");

        Ok(user_mapper::entity_to_dto(&UserWithStudents {
            user,
            entitled_students: Vec::new(),
        }))
    }

    /// 更新用户，按请求中的 version 做乐观锁校验
    #[instrument(skip(self, dto), fields(version = dto.version))]
    pub async fn update_user(
        &self,
        actor: &AuthenticatedUser,
        id: &str,
        dto: UserUpdateDto,
    ) -> Result<UserDto> {
        let stored = self.load(id).await?;
        let password_hash = self.hash_optional(dto.password.as_deref())?;
        let merged =
            user_mapper::update_dto_to_entity(stored.user, &dto, password_hash, actor.oid, Utc::now());

        let user = self.user_repo.update(&merged).await?;
        info!(user_oid = user.oid, version = user.version, "用户已更新");

        Ok(user_mapper::entity_to_dto(&UserWithStudents {
            user,
            entitled_students: stored.entitled_students,
        }))
    }

    async fn load(&self, id: &str) -> Result<UserWithStudents> {
        let not_found = || AchievementError::not_found("User", "id", id);
        let oid = parse_oid(id).ok_or_else(not_found)?;
        self.user_repo.get_by_oid(oid).await?.ok_or_else(not_found)
    }

    fn hash_optional(&self, password: Option<&str>) -> Result<Option<String>> {
        password.map(|p| self.hasher.hash_password(p)).transpose()
    }
}
