//! 用户仓储
//!
//! 用户更新带乐观锁；登录时间单独更新，不占用版本号

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;

use super::student_repo::StudentRepository;
use super::traits::UserRepositoryTrait;
use super::version_conflict;
use crate::error::{AchievementError, Result};
use crate::models::{NewUser, User, UserWithStudents};

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按邮箱查询（邮箱不唯一，调用方自行判断结果数量）
    pub async fn find_by_email(&self, email: &str) -> Result<Vec<UserWithStudents>> {
        let mut conn = self.pool.acquire().await?;

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT oid, email, password_hash, name_en, name_zh_hant, name_zh_hans, role, status,
                   last_login_datetime, password_expiry_datetime, with_approval_right,
                   created_by_user_oid, created_at, updated_by_user_oid, updated_at, version
            FROM app_user
            WHERE email = $1
            ORDER BY oid ASC
            "#,
        )
        .bind(email)
        .fetch_all(&mut *conn)
        .await?;

        let mut result = Vec::with_capacity(users.len());
        for user in users {
            let entitled_students = StudentRepository::load_entitled(&mut conn, user.oid).await?;
            result.push(UserWithStudents {
                user,
                entitled_students,
            });
        }

        Ok(result)
    }

    pub async fn get_by_oid(&self, oid: i64) -> Result<Option<UserWithStudents>> {
        let mut conn = self.pool.acquire().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT oid, email, password_hash, name_en, name_zh_hant, name_zh_hans, role, status,
                   last_login_datetime, password_expiry_datetime, with_approval_right,
                   created_by_user_oid, created_at, updated_by_user_oid, updated_at, version
            FROM app_user
            WHERE oid = $1
            "#,
        )
        .bind(oid)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(user) = user else {
            return Ok(None);
        };

        let entitled_students = StudentRepository::load_entitled(&mut conn, user.oid).await?;
        Ok(Some(UserWithStudents {
            user,
            entitled_students,
        }))
    }

    pub async fn create(&self, user: &NewUser) -> Result<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO app_user (
                email, password_hash, name_en, name_zh_hant, name_zh_hans, role, status,
                last_login_datetime, with_approval_right,
                created_by_user_oid, created_at, updated_by_user_oid, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $10, $11, 1)
            RETURNING oid, email, password_hash, name_en, name_zh_hant, name_zh_hans, role, status,
                      last_login_datetime, password_expiry_datetime, with_approval_right,
                      created_by_user_oid, created_at, updated_by_user_oid, updated_at, version
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name_en)
        .bind(&user.name_zh_hant)
        .bind(&user.name_zh_hans)
        .bind(user.role)
        .bind(user.status)
        .bind(user.last_login_datetime)
        .bind(user.with_approval_right)
        .bind(user.created_by_user_oid)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// 条件更新：oid 与 version 同时匹配才写入，成功后 version + 1
    pub async fn update(&self, user: &User) -> Result<User> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE app_user
            SET email = $3, password_hash = $4, name_en = $5, name_zh_hant = $6,
                name_zh_hans = $7, role = $8, status = $9, password_expiry_datetime = $10,
                with_approval_right = $11, updated_by_user_oid = $12, updated_at = $13,
                version = version + 1
            WHERE oid = $1 AND version = $2
            RETURNING oid, email, password_hash, name_en, name_zh_hant, name_zh_hans, role, status,
                      last_login_datetime, password_expiry_datetime, with_approval_right,
                      created_by_user_oid, created_at, updated_by_user_oid, updated_at, version
            "#,
        )
        .bind(user.oid)
        .bind(user.version)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name_en)
        .bind(&user.name_zh_hant)
        .bind(&user.name_zh_hans)
        .bind(user.role)
        .bind(user.status)
        .bind(user.password_expiry_datetime)
        .bind(user.with_approval_right)
        .bind(user.updated_by_user_oid)
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| version_conflict("User", user.oid, user.version))
    }

    /// 更新最近登录时间
    pub async fn record_login(&self, oid: i64, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE app_user SET last_login_datetime = $2 WHERE oid = $1")
            .bind(oid)
            .bind(at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AchievementError::not_found("User", "oid", oid));
        }

        Ok(())
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Vec<UserWithStudents>> {
        self.find_by_email(email)
            .await
            .inspect_err(|e| error!(error = %e, "按邮箱查询用户失败"))
    }

    async fn get_by_oid(&self, oid: i64) -> Result<Option<UserWithStudents>> {
        self.get_by_oid(oid)
            .await
            .inspect_err(|e| error!(user_oid = oid, error = %e, "查询用户失败"))
    }

    async fn create(&self, user: &NewUser) -> Result<User> {
        self.create(user)
            .await
            .inspect_err(|e| error!(error = %e, "创建用户失败"))
    }

    async fn update(&self, user: &User) -> Result<User> {
        self.update(user).await.inspect_err(|e| {
            if !matches!(e, AchievementError::ConcurrentModification { .. }) {
                error!(user_oid = user.oid, error = %e, "更新用户失败");
            }
        })
    }

    async fn record_login(&self, oid: i64, at: DateTime<Utc>) -> Result<()> {
        self.record_login(oid, at)
            .await
            .inspect_err(|e| error!(user_oid = oid, error = %e, "更新登录时间失败"))
    }
}
