//! 用户映射
//!
//! 名称中的空字符串写库时转为 NULL，输出时缺失的语言被省略

use chrono::{DateTime, Utc};

use super::localized_name::{from_columns, to_columns};
use crate::models::{NewUser, User, UserWithStudents};
use crate::service::dto::{UserCreationDto, UserDto, UserUpdateDto};

/// 创建请求 → 待写入用户
pub fn creation_dto_to_entity(
    dto: &UserCreationDto,
    password_hash: Option<String>,
    actor_oid: i64,
    now: DateTime<Utc>,
) -> NewUser {
    let (name_en, name_zh_hant, name_zh_hans) = to_columns(&dto.name);
    NewUser {
        email: dto.email.clone(),
        password_hash,
        name_en,
        name_zh_hant,
        name_zh_hans,
        role: dto.role,
        status: dto.status,
        last_login_datetime: None,
        with_approval_right: dto.with_approval_right,
        created_by_user_oid: actor_oid,
        created_at: now,
    }
}

/// 将更新请求合并到已存储的用户上
///
/// `version` 取自请求，由仓储按该值做乐观锁校验；`password_hash` 为空时保留原密码
pub fn update_dto_to_entity(
    stored: User,
    dto: &UserUpdateDto,
    password_hash: Option<String>,
    actor_oid: i64,
    now: DateTime<Utc>,
) -> User {
    let (name_en, name_zh_hant, name_zh_hans) = to_columns(&dto.name);
    User {
        email: dto.email.clone(),
        password_hash: password_hash.or(stored.password_hash),
        name_en,
        name_zh_hant,
        name_zh_hans,
        role: dto.role,
        status: dto.status,
        with_approval_right: dto.with_approval_right.unwrap_or(stored.with_approval_right),
        updated_by_user_oid: actor_oid,
        updated_at: now,
        version: dto.version,
        ..stored
    }
}

pub fn entity_to_dto(entity: &UserWithStudents) -> UserDto {
    let user = &entity.user;
    UserDto {
        id: user.oid.to_string(),
        name: from_columns(
            user.name_en.as_deref(),
            user.name_zh_hant.as_deref(),
            user.name_zh_hans.as_deref(),
        ),
        email: user.email.clone(),
        entitled_student_id: entity
            .entitled_students
            .iter()
            .map(|s| s.id.clone())
            .collect(),
        role: user.role,
        status: user.status,
        last_login_datetime: user.last_login_datetime,
        password_expiry_datetime: user.password_expiry_datetime,
        with_approval_right: user.with_approval_right,
        created_by: user.created_by_user_oid.to_string(),
        created_at: user.created_at,
        updated_by: user.updated_by_user_oid.to_string(),
        updated_at: user.updated_at,
        version: user.version,
    }
}
