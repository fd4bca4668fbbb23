//! 服务层
//!
//! 实现成就审批业务逻辑，协调仓储层与对象存储。
//!
//! ## 模块结构
//!
//! - `dto`: 数据传输对象定义
//! - `validation`: 提交前的学生、活动校验
//! - `approval_service`: 提交、修改、删除、审核成就审批
//! - `achievement_service`: 已通过成就查询（只读）
//! - `auth_service`: 邮箱密码登录
//! - `user_service`: 用户维护
//! - `class_service`: 班级查询

pub mod achievement_service;
pub mod approval_service;
pub mod auth_service;
pub mod class_service;
pub mod dto;
pub mod user_service;
pub mod validation;

pub use achievement_service::AchievementQueryService;
pub use approval_service::ApprovalService;
pub use auth_service::AuthService;
pub use class_service::ClassService;
pub use user_service::UserService;

use crate::models::{Ordering, OrderField, SortDirection, UserRole};

/// 已认证的调用者
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub oid: i64,
    pub role: UserRole,
    pub with_approval_right: bool,
}

/// 查询参数中的排序字段与方向；未指定字段时不排序，只保留 oid 次级排序
pub(crate) fn requested_ordering(
    field: Option<OrderField>,
    direction: Option<SortDirection>,
) -> Option<Ordering> {
    field.map(|field| Ordering {
        field,
        direction: direction.unwrap_or_default(),
    })
}
