//! 成就服务枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化，数据库与接口使用同一套取值

use serde::{Deserialize, Serialize};

/// 审批状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum ApprovalStatus {
    /// 待审批 - 新提交或被重新提交
    #[default]
    Pending,
    /// 已通过 - 已生成正式成就
    Approved,
    /// 已驳回
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

/// 提交角色
///
/// 同一学生在同一活动下，学生本人与老师的提交互不覆盖
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum SubmissionRole {
    Student,
    Teacher,
}

impl SubmissionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Teacher => "Teacher",
        }
    }
}

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum UserRole {
    Admin,
    Teacher,
    Student,
}

impl UserRole {
    /// 用户提交成就时所对应的提交角色
    pub fn submission_role(&self) -> SubmissionRole {
        match self {
            Self::Student => SubmissionRole::Student,
            Self::Admin | Self::Teacher => SubmissionRole::Teacher,
        }
    }

    /// 是否为教职员（可代任意在读学生提交）
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Admin | Self::Teacher)
    }
}

/// 用户账号状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

/// 学生状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
}

/// 活动状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum ActivityStatus {
    #[default]
    Open,
    Closed,
}

/// 审核结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    /// 审核后审批记录应处于的状态
    pub fn resulting_status(&self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Reject => ApprovalStatus::Rejected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "Approve",
            Self::Reject => "Reject",
        }
    }
}
