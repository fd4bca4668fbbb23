//! 成就审批相关实体定义
//!
//! 审批记录与其附件、审核记录构成一个聚合，作为整体写入和删除

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{ApprovalStatus, ReviewDecision, SubmissionRole};
use super::reference::{Activity, Student};

/// 成就审批
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AchievementApproval {
    pub oid: i64,
    pub student_oid: i64,
    pub activity_oid: i64,
    pub achievement_submission_role: SubmissionRole,
    pub status: ApprovalStatus,
    pub comment: String,
    pub attachment_count: i32,
    /// 对应的已通过成就（弱引用）
    pub achievement_oid: Option<i64>,
    pub created_by_user_oid: i64,
    pub created_at: DateTime<Utc>,
    pub updated_by_user_oid: i64,
    pub updated_at: DateTime<Utc>,
    /// 乐观锁版本号，每次成功修改加 1
    pub version: i32,
}

/// 待创建的成就审批
#[derive(Debug, Clone, PartialEq)]
pub struct NewAchievementApproval {
    pub student_oid: i64,
    pub activity_oid: i64,
    pub achievement_submission_role: SubmissionRole,
    pub status: ApprovalStatus,
    pub comment: String,
    pub attachment_count: i32,
    pub achievement_oid: Option<i64>,
    pub created_by_user_oid: i64,
    pub created_at: DateTime<Utc>,
    pub updated_by_user_oid: i64,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

/// 审批附件
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalAttachment {
    pub oid: i64,
    pub achievement_approval_oid: i64,
    pub bucket_name: String,
    pub object_key: String,
    pub file_name: String,
    pub file_size: i64,
}

/// 附件引用（写入前，尚无 oid）
///
/// 审批附件与成就附件共用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttachment {
    pub bucket_name: String,
    pub object_key: String,
    pub file_name: String,
    pub file_size: i64,
}

impl From<ApprovalAttachment> for NewAttachment {
    fn from(a: ApprovalAttachment) -> Self {
        Self {
            bucket_name: a.bucket_name,
            object_key: a.object_key,
            file_name: a.file_name,
            file_size: a.file_size,
        }
    }
}

/// 审核记录
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalReview {
    pub oid: i64,
    pub achievement_approval_oid: i64,
    pub reviewer_user_oid: i64,
    pub decision: ReviewDecision,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// 待写入的审核记录
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub reviewer_user_oid: i64,
    pub decision: ReviewDecision,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl From<ApprovalReview> for NewReview {
    fn from(r: ApprovalReview) -> Self {
        Self {
            reviewer_user_oid: r.reviewer_user_oid,
            decision: r.decision,
            comment: r.comment,
            created_at: r.created_at,
        }
    }
}

/// 列表项：审批 + 学生 + 活动
#[derive(Debug, Clone)]
pub struct ApprovalSummary {
    pub approval: AchievementApproval,
    pub student: Student,
    pub activity: Activity,
}

/// 刚写入的审批及其附件、审核记录
#[derive(Debug, Clone)]
pub struct ApprovalRecord {
    pub approval: AchievementApproval,
    pub attachments: Vec<ApprovalAttachment>,
    pub reviews: Vec<ApprovalReview>,
}

/// 审批聚合：审批 + 学生 + 活动 + 审核记录 + 附件
#[derive(Debug, Clone)]
pub struct ApprovalAggregate {
    pub approval: AchievementApproval,
    pub student: Student,
    pub activity: Activity,
    pub reviews: Vec<ApprovalReview>,
    pub attachments: Vec<ApprovalAttachment>,
}

/// 审批查询条件（各条件之间为 AND）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApprovalFilter {
    /// 学号
    pub student_id: Option<String>,
    pub student_oid: Option<i64>,
    pub activity_oid: Option<i64>,
    pub status: Option<ApprovalStatus>,
    pub role: Option<SubmissionRole>,
}

/// 审核结果，由仓储在同一事务中落库
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub approval_oid: i64,
    pub expected_version: i32,
    pub reviewer_user_oid: i64,
    pub decision: ReviewDecision,
    pub comment: String,
    pub reviewed_at: DateTime<Utc>,
}
