//! 成就审批映射

use chrono::{DateTime, Utc};

use super::reference::{activity_to_dto, student_to_dto};
use crate::models::{
    Activity, AchievementApproval, ApprovalAttachment, ApprovalReview, ApprovalStatus,
    ApprovalSummary, NewAchievementApproval, Student, SubmissionRole,
};
use crate::service::dto::{ApprovalDetailDto, ApprovalDto, AttachmentDto, ReviewDto};

/// 构造一条新的待审批记录
///
/// 审计字段使用同一个时间戳
#[allow(clippy::too_many_arguments)]
pub fn new_pending(
    student_oid: i64,
    activity_oid: i64,
    role: SubmissionRole,
    comment: String,
    attachment_count: usize,
    achievement_oid: Option<i64>,
    actor_oid: i64,
    now: DateTime<Utc>,
) -> NewAchievementApproval {
    NewAchievementApproval {
        student_oid,
        activity_oid,
        achievement_submission_role: role,
        status: ApprovalStatus::Pending,
        comment,
        attachment_count: i32::try_from(attachment_count).unwrap_or(i32::MAX),
        achievement_oid,
        created_by_user_oid: actor_oid,
        created_at: now,
        updated_by_user_oid: actor_oid,
        updated_at: now,
        version: 1,
    }
}

pub fn approval_to_dto(
    approval: &AchievementApproval,
    student: &Student,
    activity: &Activity,
) -> ApprovalDto {
    ApprovalDto {
        id: approval.oid.to_string(),
        student: student_to_dto(student),
        activity: activity_to_dto(activity),
        role: approval.achievement_submission_role,
        status: approval.status,
        comment: approval.comment.clone(),
        attachment_count: approval.attachment_count,
        achievement_id: approval.achievement_oid.map(|oid| oid.to_string()),
        created_by: approval.created_by_user_oid.to_string(),
        created_at: approval.created_at,
        updated_by: approval.updated_by_user_oid.to_string(),
        updated_at: approval.updated_at,
        version: approval.version,
    }
}

pub fn summary_to_dto(summary: &ApprovalSummary) -> ApprovalDto {
    approval_to_dto(&summary.approval, &summary.student, &summary.activity)
}

pub fn attachment_to_dto(attachment: &ApprovalAttachment, get_url: String) -> AttachmentDto {
    AttachmentDto {
        id: attachment.oid.to_string(),
        bucket_name: attachment.bucket_name.clone(),
        object_key: attachment.object_key.clone(),
        file_name: attachment.file_name.clone(),
        file_size: attachment.file_size,
        get_url,
    }
}

pub fn review_to_dto(review: &ApprovalReview) -> ReviewDto {
    ReviewDto {
        id: review.oid.to_string(),
        reviewer_id: review.reviewer_user_oid.to_string(),
        decision: review.decision,
        comment: review.comment.clone(),
        created_at: review.created_at,
    }
}

/// 组装审批详情，`urls` 与 `attachments` 一一对应
pub fn detail_to_dto(
    approval: &AchievementApproval,
    student: &Student,
    activity: &Activity,
    attachments: &[ApprovalAttachment],
    urls: Vec<String>,
    reviews: &[ApprovalReview],
) -> ApprovalDetailDto {
    ApprovalDetailDto {
        approval: approval_to_dto(approval, student, activity),
        attachments: attachments
            .iter()
            .zip(urls)
            .map(|(a, url)| attachment_to_dto(a, url))
            .collect(),
        reviews: reviews.iter().map(review_to_dto).collect(),
    }
}
