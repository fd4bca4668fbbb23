//! 成就映射

use super::reference::{activity_to_dto, student_to_dto};
use crate::models::{Achievement, AchievementAttachment, AchievementSummary, Activity, Student};
use crate::service::dto::{AchievementDetailDto, AchievementDto, AttachmentDto};

pub fn achievement_to_dto(
    achievement: &Achievement,
    student: &Student,
    activity: &Activity,
) -> AchievementDto {
    AchievementDto {
        id: achievement.oid.to_string(),
        student: student_to_dto(student),
        activity: activity_to_dto(activity),
        role: achievement.achievement_submission_role,
        comment: achievement.comment.clone(),
        created_by: achievement.created_by_user_oid.to_string(),
        created_at: achievement.created_at,
        updated_by: achievement.updated_by_user_oid.to_string(),
        updated_at: achievement.updated_at,
        version: achievement.version,
    }
}

pub fn summary_to_dto(summary: &AchievementSummary) -> AchievementDto {
    achievement_to_dto(&summary.achievement, &summary.student, &summary.activity)
}

pub fn attachment_to_dto(attachment: &AchievementAttachment, get_url: String) -> AttachmentDto {
    AttachmentDto {
        id: attachment.oid.to_string(),
        bucket_name: attachment.bucket_name.clone(),
        object_key: attachment.object_key.clone(),
        file_name: attachment.file_name.clone(),
        file_size: attachment.file_size,
        get_url,
    }
}

/// `urls` 与 `attachments` 一一对应
pub fn detail_to_dto(
    achievement: &Achievement,
    student: &Student,
    activity: &Activity,
    attachments: &[AchievementAttachment],
    urls: Vec<String>,
) -> AchievementDetailDto {
    AchievementDetailDto {
        achievement: achievement_to_dto(achievement, student, activity),
        attachments: attachments
            .iter()
            .zip(urls)
            .map(|(a, url)| attachment_to_dto(a, url))
            .collect(),
    }
}
