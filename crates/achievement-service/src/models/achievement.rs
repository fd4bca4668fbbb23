//! 已通过的成就

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::SubmissionRole;
use super::reference::{Activity, Student};

/// 成就（审批通过后生成的正式记录）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub oid: i64,
    pub student_oid: i64,
    pub activity_oid: i64,
    pub achievement_submission_role: SubmissionRole,
    pub comment: String,
    pub created_by_user_oid: i64,
    pub created_at: DateTime<Utc>,
    pub updated_by_user_oid: i64,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

/// 成就附件
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AchievementAttachment {
    pub oid: i64,
    pub achievement_oid: i64,
    pub bucket_name: String,
    pub object_key: String,
    pub file_name: String,
    pub file_size: i64,
}

#[derive(Debug, Clone)]
pub struct AchievementSummary {
    pub achievement: Achievement,
    pub student: Student,
    pub activity: Activity,
}

#[derive(Debug, Clone)]
pub struct AchievementDetail {
    pub achievement: Achievement,
    pub student: Student,
    pub activity: Activity,
    pub attachments: Vec<AchievementAttachment>,
}

/// 成就查询条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AchievementFilter {
    pub student_id: Option<String>,
    pub student_oid: Option<i64>,
    pub activity_oid: Option<i64>,
    pub role: Option<SubmissionRole>,
}
