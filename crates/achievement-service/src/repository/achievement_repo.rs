//! 成就仓储
//!
//! 成就只由审批通过生成；同一 (学生, 活动, 提交角色) 只保留一条成就，再次通过时原地替换

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, error, instrument};

use super::activity_repo::ActivityRepository;
use super::student_repo::StudentRepository;
use super::traits::AchievementRepositoryTrait;
use crate::error::{AchievementError, Result};
use crate::models::{
    Achievement, AchievementApproval, AchievementAttachment, AchievementDetail, AchievementFilter,
    AchievementSummary, ApprovalAttachment, PageRequest, PaginatedResult, SubmissionRole,
};

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::text IS NULL OR s.id = $1)
      AND ($2::bigint IS NULL OR c.student_oid = $2)
      AND ($3::bigint IS NULL OR c.activity_oid = $3)
      AND ($4::text IS NULL OR c.achievement_submission_role = $4)
"#;

pub struct AchievementRepository {
    pool: PgPool,
}

impl AchievementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn find(
        &self,
        filter: &AchievementFilter,
        page: &PageRequest,
    ) -> Result<PaginatedResult<AchievementSummary>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM achievement c JOIN student s ON s.oid = c.student_oid {}",
            FILTER_CLAUSE
        );
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.student_id.as_deref())
            .bind(filter.student_oid)
            .bind(filter.activity_oid)
            .bind(filter.role)
            .fetch_one(&mut *tx)
            .await?;

        let page_sql = format!(
            r#"
            SELECT c.oid, c.student_oid, c.activity_oid, c.achievement_submission_role, c.comment,
                   c.created_by_user_oid, c.created_at, c.updated_by_user_oid, c.updated_at,
                   c.version
            FROM achievement c
            JOIN student s ON s.oid = c.student_oid
            {}
            {}
            LIMIT $5 OFFSET $6
            "#,
            FILTER_CLAUSE,
            page.order_by_clause("c")
        );
        let achievements = sqlx::query_as::<_, Achievement>(&page_sql)
            .bind(filter.student_id.as_deref())
            .bind(filter.student_oid)
            .bind(filter.activity_oid)
            .bind(filter.role)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&mut *tx)
            .await?;

        let student_oids: Vec<i64> = achievements
            .iter()
            .map(|a| a.student_oid)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let activity_oids: Vec<i64> = achievements
            .iter()
            .map(|a| a.activity_oid)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let students = StudentRepository::load_by_oids(&mut tx, &student_oids).await?;
        let activities = ActivityRepository::load_by_oids(&mut tx, &activity_oids).await?;
        tx.commit().await?;

        let mut items = Vec::with_capacity(achievements.len());
        for achievement in achievements {
            let student = students.get(&achievement.student_oid).cloned();
            let activity = activities.get(&achievement.activity_oid).cloned();
            let (Some(student), Some(activity)) = (student, activity) else {
                return Err(AchievementError::Internal(format!(
                    "成就 {} 引用的学生或活动不存在",
                    achievement.oid
                )));
            };
            items.push(AchievementSummary {
                achievement,
                student,
                activity,
            });
        }

        Ok(PaginatedResult::new(items, total, page))
    }

    /// 查询成就详情（含附件）
    pub async fn get_by_oid(&self, oid: i64) -> Result<Option<AchievementDetail>> {
        let mut conn = self.pool.acquire().await?;

        let achievement = sqlx::query_as::<_, Achievement>(
            r#"
            SELECT oid, student_oid, activity_oid, achievement_submission_role, comment,
                   created_by_user_oid, created_at, updated_by_user_oid, updated_at, version
            FROM achievement
            WHERE oid = $1
            "#,
        )
        .bind(oid)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(achievement) = achievement else {
            return Ok(None);
        };

        let mut students =
            StudentRepository::load_by_oids(&mut conn, &[achievement.student_oid]).await?;
        let mut activities =
            ActivityRepository::load_by_oids(&mut conn, &[achievement.activity_oid]).await?;
        let (Some(student), Some(activity)) = (
            students.remove(&achievement.student_oid),
            activities.remove(&achievement.activity_oid),
        ) else {
            return Err(AchievementError::Internal(format!(
                "成就 {} 引用的学生或活动不存在",
                achievement.oid
            )));
        };

        let attachments = Self::list_attachments_in(&mut conn, oid).await?;

        Ok(Some(AchievementDetail {
            achievement,
            student,
            activity,
            attachments,
        }))
    }

    pub async fn find_by_key(
        &self,
        student_oid: i64,
        activity_oid: i64,
        role: SubmissionRole,
    ) -> Result<Option<Achievement>> {
        let achievement = sqlx::query_as::<_, Achievement>(
            r#"
            SELECT oid, student_oid, activity_oid, achievement_submission_role, comment,
                   created_by_user_oid, created_at, updated_by_user_oid, updated_at, version
            FROM achievement
            WHERE student_oid = $1 AND activity_oid = $2 AND achievement_submission_role = $3
            ORDER BY created_at DESC, oid ASC
            LIMIT 1
            "#,
        )
        .bind(student_oid)
        .bind(activity_oid)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;

        Ok(achievement)
    }

    pub async fn list_attachments(&self, achievement_oid: i64) -> Result<Vec<AchievementAttachment>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_attachments_in(&mut conn, achievement_oid).await
    }

    // ==================== 事务内操作 ====================

    /// 依据已通过的审批生成成就，已存在则原地替换内容与附件
    ///
    /// 返回成就 oid
    pub async fn upsert_from_approval(
        conn: &mut PgConnection,
        approval: &AchievementApproval,
        attachments: &[ApprovalAttachment],
        actor_oid: i64,
        at: DateTime<Utc>,
    ) -> Result<i64> {
        let existing = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT oid FROM achievement
            WHERE student_oid = $1 AND activity_oid = $2 AND achievement_submission_role = $3
            ORDER BY created_at DESC, oid ASC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(approval.student_oid)
        .bind(approval.activity_oid)
        .bind(approval.achievement_submission_role)
        .fetch_optional(&mut *conn)
        .await?;

        let achievement_oid = match existing {
            Some(oid) => {
                sqlx::query(
                    r#"
                    UPDATE achievement
                    SET comment = $2, updated_by_user_oid = $3, updated_at = $4,
                        version = version + 1
                    WHERE oid = $1
                    "#,
                )
                .bind(oid)
                .bind(&approval.comment)
                .bind(actor_oid)
                .bind(at)
                .execute(&mut *conn)
                .await?;

                sqlx::query("DELETE FROM achievement_attachment WHERE achievement_oid = $1")
                    .bind(oid)
                    .execute(&mut *conn)
                    .await?;
                oid
            }
            None => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO achievement (
                        student_oid, activity_oid, achievement_submission_role, comment,
                        created_by_user_oid, created_at, updated_by_user_oid, updated_at, version
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $5, $6, 1)
                    RETURNING oid
                    "#,
                )
                .bind(approval.student_oid)
                .bind(approval.activity_oid)
                .bind(approval.achievement_submission_role)
                .bind(&approval.comment)
                .bind(actor_oid)
                .bind(at)
                .fetch_one(&mut *conn)
                .await?
            }
        };

        for attachment in attachments {
            sqlx::query(
                r#"
                INSERT INTO achievement_attachment (
                    achievement_oid, bucket_name, object_key, file_name, file_size
                )
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(achievement_oid)
            .bind(&attachment.bucket_name)
            .bind(&attachment.object_key)
            .bind(&attachment.file_name)
            .bind(attachment.file_size)
            .execute(&mut *conn)
            .await?;
        }

        debug!(
            achievement_oid,
            approval_oid = approval.oid,
            replaced = existing.is_some(),
            "成就已依据审批写入"
        );
        Ok(achievement_oid)
    }

    async fn list_attachments_in(
        conn: &mut PgConnection,
        achievement_oid: i64,
    ) -> Result<Vec<AchievementAttachment>> {
        let attachments = sqlx::query_as::<_, AchievementAttachment>(
            r#"
            SELECT oid, achievement_oid, bucket_name, object_key, file_name, file_size
            FROM achievement_attachment
            WHERE achievement_oid = $1
            ORDER BY oid ASC
            "#,
        )
        .bind(achievement_oid)
        .fetch_all(conn)
        .await?;

        Ok(attachments)
    }
}

#[async_trait]
impl AchievementRepositoryTrait for AchievementRepository {
    async fn find(
        &self,
        filter: &AchievementFilter,
        page: &PageRequest,
    ) -> Result<PaginatedResult<AchievementSummary>> {
        self.find(filter, page)
            .await
            .inspect_err(|e| error!(error = %e, "查询成就列表失败"))
    }

    async fn get_by_oid(&self, oid: i64) -> Result<Option<AchievementDetail>> {
        self.get_by_oid(oid)
            .await
            .inspect_err(|e| error!(achievement_oid = oid, error = %e, "查询成就失败"))
    }

    async fn find_by_key(
        &self,
        student_oid: i64,
        activity_oid: i64,
        role: SubmissionRole,
    ) -> Result<Option<Achievement>> {
        self.find_by_key(student_oid, activity_oid, role)
            .await
            .inspect_err(|e| error!(student_oid, activity_oid, error = %e, "按键查询成就失败"))
    }

    async fn list_attachments(&self, achievement_oid: i64) -> Result<Vec<AchievementAttachment>> {
        self.list_attachments(achievement_oid)
            .await
            .inspect_err(|e| error!(achievement_oid, error = %e, "查询成就附件失败"))
    }
}
