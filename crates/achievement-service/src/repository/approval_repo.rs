//! 成就审批仓储
//!
//! 审批、附件、审核记录作为一个聚合读写：
//! - 列表查询的计数与分页在同一个可重复读事务中执行，保证 total 与 items 一致
//! - 更新、删除均以 (oid, version) 为条件，版本不匹配时整个事务回滚
//! - 审核通过时在同一事务内生成或替换正式成就

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, error, instrument};

use super::achievement_repo::AchievementRepository;
use super::activity_repo::ActivityRepository;
use super::student_repo::StudentRepository;
use super::traits::ApprovalRepositoryTrait;
use super::{parse_oid, version_conflict};
use crate::error::{AchievementError, Result};
use crate::models::{
    AchievementApproval, Activity, ApprovalAggregate, ApprovalAttachment, ApprovalFilter,
    ApprovalRecord, ApprovalReview, ApprovalSummary, NewAchievementApproval, NewAttachment,
    NewReview, PageRequest, PaginatedResult, ReviewDecision, ReviewOutcome, Student,
};

const ENTITY: &str = "AchievementApproval";

/// 列表查询的过滤条件，计数与分页共用
const FILTER_CLAUSE: &str = r#"
    WHERE ($1::text IS NULL OR s.id = $1)
      AND ($2::bigint IS NULL OR a.student_oid = $2)
      AND ($3::bigint IS NULL OR a.activity_oid = $3)
      AND ($4::text IS NULL OR a.status = $4)
      AND ($5::text IS NULL OR a.achievement_submission_role = $5)
"#;

/// 成就审批仓储
pub struct ApprovalRepository {
    pool: PgPool,
}

impl ApprovalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 查询操作 ====================

    /// 分页查询审批列表，每项附带学生与活动
    #[instrument(skip(self))]
    pub async fn find(
        &self,
        filter: &ApprovalFilter,
        page: &PageRequest,
    ) -> Result<PaginatedResult<ApprovalSummary>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM achievement_approval a JOIN student s ON s.oid = a.student_oid {}",
            FILTER_CLAUSE
        );
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.student_id.as_deref())
            .bind(filter.student_oid)
            .bind(filter.activity_oid)
            .bind(filter.status)
            .bind(filter.role)
            .fetch_one(&mut *tx)
            .await?;

        let page_sql = format!(
            r#"
            SELECT a.oid, a.student_oid, a.activity_oid, a.achievement_submission_role, a.status,
                   a.comment, a.attachment_count, a.achievement_oid,
                   a.created_by_user_oid, a.created_at, a.updated_by_user_oid, a.updated_at,
                   a.version
            FROM achievement_approval a
            JOIN student s ON s.oid = a.student_oid
            {}
            {}
            LIMIT $6 OFFSET $7
            "#,
            FILTER_CLAUSE,
            page.order_by_clause("a")
        );
        let approvals = sqlx::query_as::<_, AchievementApproval>(&page_sql)
            .bind(filter.student_id.as_deref())
            .bind(filter.student_oid)
            .bind(filter.activity_oid)
            .bind(filter.status)
            .bind(filter.role)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&mut *tx)
            .await?;

        let (students, activities) = Self::load_context(&mut tx, &approvals).await?;
        tx.commit().await?;

        let items = approvals
            .into_iter()
            .map(|approval| {
                let (student, activity) = take_context(&students, &activities, &approval)?;
                Ok(ApprovalSummary {
                    approval,
                    student,
                    activity,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(total, returned = items.len(), "成就审批列表查询完成");
        Ok(PaginatedResult::new(items, total, page))
    }

    /// 按 id 查询完整聚合，非数字 id 直接返回 None
    pub async fn get_by_id(&self, id: &str) -> Result<Option<ApprovalAggregate>> {
        let Some(oid) = parse_oid(id) else {
            return Ok(None);
        };

        let mut conn = self.pool.acquire().await?;

        let approval = sqlx::query_as::<_, AchievementApproval>(
            r#"
            SELECT oid, student_oid, activity_oid, achievement_submission_role, status,
                   comment, attachment_count, achievement_oid,
                   created_by_user_oid, created_at, updated_by_user_oid, updated_at, version
            FROM achievement_approval
            WHERE oid = $1
            "#,
        )
        .bind(oid)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(approval) = approval else {
            return Ok(None);
        };

        let (students, activities) =
            Self::load_context(&mut conn, std::slice::from_ref(&approval)).await?;
        let (student, activity) = take_context(&students, &activities, &approval)?;
        let reviews = Self::list_reviews_in(&mut conn, oid).await?;
        let attachments = Self::list_attachments_in(&mut conn, oid).await?;

        Ok(Some(ApprovalAggregate {
            approval,
            student,
            activity,
            reviews,
            attachments,
        }))
    }

    pub async fn list_reviews(&self, approval_oid: i64) -> Result<Vec<ApprovalReview>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_reviews_in(&mut conn, approval_oid).await
    }

    // ==================== 写入操作 ====================

    /// 在一个事务中写入审批、附件及沿用的审核记录
    #[instrument(skip_all, fields(student_oid = approval.student_oid, activity_oid = approval.activity_oid))]
    pub async fn create(
        &self,
        approval: &NewAchievementApproval,
        attachments: &[NewAttachment],
        reviews: &[NewReview],
    ) -> Result<ApprovalRecord> {
        let mut tx = self.pool.begin().await?;
        let record = Self::insert_in_tx(&mut tx, approval, attachments, reviews).await?;
        tx.commit().await?;

        debug!(oid = record.approval.oid, "成就审批已创建");
        Ok(record)
    }

    /// 以 `approval.version` 为期望版本的条件更新
    ///
    /// `attachments` 为 Some 时整体替换附件（空列表即清空），为 None 时附件保持不变
    #[instrument(skip_all, fields(oid = approval.oid, version = approval.version))]
    pub async fn update(
        &self,
        approval: &AchievementApproval,
        attachments: Option<Vec<NewAttachment>>,
    ) -> Result<AchievementApproval> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, AchievementApproval>(
            r#"
            UPDATE achievement_approval
            SET student_oid = $3, activity_oid = $4, achievement_submission_role = $5,
                status = $6, comment = $7, attachment_count = $8, achievement_oid = $9,
                updated_by_user_oid = $10, updated_at = $11, version = version + 1
            WHERE oid = $1 AND version = $2
            RETURNING oid, student_oid, activity_oid, achievement_submission_role, status,
                      comment, attachment_count, achievement_oid,
                      created_by_user_oid, created_at, updated_by_user_oid, updated_at, version
            "#,
        )
        .bind(approval.oid)
        .bind(approval.version)
        .bind(approval.student_oid)
        .bind(approval.activity_oid)
        .bind(approval.achievement_submission_role)
        .bind(approval.status)
        .bind(&approval.comment)
        .bind(approval.attachment_count)
        .bind(approval.achievement_oid)
        .bind(approval.updated_by_user_oid)
        .bind(approval.updated_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            return Err(version_conflict(ENTITY, approval.oid, approval.version));
        };

        if let Some(attachments) = attachments {
            sqlx::query(
                "DELETE FROM achievement_approval_attachment WHERE achievement_approval_oid = $1",
            )
            .bind(approval.oid)
            .execute(&mut *tx)
            .await?;

            for attachment in &attachments {
                Self::insert_attachment(&mut tx, approval.oid, attachment).await?;
            }
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// 级联删除审批（审核记录、附件、审批本身），版本不匹配时回滚
    #[instrument(skip(self))]
    pub async fn delete(&self, oid: i64, expected_version: i32) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if !Self::delete_in_tx(&mut tx, oid, expected_version).await? {
            tx.rollback().await?;
            return Err(version_conflict(ENTITY, oid, expected_version));
        }

        tx.commit().await?;
        debug!(oid, "成就审批已删除");
        Ok(())
    }

    /// 删除旧审批并写入新审批，两者在同一事务中完成
    #[instrument(skip(self, approval, attachments, reviews))]
    pub async fn replace(
        &self,
        existing_oid: i64,
        expected_version: i32,
        approval: &NewAchievementApproval,
        attachments: &[NewAttachment],
        reviews: &[NewReview],
    ) -> Result<ApprovalRecord> {
        let mut tx = self.pool.begin().await?;

        if !Self::delete_in_tx(&mut tx, existing_oid, expected_version).await? {
            tx.rollback().await?;
            return Err(version_conflict(ENTITY, existing_oid, expected_version));
        }

        let record = Self::insert_in_tx(&mut tx, approval, attachments, reviews).await?;
        tx.commit().await?;

        debug!(
            replaced_oid = existing_oid,
            oid = record.approval.oid,
            "成就审批已替换"
        );
        Ok(record)
    }

    /// 记录审核结果
    ///
    /// 同一事务内：条件更新审批状态、写入审核记录；审核通过时生成或替换正式成就并回填 achievement_oid
    #[instrument(skip(self), fields(oid = outcome.approval_oid, decision = ?outcome.decision))]
    pub async fn record_review(&self, outcome: &ReviewOutcome) -> Result<AchievementApproval> {
        let mut tx = self.pool.begin().await?;

        let approval = sqlx::query_as::<_, AchievementApproval>(
            r#"
            UPDATE achievement_approval
            SET status = $3, updated_by_user_oid = $4, updated_at = $5, version = version + 1
            WHERE oid = $1 AND version = $2
            RETURNING oid, student_oid, activity_oid, achievement_submission_role, status,
                      comment, attachment_count, achievement_oid,
                      created_by_user_oid, created_at, updated_by_user_oid, updated_at, version
            "#,
        )
        .bind(outcome.approval_oid)
        .bind(outcome.expected_version)
        .bind(outcome.decision.resulting_status())
        .bind(outcome.reviewer_user_oid)
        .bind(outcome.reviewed_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut approval) = approval else {
            tx.rollback().await?;
            return Err(version_conflict(
                ENTITY,
                outcome.approval_oid,
                outcome.expected_version,
            ));
        };

        let review = NewReview {
            reviewer_user_oid: outcome.reviewer_user_oid,
            decision: outcome.decision,
            comment: outcome.comment.clone(),
            created_at: outcome.reviewed_at,
        };
        Self::insert_review(&mut tx, approval.oid, &review).await?;

        if outcome.decision == ReviewDecision::Approve {
            let attachments = Self::list_attachments_in(&mut tx, approval.oid).await?;
            let achievement_oid = AchievementRepository::upsert_from_approval(
                &mut tx,
                &approval,
                &attachments,
                outcome.reviewer_user_oid,
                outcome.reviewed_at,
            )
            .await?;

            sqlx::query("UPDATE achievement_approval SET achievement_oid = $2 WHERE oid = $1")
                .bind(approval.oid)
                .bind(achievement_oid)
                .execute(&mut *tx)
                .await?;
            approval.achievement_oid = Some(achievement_oid);
        }

        tx.commit().await?;
        Ok(approval)
    }

    // ==================== 事务内操作 ====================

    async fn insert_in_tx(
        conn: &mut PgConnection,
        approval: &NewAchievementApproval,
        attachments: &[NewAttachment],
        reviews: &[NewReview],
    ) -> Result<ApprovalRecord> {
        let created = sqlx::query_as::<_, AchievementApproval>(
            r#"
            INSERT INTO achievement_approval (
                student_oid, activity_oid, achievement_submission_role, status, comment,
                attachment_count, achievement_oid,
                created_by_user_oid, created_at, updated_by_user_oid, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING oid, student_oid, activity_oid, achievement_submission_role, status,
                      comment, attachment_count, achievement_oid,
                      created_by_user_oid, created_at, updated_by_user_oid, updated_at, version
            "#,
        )
        .bind(approval.student_oid)
        .bind(approval.activity_oid)
        .bind(approval.achievement_submission_role)
        .bind(approval.status)
        .bind(&approval.comment)
        .bind(approval.attachment_count)
        .bind(approval.achievement_oid)
        .bind(approval.created_by_user_oid)
        .bind(approval.created_at)
        .bind(approval.updated_by_user_oid)
        .bind(approval.updated_at)
        .bind(approval.version)
        .fetch_one(&mut *conn)
        .await?;

        let mut stored_attachments = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            stored_attachments.push(Self::insert_attachment(conn, created.oid, attachment).await?);
        }

        let mut stored_reviews = Vec::with_capacity(reviews.len());
        for review in reviews {
            stored_reviews.push(Self::insert_review(conn, created.oid, review).await?);
        }

        Ok(ApprovalRecord {
            approval: created,
            attachments: stored_attachments,
            reviews: stored_reviews,
        })
    }

    /// 删除审批聚合，返回审批行是否被删除
    async fn delete_in_tx(conn: &mut PgConnection, oid: i64, expected_version: i32) -> Result<bool> {
        sqlx::query("DELETE FROM achievement_approval_review WHERE achievement_approval_oid = $1")
            .bind(oid)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            "DELETE FROM achievement_approval_attachment WHERE achievement_approval_oid = $1",
        )
        .bind(oid)
        .execute(&mut *conn)
        .await?;

        let result = sqlx::query("DELETE FROM achievement_approval WHERE oid = $1 AND version = $2")
            .bind(oid)
            .bind(expected_version)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_attachment(
        conn: &mut PgConnection,
        approval_oid: i64,
        attachment: &NewAttachment,
    ) -> Result<ApprovalAttachment> {
        let stored = sqlx::query_as::<_, ApprovalAttachment>(
            r#"
            INSERT INTO achievement_approval_attachment (
                achievement_approval_oid, bucket_name, object_key, file_name, file_size
            )
            VALUES ($1, $2, $3, $4, $5)
            RETURNING oid, achievement_approval_oid, bucket_name, object_key, file_name, file_size
            "#,
        )
        .bind(approval_oid)
        .bind(&attachment.bucket_name)
        .bind(&attachment.object_key)
        .bind(&attachment.file_name)
        .bind(attachment.file_size)
        .fetch_one(conn)
        .await?;

        Ok(stored)
    }

    async fn insert_review(
        conn: &mut PgConnection,
        approval_oid: i64,
        review: &NewReview,
    ) -> Result<ApprovalReview> {
        let stored = sqlx::query_as::<_, ApprovalReview>(
            r#"
            INSERT INTO achievement_approval_review (
                achievement_approval_oid, reviewer_user_oid, decision, comment, created_at
            )
            VALUES ($1, $2, $3, $4, $5)
            RETURNING oid, achievement_approval_oid, reviewer_user_oid, decision, comment, created_at
            "#,
        )
        .bind(approval_oid)
        .bind(review.reviewer_user_oid)
        .bind(review.decision)
        .bind(&review.comment)
        .bind(review.created_at)
        .fetch_one(conn)
        .await?;

        Ok(stored)
    }

    async fn list_reviews_in(
        conn: &mut PgConnection,
        approval_oid: i64,
    ) -> Result<Vec<ApprovalReview>> {
        let reviews = sqlx::query_as::<_, ApprovalReview>(
            r#"
            SELECT oid, achievement_approval_oid, reviewer_user_oid, decision, comment, created_at
            FROM achievement_approval_review
            WHERE achievement_approval_oid = $1
            ORDER BY created_at ASC, oid ASC
            "#,
        )
        .bind(approval_oid)
        .fetch_all(conn)
        .await?;

        Ok(reviews)
    }

    async fn list_attachments_in(
        conn: &mut PgConnection,
        approval_oid: i64,
    ) -> Result<Vec<ApprovalAttachment>> {
        let attachments = sqlx::query_as::<_, ApprovalAttachment>(
            r#"
            SELECT oid, achievement_approval_oid, bucket_name, object_key, file_name, file_size
            FROM achievement_approval_attachment
            WHERE achievement_approval_oid = $1
            ORDER BY oid ASC
            "#,
        )
        .bind(approval_oid)
        .fetch_all(conn)
        .await?;

        Ok(attachments)
    }

    /// 批量加载审批引用的学生与活动
    async fn load_context(
        conn: &mut PgConnection,
        approvals: &[AchievementApproval],
    ) -> Result<(HashMap<i64, Student>, HashMap<i64, Activity>)> {
        let student_oids: Vec<i64> = approvals
            .iter()
            .map(|a| a.student_oid)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let activity_oids: Vec<i64> = approvals
            .iter()
            .map(|a| a.activity_oid)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let students = StudentRepository::load_by_oids(conn, &student_oids).await?;
        let activities = ActivityRepository::load_by_oids(conn, &activity_oids).await?;
        Ok((students, activities))
    }
}

fn take_context(
    students: &HashMap<i64, Student>,
    activities: &HashMap<i64, Activity>,
    approval: &AchievementApproval,
) -> Result<(Student, Activity)> {
    let student = students.get(&approval.student_oid).cloned().ok_or_else(|| {
        AchievementError::Internal(format!(
            "审批 {} 引用的学生 {} 不存在",
            approval.oid, approval.student_oid
        ))
    })?;
    let activity = activities
        .get(&approval.activity_oid)
        .cloned()
        .ok_or_else(|| {
            AchievementError::Internal(format!(
                "审批 {} 引用的活动 {} 不存在",
                approval.oid, approval.activity_oid
            ))
        })?;
    Ok((student, activity))
}

fn log_failure(operation: &'static str, err: &AchievementError) {
    if !matches!(err, AchievementError::ConcurrentModification { .. }) {
        error!(operation, error = %err, "成就审批数据库操作失败");
    }
}

#[async_trait]
impl ApprovalRepositoryTrait for ApprovalRepository {
    async fn find(
        &self,
        filter: &ApprovalFilter,
        page: &PageRequest,
    ) -> Result<PaginatedResult<ApprovalSummary>> {
        self.find(filter, page)
            .await
            .inspect_err(|e| log_failure("find", e))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ApprovalAggregate>> {
        self.get_by_id(id)
            .await
            .inspect_err(|e| log_failure("get_by_id", e))
    }

    async fn list_reviews(&self, approval_oid: i64) -> Result<Vec<ApprovalReview>> {
        self.list_reviews(approval_oid)
            .await
            .inspect_err(|e| log_failure("list_reviews", e))
    }

    async fn create(
        &self,
        approval: &NewAchievementApproval,
        attachments: &[NewAttachment],
        reviews: &[NewReview],
    ) -> Result<ApprovalRecord> {
        self.create(approval, attachments, reviews)
            .await
            .inspect_err(|e| log_failure("create", e))
    }

    async fn update(
        &self,
        approval: &AchievementApproval,
        attachments: Option<Vec<NewAttachment>>,
    ) -> Result<AchievementApproval> {
        self.update(approval, attachments)
            .await
            .inspect_err(|e| log_failure("update", e))
    }

    async fn delete(&self, oid: i64, expected_version: i32) -> Result<()> {
        self.delete(oid, expected_version)
            .await
            .inspect_err(|e| log_failure("delete", e))
    }

    async fn replace(
        &self,
        existing_oid: i64,
        expected_version: i32,
        approval: &NewAchievementApproval,
        attachments: &[NewAttachment],
        reviews: &[NewReview],
    ) -> Result<ApprovalRecord> {
        self.replace(existing_oid, expected_version, approval, attachments, reviews)
            .await
            .inspect_err(|e| log_failure("replace", e))
    }

    async fn record_review(&self, outcome: &ReviewOutcome) -> Result<AchievementApproval> {
        self.record_review(outcome)
            .await
            .inspect_err(|e| log_failure("record_review", e))
    }
}
