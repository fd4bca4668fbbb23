//! 成就审批服务
//!
//! 处理成就审批的完整生命周期：
//! - 提交（含重复提交检测与整体替换）
//! - 附件对账：已通过成就中存在的附件直接复用，其余复制到审批桶
//! - 查询、修改、删除
//! - 审核（通过时生成正式成就）
//!
//! ## 提交流程
//!
//! 1. 校验学生 -> 2. 校验活动 -> 3. 查找最近一次审批 -> 4. 查找已通过成就
//!    -> 5. 并发复制附件 -> 6. 沿用旧审核记录 -> 7. 事务写入（create 或 replace）
//!    -> 8. 解析附件地址并返回
//!
//! 复制目标不会落在已被记录引用的审批桶对象上（重名时追加序号），
//! 因此复制或写入失败时删除本次调用复制出的对象不会波及已有记录。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use achievement_shared::observability::metrics;
use chrono::Utc;
use futures::future::{join_all, try_join_all};
use tracing::{debug, info, instrument, warn};

use super::AuthenticatedUser;
use super::dto::{
    ApprovalDetailDto, ApprovalDto, ApprovalQuery, AttachmentUploadDto, CreateApprovalRequest,
    ReviewApprovalRequest, UpdateApprovalRequest,
};
use super::requested_ordering;
use super::validation::{validate_activity, validate_student};
use crate::error::{AchievementError, Result};
use crate::mapper::approval as approval_mapper;
use crate::models::{
    AchievementApproval, ApprovalAggregate, ApprovalFilter, ApprovalStatus, NewAttachment,
    NewReview, Ordering, PageRequest, PaginatedResult, ReviewOutcome, SubmissionRole,
};
use crate::repository::{
    AchievementRepositoryTrait, ActivityRepositoryTrait, ApprovalRepositoryTrait,
    StudentRepositoryTrait, parse_oid,
};
use crate::storage::{AttachmentUrlResolver, ObjectStorage};

const ENTITY: &str = "AchievementApproval";

/// 可复用的已存在附件（按 object_key 索引）
#[derive(Debug, Clone)]
struct KnownAttachment {
    bucket_name: String,
    file_size: i64,
}

/// 已有记录引用的附件
#[derive(Debug, Default)]
struct StoredObjects {
    /// 可复用的附件（按 object_key 索引）
    known: HashMap<String, KnownAttachment>,
    /// 审批桶中已被引用的 key，既不能作为复制目标也不能被补偿删除
    occupied: HashSet<String>,
}

impl StoredObjects {
    fn record(&mut self, approval_bucket: &str, bucket_name: &str, object_key: &str, file_size: i64) {
        if bucket_name == approval_bucket {
            self.occupied.insert(object_key.to_string());
        }
        self.known
            .entry(object_key.to_string())
            .or_insert_with(|| KnownAttachment {
                bucket_name: bucket_name.to_string(),
                file_size,
            });
    }
}

/// 单个附件的处理方式
#[derive(Debug)]
enum Placement<'a> {
    Reuse(&'a KnownAttachment),
    Copy { dest_key: String },
}

/// 单个附件的落位结果
#[derive(Debug)]
struct PlacedAttachment {
    attachment: NewAttachment,
    /// 本次调用复制出的对象（位于审批桶）
    copied: bool,
}

/// 成就审批服务
pub struct ApprovalService {
    approval_repo: Arc<dyn ApprovalRepositoryTrait>,
    achievement_repo: Arc<dyn AchievementRepositoryTrait>,
    student_repo: Arc<dyn StudentRepositoryTrait>,
    activity_repo: Arc<dyn ActivityRepositoryTrait>,
    storage: Arc<dyn ObjectStorage>,
    url_resolver: AttachmentUrlResolver,
    approval_bucket: String,
}

impl ApprovalService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        approval_repo: Arc<dyn ApprovalRepositoryTrait>,
        achievement_repo: Arc<dyn AchievementRepositoryTrait>,
        student_repo: Arc<dyn StudentRepositoryTrait>,
        activity_repo: Arc<dyn ActivityRepositoryTrait>,
        storage: Arc<dyn ObjectStorage>,
        url_resolver: AttachmentUrlResolver,
        approval_bucket: impl Into<String>,
    ) -> Self {
        Self {
            approval_repo,
            achievement_repo,
            student_repo,
            activity_repo,
            storage,
            url_resolver,
            approval_bucket: approval_bucket.into(),
        }
    }

    /// 提交成就审批
    ///
    /// 已存在同一 (学生, 活动, 角色) 的审批时：`delete_existing` 为 false 返回
    /// `DuplicateSubmission`，为 true 则在同一事务中替换旧审批
    #[instrument(skip(self, request), fields(student_id = %request.student_id, activity_id = %request.activity_id))]
    pub async fn submit(
        &self,
        actor: &AuthenticatedUser,
        request: CreateApprovalRequest,
        delete_existing: bool,
    ) -> Result<ApprovalDetailDto> {
        let started = Instant::now();
        let role = actor.role.submission_role();

        let result = self.submit_inner(actor, request, delete_existing).await;

        let status = match &result {
            Ok(_) => "success",
            Err(e) => e.error_code(),
        };
        metrics::record_approval_submission(role.as_str(), status, started.elapsed().as_secs_f64());
        result
    }

    async fn submit_inner(
        &self,
        actor: &AuthenticatedUser,
        request: CreateApprovalRequest,
        delete_existing: bool,
    ) -> Result<ApprovalDetailDto> {
        let now = Utc::now();
        let role = actor.role.submission_role();

        let student =
            validate_student(self.student_repo.as_ref(), actor, &request.student_id).await?;
        let activity = validate_activity(
            self.activity_repo.as_ref(),
            &request.activity_id,
            role,
            now.date_naive(),
        )
        .await?;

        let existing = self.latest_approval(student.oid, activity.oid, role).await?;
        if existing.is_some() && !delete_existing {
            return Err(AchievementError::DuplicateSubmission {
                student_id: student.id.clone(),
                activity_id: request.activity_id.clone(),
            });
        }

        let accepted = self
            .achievement_repo
            .find_by_key(student.oid, activity.oid, role)
            .await?;
        let mut stored = StoredObjects::default();
        if let Some(achievement) = &accepted {
            for a in self.achievement_repo.list_attachments(achievement.oid).await? {
                stored.record(&self.approval_bucket, &a.bucket_name, &a.object_key, a.file_size);
            }
        }
        if let Some(e) = &existing {
            for a in &e.attachments {
                stored.record(&self.approval_bucket, &a.bucket_name, &a.object_key, a.file_size);
            }
        }

        let dest_prefix = destination_prefix(&activity.oid.to_string(), &student.id);
        let placed = self
            .place_attachments(&request.attachments, &stored, &dest_prefix)
            .await?;
        let copied = copied_keys(&placed);
        let attachments: Vec<NewAttachment> = placed.into_iter().map(|p| p.attachment).collect();

        let reviews: Vec<NewReview> = existing
            .as_ref()
            .map(|e| e.reviews.iter().cloned().map(NewReview::from).collect())
            .unwrap_or_default();

        let entity = approval_mapper::new_pending(
            student.oid,
            activity.oid,
            role,
            request.comment,
            attachments.len(),
            accepted.as_ref().map(|a| a.oid),
            actor.oid,
            now,
        );

        let persisted = match &existing {
            Some(e) => {
                self.approval_repo
                    .replace(
                        e.approval.oid,
                        e.approval.version,
                        &entity,
                        &attachments,
                        &reviews,
                    )
                    .await
            }
            None => self.approval_repo.create(&entity, &attachments, &reviews).await,
        };

        let record = match persisted {
            Ok(record) => record,
            Err(e) => {
                self.discard_copies(&copied, &stored.occupied).await;
                return Err(e);
            }
        };

        info!(
            approval_oid = record.approval.oid,
            replaced = existing.is_some(),
            attachments = record.attachments.len(),
            copied = copied.len(),
            "成就审批已提交"
        );

        let urls = self.resolve_urls(&record.attachments).await?;
        Ok(approval_mapper::detail_to_dto(
            &record.approval,
            &student,
            &activity,
            &record.attachments,
            urls,
            &record.reviews,
        ))
    }

    /// 查询成就审批列表
    #[instrument(skip(self))]
    pub async fn find_approvals(&self, query: ApprovalQuery) -> Result<PaginatedResult<ApprovalDto>> {
        let page = PageRequest::new(query.offset.unwrap_or(0), query.limit).with_ordering(
            requested_ordering(query.order_by_field, query.order_by_direction),
        );

        let activity_oid = match query.activity_id.as_deref() {
            Some(id) => match parse_oid(id) {
                Some(oid) => Some(oid),
                // 非数字的活动 id 不可能匹配任何记录
                None => return Ok(PaginatedResult::new(Vec::new(), 0, &page)),
            },
            None => None,
        };

        let filter = ApprovalFilter {
            student_id: query.student_id,
            student_oid: None,
            activity_oid,
            status: query.status,
            role: query.role,
        };

        let result = self.approval_repo.find(&filter, &page).await?;
        Ok(result.map(|summary| approval_mapper::summary_to_dto(&summary)))
    }

    /// 获取成就审批详情
    #[instrument(skip(self))]
    pub async fn get_approval(&self, id: &str) -> Result<ApprovalDetailDto> {
        let aggregate = self.load(id).await?;
        self.to_detail(&aggregate).await
    }

    /// 修改待审批记录
    ///
    /// 附件列表给出时整体替换：与当前审批或已通过成就相同的对象直接复用，其余复制
    #[instrument(skip(self, request), fields(version = request.version))]
    pub async fn update_approval(
        &self,
        actor: &AuthenticatedUser,
        id: &str,
        request: UpdateApprovalRequest,
    ) -> Result<ApprovalDetailDto> {
        let aggregate = self.load(id).await?;
        ensure_pending(&aggregate.approval)?;

        let mut stored = StoredObjects::default();
        for a in &aggregate.attachments {
            stored.record(&self.approval_bucket, &a.bucket_name, &a.object_key, a.file_size);
        }
        if let Some(achievement_oid) = aggregate.approval.achievement_oid {
            for a in self.achievement_repo.list_attachments(achievement_oid).await? {
                stored.record(&self.approval_bucket, &a.bucket_name, &a.object_key, a.file_size);
            }
        }

        let (attachments, copied) = match &request.attachments {
            Some(uploads) => {
                let prefix = destination_prefix(
                    &aggregate.activity.oid.to_string(),
                    &aggregate.student.id,
                );
                let placed = self
                    .place_attachments(uploads, &stored, &prefix)
                    .await?;
                let copied = copied_keys(&placed);
                (
                    Some(placed.into_iter().map(|p| p.attachment).collect::<Vec<_>>()),
                    copied,
                )
            }
            None => (None, Vec::new()),
        };

        let attachment_count = match &attachments {
            Some(list) => i32::try_from(list.len()).unwrap_or(i32::MAX),
            None => aggregate.approval.attachment_count,
        };
        let entity = AchievementApproval {
            comment: request.comment,
            attachment_count,
            updated_by_user_oid: actor.oid,
            updated_at: Utc::now(),
            version: request.version,
            ..aggregate.approval.clone()
        };

        if let Err(e) = self.approval_repo.update(&entity, attachments).await {
            self.discard_copies(&copied, &stored.occupied).await;
            return Err(e);
        }

        self.get_approval(id).await
    }

    /// 删除成就审批（连同附件与审核记录）
    #[instrument(skip(self))]
    pub async fn delete_approval(&self, id: &str, version: i32) -> Result<()> {
        let aggregate = self.load(id).await?;
        self.approval_repo
            .delete(aggregate.approval.oid, version)
            .await?;

        info!(approval_oid = aggregate.approval.oid, "成就审批已删除");
        Ok(())
    }

    /// 审核成就审批
    #[instrument(skip(self, request), fields(decision = request.decision.as_str()))]
    pub async fn review_approval(
        &self,
        actor: &AuthenticatedUser,
        id: &str,
        request: ReviewApprovalRequest,
    ) -> Result<ApprovalDetailDto> {
        if !actor.with_approval_right {
            return Err(AchievementError::ValidationFailed(
                "当前用户没有审批权限".to_string(),
            ));
        }

        let aggregate = self.load(id).await?;
        ensure_pending(&aggregate.approval)?;

        let outcome = ReviewOutcome {
            approval_oid: aggregate.approval.oid,
            expected_version: request.version,
            reviewer_user_oid: actor.oid,
            decision: request.decision,
            comment: request.comment,
            reviewed_at: Utc::now(),
        };
        let reviewed = self.approval_repo.record_review(&outcome).await?;
        metrics::record_approval_review(request.decision.as_str());

        info!(
            approval_oid = reviewed.oid,
            status = reviewed.status.as_str(),
            achievement_oid = ?reviewed.achievement_oid,
            "成就审批已审核"
        );

        self.get_approval(id).await
    }

    // ==================== 内部方法 ====================

    async fn load(&self, id: &str) -> Result<ApprovalAggregate> {
        self.approval_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| AchievementError::not_found(ENTITY, "id", id))
    }

    /// 同一 (学生, 活动, 角色) 下最近创建的审批
    async fn latest_approval(
        &self,
        student_oid: i64,
        activity_oid: i64,
        role: SubmissionRole,
    ) -> Result<Option<ApprovalAggregate>> {
        let filter = ApprovalFilter {
            student_oid: Some(student_oid),
            activity_oid: Some(activity_oid),
            role: Some(role),
            ..Default::default()
        };
        let page = PageRequest::new(0, Some(1)).with_ordering(Some(Ordering::newest_first()));

        let latest = self.approval_repo.find(&filter, &page).await?;
        match latest.items.first() {
            Some(summary) => {
                self.approval_repo
                    .get_by_id(&summary.approval.oid.to_string())
                    .await
            }
            None => Ok(None),
        }
    }

    /// 并发落位全部附件，等待所有复制结束后再判断结果
    async fn place_attachments(
        &self,
        uploads: &[AttachmentUploadDto],
        stored: &StoredObjects,
        dest_prefix: &str,
    ) -> Result<Vec<PlacedAttachment>> {
        let placements = plan_placements(uploads, stored, dest_prefix);
        let results = join_all(
            uploads
                .iter()
                .zip(placements)
                .map(|(upload, placement)| self.place_attachment(upload, placement)),
        )
        .await;

        let mut placed = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(p) => placed.push(p),
                Err(e) => {
                    warn!(error = %e, "附件复制失败");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => {
                self.discard_copies(&copied_keys(&placed), &stored.occupied).await;
                Err(e)
            }
            None => Ok(placed),
        }
    }

    async fn place_attachment(
        &self,
        upload: &AttachmentUploadDto,
        placement: Placement<'_>,
    ) -> Result<PlacedAttachment> {
        let dest_key = match placement {
            Placement::Reuse(existing) => {
                debug!(object_key = %upload.object_key, "复用已存在的附件");
                return Ok(PlacedAttachment {
                    attachment: NewAttachment {
                        bucket_name: existing.bucket_name.clone(),
                        object_key: upload.object_key.clone(),
                        file_name: upload.file_name.clone(),
                        file_size: existing.file_size,
                    },
                    copied: false,
                });
            }
            Placement::Copy { dest_key } => dest_key,
        };

        let file_size = self
            .storage
            .copy_object(
                &self.approval_bucket,
                &upload.bucket_name,
                &upload.object_key,
                &dest_key,
            )
            .await?;

        Ok(PlacedAttachment {
            attachment: NewAttachment {
                bucket_name: self.approval_bucket.clone(),
                object_key: dest_key,
                file_name: upload.file_name.clone(),
                file_size,
            },
            copied: true,
        })
    }

    /// 补偿删除本次调用复制出的对象；删除失败只记录日志，不覆盖原始错误
    async fn discard_copies(&self, keys: &[String], occupied: &HashSet<String>) {
        let targets: Vec<&String> = keys.iter().filter(|k| !occupied.contains(*k)).collect();
        if targets.is_empty() {
            return;
        }

        let results = join_all(
            targets
                .iter()
                .map(|key| self.storage.delete_object(&self.approval_bucket, key)),
        )
        .await;

        for (key, result) in targets.iter().zip(results) {
            if let Err(e) = result {
                warn!(bucket = %self.approval_bucket, key = %key, error = %e, "补偿删除对象失败");
            }
        }
    }

    async fn resolve_urls(
        &self,
        attachments: &[crate::models::ApprovalAttachment],
    ) -> Result<Vec<String>> {
        try_join_all(
            attachments
                .iter()
                .map(|a| self.url_resolver.resolve(&a.bucket_name, &a.object_key)),
        )
        .await
    }

    async fn to_detail(&self, aggregate: &ApprovalAggregate) -> Result<ApprovalDetailDto> {
        let urls = self.resolve_urls(&aggregate.attachments).await?;
        Ok(approval_mapper::detail_to_dto(
            &aggregate.approval,
            &aggregate.student,
            &aggregate.activity,
            &aggregate.attachments,
            urls,
            &aggregate.reviews,
        ))
    }
}

fn ensure_pending(approval: &AchievementApproval) -> Result<()> {
    if approval.status == ApprovalStatus::Pending {
        Ok(())
    } else {
        Err(AchievementError::ValidationFailed(format!(
            "成就审批 {} 状态为 {}，不可再修改",
            approval.oid,
            approval.status.as_str()
        )))
    }
}

fn destination_prefix(activity_id: &str, student_id: &str) -> String {
    format!("activity/{}/student/{}/", activity_id, student_id)
}

fn last_segment(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// 为每个上传决定复用或复制
///
/// 复制目标与已引用对象或同批次其他目标重名时，在文件名后追加 `-1`、`-2`…
fn plan_placements<'a>(
    uploads: &[AttachmentUploadDto],
    stored: &'a StoredObjects,
    dest_prefix: &str,
) -> Vec<Placement<'a>> {
    let mut taken = stored.occupied.clone();
    uploads
        .iter()
        .map(|upload| {
            if let Some(existing) = stored.known.get(&upload.object_key) {
                return Placement::Reuse(existing);
            }

            let name = last_segment(&upload.object_key);
            let (stem, extension) = split_extension(name);
            let mut dest_key = format!("{dest_prefix}{name}");
            let mut suffix = 1;
            while taken.contains(&dest_key) {
                dest_key = format!("{dest_prefix}{stem}-{suffix}{extension}");
                suffix += 1;
            }
            taken.insert(dest_key.clone());
            Placement::Copy { dest_key }
        })
        .collect()
}

/// 拆出扩展名（含点）；以点开头的文件名视为无扩展名
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) if i > 0 => name.split_at(i),
        _ => (name, ""),
    }
}

fn copied_keys(placed: &[PlacedAttachment]) -> Vec<String> {
    placed
        .iter()
        .filter(|p| p.copied)
        .map(|p| p.attachment.object_key.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::Days;

    use crate::models::{
        Achievement, AchievementAttachment, Activity, ActivityStatus, ApprovalAttachment,
        ApprovalRecord, ApprovalReview, ApprovalSummary, ReviewDecision, Student, StudentStatus,
        UserRole,
    };
    use crate::repository::{
        MockAchievementRepositoryTrait, MockActivityRepositoryTrait, MockApprovalRepositoryTrait,
        MockStudentRepositoryTrait,
    };
    use crate::storage::MockObjectStorage;

    const APPROVAL_BUCKET: &str = "achievement-approval";
    const PUBLIC_BUCKET: &str = "achievement-public";

    fn teacher() -> AuthenticatedUser {
        AuthenticatedUser {
            oid: 5,
            role: UserRole::Teacher,
            with_approval_right: true,
        }
    }

    fn student() -> Student {
        Student {
            oid: 7,
            id: "S001".to_string(),
            name_en: Some("Chan Tai Man".to_string()),
            name_zh_hant: None,
            name_zh_hans: None,
            class_oid: None,
            class_number: None,
            status: StudentStatus::Active,
        }
    }

    fn open_activity() -> Activity {
        let today = Utc::now().date_naive();
        Activity {
            oid: 42,
            name_en: Some("Science Fair".to_string()),
            name_zh_hant: None,
            name_zh_hans: None,
            start_date: today - Days::new(10),
            end_date: today + Days::new(10),
            student_submission_allowed: true,
            teacher_submission_allowed: true,
            status: ActivityStatus::Open,
        }
    }

    fn approval(oid: i64, status: ApprovalStatus, version: i32) -> AchievementApproval {
        let now = Utc::now();
        AchievementApproval {
            oid,
            student_oid: 7,
            activity_oid: 42,
            achievement_submission_role: SubmissionRole::Teacher,
            status,
            comment: "old".to_string(),
            attachment_count: 1,
            achievement_oid: None,
            created_by_user_oid: 5,
            created_at: now,
            updated_by_user_oid: 5,
            updated_at: now,
            version,
        }
    }

    fn aggregate(oid: i64, status: ApprovalStatus, version: i32) -> ApprovalAggregate {
        ApprovalAggregate {
            approval: approval(oid, status, version),
            student: student(),
            activity: open_activity(),
            reviews: vec![ApprovalReview {
                oid: 1,
                achievement_approval_oid: oid,
                reviewer_user_oid: 9,
                decision: ReviewDecision::Reject,
                comment: "needs a clearer scan".to_string(),
                created_at: Utc::now(),
            }],
            attachments: vec![ApprovalAttachment {
                oid: 1,
                achievement_approval_oid: oid,
                bucket_name: APPROVAL_BUCKET.to_string(),
                object_key: "activity/42/student/S001/old.pdf".to_string(),
                file_name: "old.pdf".to_string(),
                file_size: 100,
            }],
        }
    }

    fn upload(key: &str, name: &str) -> AttachmentUploadDto {
        AttachmentUploadDto {
            bucket_name: "upload".to_string(),
            object_key: key.to_string(),
            file_name: name.to_string(),
        }
    }

    fn request(attachments: Vec<AttachmentUploadDto>) -> CreateApprovalRequest {
        CreateApprovalRequest {
            student_id: "S001".to_string(),
            activity_id: "42".to_string(),
            comment: "first prize".to_string(),
            attachments,
        }
    }

    /// 将写入参数回显为已持久化记录
    fn echo_record(
        oid: i64,
        entity: &crate::models::NewAchievementApproval,
        attachments: &[NewAttachment],
        reviews: &[NewReview],
    ) -> ApprovalRecord {
        ApprovalRecord {
            approval: AchievementApproval {
                oid,
                student_oid: entity.student_oid,
                activity_oid: entity.activity_oid,
                achievement_submission_role: entity.achievement_submission_role,
                status: entity.status,
                comment: entity.comment.clone(),
                attachment_count: entity.attachment_count,
                achievement_oid: entity.achievement_oid,
                created_by_user_oid: entity.created_by_user_oid,
                created_at: entity.created_at,
                updated_by_user_oid: entity.updated_by_user_oid,
                updated_at: entity.updated_at,
                version: entity.version,
            },
            attachments: attachments
                .iter()
                .enumerate()
                .map(|(i, a)| ApprovalAttachment {
                    oid: i as i64 + 1,
                    achievement_approval_oid: oid,
                    bucket_name: a.bucket_name.clone(),
                    object_key: a.object_key.clone(),
                    file_name: a.file_name.clone(),
                    file_size: a.file_size,
                })
                .collect(),
            reviews: reviews
                .iter()
                .enumerate()
                .map(|(i, r)| ApprovalReview {
                    oid: i as i64 + 1,
                    achievement_approval_oid: oid,
                    reviewer_user_oid: r.reviewer_user_oid,
                    decision: r.decision,
                    comment: r.comment.clone(),
                    created_at: r.created_at,
                })
                .collect(),
        }
    }

    struct Mocks {
        approvals: MockApprovalRepositoryTrait,
        achievements: MockAchievementRepositoryTrait,
        students: MockStudentRepositoryTrait,
        activities: MockActivityRepositoryTrait,
        storage: MockObjectStorage,
        url_storage: MockObjectStorage,
    }

    impl Mocks {
        /// 学生与活动校验通过；URL 签名固定返回
        fn new() -> Self {
            let mut students = MockStudentRepositoryTrait::new();
            students
                .expect_get_by_id()
                .returning(|_| Ok(Some(student())));

            let mut activities = MockActivityRepositoryTrait::new();
            activities
                .expect_get_by_oid()
                .returning(|_| Ok(Some(open_activity())));

            let mut url_storage = MockObjectStorage::new();
            url_storage
                .expect_signed_get_url()
                .returning(|bucket, key, _| Ok(format!("https://signed/{}/{}", bucket, key)));

            Self {
                approvals: MockApprovalRepositoryTrait::new(),
                achievements: MockAchievementRepositoryTrait::new(),
                students,
                activities,
                storage: MockObjectStorage::new(),
                url_storage,
            }
        }

        fn no_accepted_achievement(&mut self) {
            self.achievements
                .expect_find_by_key()
                .returning(|_, _, _| Ok(None));
        }

        fn no_existing_approval(&mut self) {
            self.approvals.expect_find().returning(|_, page| {
                Ok(PaginatedResult::new(Vec::new(), 0, page))
            });
        }

        fn existing_approval(&mut self, oid: i64, version: i32) {
            self.approvals.expect_find().returning(move |_, page| {
                let agg = aggregate(oid, ApprovalStatus::Rejected, version);
                Ok(PaginatedResult::new(
                    vec![ApprovalSummary {
                        approval: agg.approval,
                        student: agg.student,
                        activity: agg.activity,
                    }],
                    1,
                    page,
                ))
            });
            self.approvals
                .expect_get_by_id()
                .returning(move |_| Ok(Some(aggregate(oid, ApprovalStatus::Rejected, version))));
        }

        fn build(self) -> ApprovalService {
            let resolver = AttachmentUrlResolver::new(
                Arc::new(self.url_storage),
                PUBLIC_BUCKET,
                "ap-east-1",
                Duration::from_secs(3600),
            );
            ApprovalService::new(
                Arc::new(self.approvals),
                Arc::new(self.achievements),
                Arc::new(self.students),
                Arc::new(self.activities),
                Arc::new(self.storage),
                resolver,
                APPROVAL_BUCKET,
            )
        }
    }

    #[test]
    fn test_destination_key() {
        assert_eq!(
            format!(
                "{}{}",
                destination_prefix("42", "S001"),
                last_segment("tmp/u5/2025/award.pdf")
            ),
            "activity/42/student/S001/award.pdf"
        );
        assert_eq!(last_segment("award.pdf"), "award.pdf");
    }


    #[test]
    fn test_copy_destination_skips_referenced_keys() {
        let mut stored = StoredObjects::default();
        stored.record(APPROVAL_BUCKET, APPROVAL_BUCKET, "activity/42/student/S001/award.pdf", 10);
        stored.record(APPROVAL_BUCKET, APPROVAL_BUCKET, "activity/42/student/S001/award-1.pdf", 10);
        stored.record(APPROVAL_BUCKET, PUBLIC_BUCKET, "activity/42/student/S001/photo.png", 10);

        let uploads = vec![
            upload("tmp/u5/award.pdf", "award.pdf"),
            upload("tmp/u6/award.pdf", "award.pdf"),
            upload("tmp/u5/photo.png", "photo.png"),
            upload("activity/42/student/S001/award.pdf", "award.pdf"),
        ];
        let planned: Vec<Option<String>> =
            plan_placements(&uploads, &stored, "activity/42/student/S001/")
                .into_iter()
                .map(|p| match p {
                    Placement::Copy { dest_key } => Some(dest_key),
                    Placement::Reuse(_) => None,
                })
                .collect();

        assert_eq!(
            planned,
            vec![
                Some("activity/42/student/S001/award-2.pdf".to_string()),
                Some("activity/42/student/S001/award-3.pdf".to_string()),
                // 公共桶中的同名对象不占用审批桶的 key
                Some("activity/42/student/S001/photo.png".to_string()),
                None,
            ]
        );
        assert_eq!(split_extension(".env"), (".env", ""));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension("a.tar.gz"), ("a.tar", ".gz"));
    }

    #[tokio::test]
    async fn test_submit_copies_new_attachments() {
        let mut mocks = Mocks::new();
        mocks.no_existing_approval();
        mocks.no_accepted_achievement();
        mocks
            .storage
            .expect_copy_object()
            .withf(|dest_bucket, source_bucket, source_key, dest_key| {
                dest_bucket == APPROVAL_BUCKET
                    && source_bucket == "upload"
                    && source_key == "tmp/u5/award.pdf"
                    && dest_key == "activity/42/student/S001/award.pdf"
            })
            .times(1)
            .returning(|_, _, _, _| Ok(4096));
        mocks
            .approvals
            .expect_create()
            .withf(|entity, attachments, reviews| {
                entity.status == ApprovalStatus::Pending
                    && entity.version == 1
                    && entity.attachment_count == 1
                    && entity.achievement_submission_role == SubmissionRole::Teacher
                    && attachments.len() == 1
                    && attachments[0].file_size == 4096
                    && attachments[0].file_name == "Award Certificate.pdf"
                    && reviews.is_empty()
            })
            .times(1)
            .returning(|entity, attachments, reviews| Ok(echo_record(100, entity, attachments, reviews)));

        let service = mocks.build();
        let dto = service
            .submit(
                &teacher(),
                request(vec![upload("tmp/u5/award.pdf", "Award Certificate.pdf")]),
                false,
            )
            .await
            .unwrap();

        assert_eq!(dto.approval.id, "100");
        assert_eq!(dto.approval.status, ApprovalStatus::Pending);
        assert_eq!(dto.attachments.len(), 1);
        assert_eq!(
            dto.attachments[0].get_url,
            "https://signed/achievement-approval/activity/42/student/S001/award.pdf"
        );
    }

    #[tokio::test]
    async fn test_submit_reuses_accepted_attachments_without_copy() {
        let mut mocks = Mocks::new();
        mocks.no_existing_approval();
        mocks.achievements.expect_find_by_key().returning(|_, _, _| {
            let now = Utc::now();
            Ok(Some(Achievement {
                oid: 9,
                student_oid: 7,
                activity_oid: 42,
                achievement_submission_role: SubmissionRole::Teacher,
                comment: "accepted".to_string(),
                created_by_user_oid: 5,
                created_at: now,
                updated_by_user_oid: 5,
                updated_at: now,
                version: 1,
            }))
        });
        mocks.achievements.expect_list_attachments().returning(|_| {
            Ok(vec![AchievementAttachment {
                oid: 1,
                achievement_oid: 9,
                bucket_name: PUBLIC_BUCKET.to_string(),
                object_key: "activity/42/student/S001/award.pdf".to_string(),
                file_name: "award.pdf".to_string(),
                file_size: 777,
            }])
        });
        mocks.storage.expect_copy_object().never();
        mocks
            .approvals
            .expect_create()
            .withf(|entity, attachments, _| {
                entity.achievement_oid == Some(9)
                    && attachments.len() == 1
                    && attachments[0].bucket_name == PUBLIC_BUCKET
                    && attachments[0].file_size == 777
            })
            .times(1)
            .returning(|entity, attachments, reviews| Ok(echo_record(101, entity, attachments, reviews)));

        let service = mocks.build();
        let dto = service
            .submit(
                &teacher(),
                request(vec![upload("activity/42/student/S001/award.pdf", "award.pdf")]),
                false,
            )
            .await
            .unwrap();

        assert_eq!(dto.approval.achievement_id.as_deref(), Some("9"));
        assert_eq!(
            dto.attachments[0].get_url,
            "https://achievement-public.s3.ap-east-1.amazonaws.com/activity%2F42%2Fstudent%2FS001%2Faward.pdf"
        );
    }

    #[tokio::test]
    async fn test_duplicate_submission_is_rejected_without_side_effects() {
        let mut mocks = Mocks::new();
        mocks.existing_approval(50, 3);
        mocks.achievements.expect_find_by_key().never();
        mocks.storage.expect_copy_object().never();
        mocks.approvals.expect_create().never();
        mocks.approvals.expect_replace().never();

        let service = mocks.build();
        let err = service
            .submit(&teacher(), request(vec![upload("tmp/a.pdf", "a.pdf")]), false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AchievementError::DuplicateSubmission { ref student_id, ref activity_id }
                if student_id == "S001" && activity_id == "42"
        ));
    }

    #[tokio::test]
    async fn test_delete_existing_replaces_and_carries_reviews() {
        let mut mocks = Mocks::new();
        mocks.existing_approval(50, 3);
        mocks.no_accepted_achievement();
        mocks
            .storage
            .expect_copy_object()
            .times(1)
            .returning(|_, _, _, _| Ok(10));
        mocks.approvals.expect_create().never();
        mocks
            .approvals
            .expect_replace()
            .withf(|existing_oid, expected_version, _, _, reviews| {
                *existing_oid == 50
                    && *expected_version == 3
                    && reviews.len() == 1
                    && reviews[0].comment == "needs a clearer scan"
            })
            .times(1)
            .returning(|_, _, entity, attachments, reviews| {
                Ok(echo_record(51, entity, attachments, reviews))
            });

        let service = mocks.build();
        let dto = service
            .submit(&teacher(), request(vec![upload("tmp/new.pdf", "new.pdf")]), true)
            .await
            .unwrap();

        assert_eq!(dto.approval.id, "51");
        assert_eq!(dto.reviews.len(), 1);
    }

    #[tokio::test]
    async fn test_copy_failure_removes_completed_copies() {
        let mut mocks = Mocks::new();
        mocks.no_existing_approval();
        mocks.no_accepted_achievement();
        mocks
            .storage
            .expect_copy_object()
            .returning(|_, _, source_key, _| {
                if source_key == "tmp/bad.pdf" {
                    Err(AchievementError::Storage("NoSuchKey".to_string()))
                } else {
                    Ok(10)
                }
            });
        let deleted = Arc::new(Mutex::new(Vec::new()));
        let sink = deleted.clone();
        mocks
            .storage
            .expect_delete_object()
            .returning(move |bucket, key| {
                sink.lock().unwrap().push(format!("{}/{}", bucket, key));
                Ok(())
            });
        mocks.approvals.expect_create().never();

        let service = mocks.build();
        let err = service
            .submit(
                &teacher(),
                request(vec![upload("tmp/good.pdf", "good.pdf"), upload("tmp/bad.pdf", "bad.pdf")]),
                false,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AchievementError::Storage(_)));
        assert_eq!(
            *deleted.lock().unwrap(),
            vec!["achievement-approval/activity/42/student/S001/good.pdf".to_string()]
        );
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_objects_of_replaced_approval() {
        let mut mocks = Mocks::new();
        mocks.existing_approval(50, 3);
        mocks.no_accepted_achievement();
        mocks
            .storage
            .expect_copy_object()
            .times(1)
            .returning(|_, _, _, _| Ok(10));
        let deleted = Arc::new(Mutex::new(Vec::new()));
        let sink = deleted.clone();
        mocks
            .storage
            .expect_delete_object()
            .returning(move |_, key| {
                sink.lock().unwrap().push(key.to_string());
                Ok(())
            });
        mocks
            .approvals
            .expect_replace()
            .returning(|existing_oid, _, _, _, _| {
                Err(AchievementError::ConcurrentModification {
                    entity: ENTITY,
                    oid: existing_oid,
                })
            });

        let service = mocks.build();
        let err = service
            .submit(
                &teacher(),
                request(vec![
                    upload("activity/42/student/S001/old.pdf", "old.pdf"),
                    upload("tmp/fresh.pdf", "fresh.pdf"),
                ]),
                true,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AchievementError::ConcurrentModification { oid: 50, .. }));
        assert_eq!(
            *deleted.lock().unwrap(),
            vec!["activity/42/student/S001/fresh.pdf".to_string()]
        );
    }


    #[tokio::test]
    async fn test_persist_failure_keeps_accepted_achievement_objects() {
        let mut mocks = Mocks::new();
        mocks.no_existing_approval();
        mocks.achievements.expect_find_by_key().returning(|_, _, _| {
            let now = Utc::now();
            Ok(Some(Achievement {
                oid: 9,
                student_oid: 7,
                activity_oid: 42,
                achievement_submission_role: SubmissionRole::Teacher,
                comment: "accepted".to_string(),
                created_by_user_oid: 5,
                created_at: now,
                updated_by_user_oid: 5,
                updated_at: now,
                version: 1,
            }))
        });
        mocks.achievements.expect_list_attachments().returning(|_| {
            Ok(vec![AchievementAttachment {
                oid: 1,
                achievement_oid: 9,
                bucket_name: APPROVAL_BUCKET.to_string(),
                object_key: "activity/42/student/S001/award.pdf".to_string(),
                file_name: "award.pdf".to_string(),
                file_size: 777,
            }])
        });
        // 同名上传不得覆盖已通过成就引用的对象
        mocks
            .storage
            .expect_copy_object()
            .withf(|_, _, source_key, dest_key| {
                source_key == "tmp/u5/award.pdf"
                    && dest_key == "activity/42/student/S001/award-1.pdf"
            })
            .times(1)
            .returning(|_, _, _, _| Ok(10));
        let deleted = Arc::new(Mutex::new(Vec::new()));
        let sink = deleted.clone();
        mocks
            .storage
            .expect_delete_object()
            .returning(move |_, key| {
                sink.lock().unwrap().push(key.to_string());
                Ok(())
            });
        mocks
            .approvals
            .expect_create()
            .times(1)
            .returning(|_, _, _| Err(AchievementError::Internal("insert failed".to_string())));

        let service = mocks.build();
        let err = service
            .submit(
                &teacher(),
                request(vec![upload("tmp/u5/award.pdf", "award.pdf")]),
                false,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AchievementError::Internal(_)));
        let deleted = deleted.lock().unwrap();
        assert_eq!(*deleted, vec!["activity/42/student/S001/award-1.pdf".to_string()]);
        assert!(!deleted.contains(&"activity/42/student/S001/award.pdf".to_string()));
    }

    #[tokio::test]
    async fn test_validation_failure_has_no_side_effects() {
        let mut mocks = Mocks::new();
        mocks.activities = MockActivityRepositoryTrait::new();
        mocks.activities.expect_get_by_oid().returning(|_| Ok(None));
        mocks.approvals.expect_find().never();
        mocks.storage.expect_copy_object().never();

        let service = mocks.build();
        let err = service
            .submit(&teacher(), request(vec![upload("tmp/a.pdf", "a.pdf")]), false)
            .await
            .unwrap_err();

        assert!(matches!(err, AchievementError::NotFound { entity: "Activity", .. }));
    }

    #[tokio::test]
    async fn test_get_unknown_approval_is_not_found() {
        let mut mocks = Mocks::new();
        mocks.approvals.expect_get_by_id().returning(|_| Ok(None));

        let service = mocks.build();
        let err = service.get_approval("abc").await.unwrap_err();
        assert!(matches!(err, AchievementError::NotFound { entity: ENTITY, .. }));
    }

    #[tokio::test]
    async fn test_find_with_malformed_activity_id_is_empty() {
        let mut mocks = Mocks::new();
        mocks.approvals.expect_find().never();

        let service = mocks.build();
        let page = service
            .find_approvals(ApprovalQuery {
                activity_id: Some("abc".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_update_stale_version_is_rejected() {
        let mut mocks = Mocks::new();
        mocks
            .approvals
            .expect_get_by_id()
            .returning(|_| Ok(Some(aggregate(60, ApprovalStatus::Pending, 4))));
        mocks
            .approvals
            .expect_update()
            .withf(|entity, attachments| entity.version == 3 && attachments.is_none())
            .times(1)
            .returning(|entity, _| {
                Err(AchievementError::ConcurrentModification {
                    entity: ENTITY,
                    oid: entity.oid,
                })
            });
        mocks.storage.expect_delete_object().never();

        let service = mocks.build();
        let err = service
            .update_approval(
                &teacher(),
                "60",
                UpdateApprovalRequest {
                    comment: "edited".to_string(),
                    attachments: None,
                    version: 3,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AchievementError::ConcurrentModification { oid: 60, .. }));
    }


    #[tokio::test]
    async fn test_update_failure_keeps_current_attachments() {
        let mut mocks = Mocks::new();
        mocks
            .approvals
            .expect_get_by_id()
            .returning(|_| Ok(Some(aggregate(60, ApprovalStatus::Pending, 4))));
        mocks
            .storage
            .expect_copy_object()
            .withf(|_, _, _, dest_key| dest_key == "activity/42/student/S001/old-1.pdf")
            .times(1)
            .returning(|_, _, _, _| Ok(10));
        let deleted = Arc::new(Mutex::new(Vec::new()));
        let sink = deleted.clone();
        mocks
            .storage
            .expect_delete_object()
            .returning(move |_, key| {
                sink.lock().unwrap().push(key.to_string());
                Ok(())
            });
        mocks
            .approvals
            .expect_update()
            .withf(|_, attachments| {
                attachments.as_ref().is_some_and(|list| {
                    list.len() == 1 && list[0].object_key == "activity/42/student/S001/old-1.pdf"
                })
            })
            .times(1)
            .returning(|_, _| Err(AchievementError::Internal("update failed".to_string())));

        let service = mocks.build();
        let err = service
            .update_approval(
                &teacher(),
                "60",
                UpdateApprovalRequest {
                    comment: "rescanned".to_string(),
                    attachments: Some(vec![upload("tmp/u5/old.pdf", "old.pdf")]),
                    version: 4,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AchievementError::Internal(_)));
        assert_eq!(
            *deleted.lock().unwrap(),
            vec!["activity/42/student/S001/old-1.pdf".to_string()]
        );
    }

    #[tokio::test]
    async fn test_update_requires_pending() {
        let mut mocks = Mocks::new();
        mocks
            .approvals
            .expect_get_by_id()
            .returning(|_| Ok(Some(aggregate(60, ApprovalStatus::Approved, 4))));
        mocks.approvals.expect_update().never();

        let service = mocks.build();
        let err = service
            .update_approval(
                &teacher(),
                "60",
                UpdateApprovalRequest {
                    comment: "edited".to_string(),
                    attachments: None,
                    version: 4,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AchievementError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_delete_unknown_approval_is_not_found() {
        let mut mocks = Mocks::new();
        mocks.approvals.expect_get_by_id().returning(|_| Ok(None));
        mocks.approvals.expect_delete().never();

        let service = mocks.build();
        let err = service.delete_approval("77", 1).await.unwrap_err();
        assert!(matches!(err, AchievementError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_review_requires_approval_right() {
        let mut mocks = Mocks::new();
        mocks.approvals.expect_get_by_id().never();
        mocks.approvals.expect_record_review().never();

        let service = mocks.build();
        let actor = AuthenticatedUser {
            with_approval_right: false,
            ..teacher()
        };
        let err = service
            .review_approval(
                &actor,
                "60",
                ReviewApprovalRequest {
                    decision: ReviewDecision::Approve,
                    comment: String::new(),
                    version: 1,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AchievementError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_review_records_outcome() {
        let mut mocks = Mocks::new();
        let reviewed = Arc::new(Mutex::new(false));
        let flag = reviewed.clone();
        mocks.approvals.expect_get_by_id().returning(move |_| {
            let status = if *flag.lock().unwrap() {
                ApprovalStatus::Approved
            } else {
                ApprovalStatus::Pending
            };
            Ok(Some(aggregate(60, status, 2)))
        });
        let flag = reviewed.clone();
        mocks
            .approvals
            .expect_record_review()
            .withf(|outcome| {
                outcome.approval_oid == 60
                    && outcome.expected_version == 2
                    && outcome.reviewer_user_oid == 5
                    && outcome.decision == ReviewDecision::Approve
            })
            .times(1)
            .returning(move |_| {
                *flag.lock().unwrap() = true;
                let mut a = approval(60, ApprovalStatus::Approved, 3);
                a.achievement_oid = Some(9);
                Ok(a)
            });

        let service = mocks.build();
        let dto = service
            .review_approval(
                &teacher(),
                "60",
                ReviewApprovalRequest {
                    decision: ReviewDecision::Approve,
                    comment: "well done".to_string(),
                    version: 2,
                },
            )
            .await
            .unwrap();

        assert_eq!(dto.approval.status, ApprovalStatus::Approved);
    }

}
