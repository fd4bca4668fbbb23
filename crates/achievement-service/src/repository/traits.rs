//! 仓储 Trait 定义
//!
//! 服务层依赖这些抽象而非具体实现，便于 mock 测试

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    Achievement, AchievementApproval, AchievementAttachment, AchievementDetail,
    AchievementFilter, AchievementSummary, Activity, ApprovalAggregate, ApprovalFilter,
    ApprovalRecord, ApprovalReview, ApprovalSummary, Class, NewAchievementApproval,
    NewAttachment, NewReview, NewUser, PageRequest, PaginatedResult, ReviewOutcome, Student,
    SubmissionRole, User, UserWithStudents,
};

/// 成就审批仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApprovalRepositoryTrait: Send + Sync {
    async fn find(
        &self,
        filter: &ApprovalFilter,
        page: &PageRequest,
    ) -> Result<PaginatedResult<ApprovalSummary>>;

    /// 非数字 id 返回 None
    async fn get_by_id(&self, id: &str) -> Result<Option<ApprovalAggregate>>;

    async fn list_reviews(&self, approval_oid: i64) -> Result<Vec<ApprovalReview>>;

    async fn create(
        &self,
        approval: &NewAchievementApproval,
        attachments: &[NewAttachment],
        reviews: &[NewReview],
    ) -> Result<ApprovalRecord>;

    /// 以 `approval.version` 为期望版本更新；`attachments` 为 Some 时整体替换附件
    async fn update(
        &self,
        approval: &AchievementApproval,
        attachments: Option<Vec<NewAttachment>>,
    ) -> Result<AchievementApproval>;

    async fn delete(&self, oid: i64, expected_version: i32) -> Result<()>;

    /// 在同一事务中删除旧审批并写入新审批
    async fn replace(
        &self,
        existing_oid: i64,
        expected_version: i32,
        approval: &NewAchievementApproval,
        attachments: &[NewAttachment],
        reviews: &[NewReview],
    ) -> Result<ApprovalRecord>;

    async fn record_review(&self, outcome: &ReviewOutcome) -> Result<AchievementApproval>;
}

/// 成就仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AchievementRepositoryTrait: Send + Sync {
    async fn find(
        &self,
        filter: &AchievementFilter,
        page: &PageRequest,
    ) -> Result<PaginatedResult<AchievementSummary>>;

    async fn get_by_oid(&self, oid: i64) -> Result<Option<AchievementDetail>>;

    /// 按 (学生, 活动, 提交角色) 查找已通过的成就
    async fn find_by_key(
        &self,
        student_oid: i64,
        activity_oid: i64,
        role: SubmissionRole,
    ) -> Result<Option<Achievement>>;

    async fn list_attachments(&self, achievement_oid: i64) -> Result<Vec<AchievementAttachment>>;
}

/// 学生仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StudentRepositoryTrait: Send + Sync {
    async fn get_by_id(&self, id: &str) -> Result<Option<Student>>;
    async fn get_by_oid(&self, oid: i64) -> Result<Option<Student>>;
    /// 用户是否可代该学生提交
    async fn is_entitled(&self, user_oid: i64, student_oid: i64) -> Result<bool>;
}

/// 活动仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityRepositoryTrait: Send + Sync {
    async fn get_by_oid(&self, oid: i64) -> Result<Option<Activity>>;
}

/// 用户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Vec<UserWithStudents>>;
    async fn get_by_oid(&self, oid: i64) -> Result<Option<UserWithStudents>>;
    async fn create(&self, user: &NewUser) -> Result<User>;
    /// 以 `user.version` 为期望版本更新
    async fn update(&self, user: &User) -> Result<User>;
    async fn record_login(&self, oid: i64, at: DateTime<Utc>) -> Result<()>;
}

/// 班级仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClassRepositoryTrait: Send + Sync {
    async fn find(&self, grade: Option<i32>, class_code: Option<String>) -> Result<Vec<Class>>;
}
