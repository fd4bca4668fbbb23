//! 服务层数据传输对象
//!
//! 定义服务层与外部交互使用的 DTO，与内部领域模型解耦。
//! 对外的 id 一律为字符串。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{
    ActivityStatus, ApprovalStatus, OrderField, ReviewDecision, SortDirection, StudentStatus,
    SubmissionRole, UserRole, UserStatus,
};

// ==================== 通用 ====================

/// 多语言名称，缺失的语言不输出
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedName {
    #[serde(rename = "English", default, skip_serializing_if = "Option::is_none")]
    pub english: Option<String>,
    #[serde(
        rename = "TraditionalChinese",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub traditional_chinese: Option<String>,
    #[serde(
        rename = "SimplifiedChinese",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub simplified_chinese: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummaryDto {
    /// 学号
    pub id: String,
    pub name: LocalizedName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_number: Option<i32>,
    pub status: StudentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummaryDto {
    pub id: String,
    pub name: LocalizedName,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ActivityStatus,
}

/// 附件（含解析后的下载地址）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDto {
    pub id: String,
    pub bucket_name: String,
    pub object_key: String,
    pub file_name: String,
    pub file_size: i64,
    pub get_url: String,
}

// ==================== 成就审批 ====================

/// 上传后待提交的附件引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentUploadDto {
    #[validate(length(min = 1, message = "bucketName 不能为空"))]
    pub bucket_name: String,
    #[validate(length(min = 1, max = 1024, message = "objectKey 长度必须在1-1024个字符之间"))]
    pub object_key: String,
    #[validate(length(min = 1, max = 255, message = "fileName 长度必须在1-255个字符之间"))]
    pub file_name: String,
}

/// 提交成就审批请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateApprovalRequest {
    /// 学号
    #[validate(length(min = 1, message = "studentId 不能为空"))]
    pub student_id: String,
    #[validate(length(min = 1, message = "activityId 不能为空"))]
    pub activity_id: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    #[validate(nested)]
    pub attachments: Vec<AttachmentUploadDto>,
}

/// 修改待审批记录请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApprovalRequest {
    #[serde(default)]
    pub comment: String,
    /// 为空时附件保持不变；给出时整体替换
    #[validate(nested)]
    pub attachments: Option<Vec<AttachmentUploadDto>>,
    pub version: i32,
}

/// 审核请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewApprovalRequest {
    pub decision: ReviewDecision,
    #[serde(default)]
    #[validate(length(max = 2000, message = "审核意见不能超过2000个字符"))]
    pub comment: String,
    pub version: i32,
}

/// 审批列表查询条件
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalQuery {
    pub student_id: Option<String>,
    pub activity_id: Option<String>,
    pub status: Option<ApprovalStatus>,
    pub role: Option<SubmissionRole>,
    #[validate(range(min = 0, message = "offset 不能为负数"))]
    pub offset: Option<i64>,
    #[validate(range(min = 0, message = "limit 不能为负数"))]
    pub limit: Option<i64>,
    pub order_by_field: Option<OrderField>,
    pub order_by_direction: Option<SortDirection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDto {
    pub id: String,
    pub reviewer_id: String,
    pub decision: ReviewDecision,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// 审批（列表项）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDto {
    pub id: String,
    pub student: StudentSummaryDto,
    pub activity: ActivitySummaryDto,
    pub role: SubmissionRole,
    pub status: ApprovalStatus,
    pub comment: String,
    pub attachment_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievement_id: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

/// 审批详情
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDetailDto {
    #[serde(flatten)]
    pub approval: ApprovalDto,
    pub attachments: Vec<AttachmentDto>,
    pub reviews: Vec<ReviewDto>,
}

// ==================== 成就 ====================

/// 成就列表查询条件
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AchievementQuery {
    pub student_id: Option<String>,
    pub activity_id: Option<String>,
    pub role: Option<SubmissionRole>,
    #[validate(range(min = 0, message = "offset 不能为负数"))]
    pub offset: Option<i64>,
    #[validate(range(min = 0, message = "limit 不能为负数"))]
    pub limit: Option<i64>,
    pub order_by_field: Option<OrderField>,
    pub order_by_direction: Option<SortDirection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDto {
    pub id: String,
    pub student: StudentSummaryDto,
    pub activity: ActivitySummaryDto,
    pub role: SubmissionRole,
    pub comment: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDetailDto {
    #[serde(flatten)]
    pub achievement: AchievementDto,
    pub attachments: Vec<AttachmentDto>,
}

// ==================== 用户与认证 ====================

/// 登录请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: String,
    #[validate(length(min = 1, message = "密码不能为空"))]
    pub password: String,
}

/// 登录结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResult {
    pub user: UserDto,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub name: LocalizedName,
    pub email: String,
    pub entitled_student_id: Vec<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub last_login_datetime: Option<DateTime<Utc>>,
    pub password_expiry_datetime: Option<DateTime<Utc>>,
    pub with_approval_right: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

/// 创建用户请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserCreationDto {
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: String,
    #[serde(default)]
    pub name: LocalizedName,
    pub role: UserRole,
    pub status: UserStatus,
    #[serde(default)]
    pub with_approval_right: bool,
    /// 初始密码，可为空（此时无法登录）
    #[validate(length(min = 8, max = 128, message = "密码长度必须在8-128个字符之间"))]
    pub password: Option<String>,
}

/// 更新用户请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateDto {
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: String,
    #[serde(default)]
    pub name: LocalizedName,
    pub role: UserRole,
    pub status: UserStatus,
    /// 为空时保持原值
    pub with_approval_right: Option<bool>,
    /// 为空时不修改密码
    #[validate(length(min = 8, max = 128, message = "密码长度必须在8-128个字符之间"))]
    pub password: Option<String>,
    pub version: i32,
}

// ==================== 班级 ====================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassQuery {
    pub grade: Option<i32>,
    pub class_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDto {
    pub id: String,
    pub grade: i32,
    pub class_code: String,
}
