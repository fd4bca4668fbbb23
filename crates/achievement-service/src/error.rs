//! 成就服务错误类型
//!
//! 定义服务层的业务错误和系统错误

use thiserror::Error;

/// 成就服务错误类型
#[derive(Debug, Error)]
pub enum AchievementError {
    // === 业务错误 ===
    #[error("{entity} 不存在: {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{entity} 已被其他请求修改: oid={oid}")]
    ConcurrentModification { entity: &'static str, oid: i64 },

    #[error("邮箱或密码错误")]
    InvalidCredentials,

    #[error("成就审批已存在: student_id={student_id}, activity_id={activity_id}")]
    DuplicateSubmission {
        student_id: String,
        activity_id: String,
    },

    #[error("校验失败: {0}")]
    ValidationFailed(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("对象存储错误: {0}")]
    Storage(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 成就服务 Result 类型别名
pub type Result<T> = std::result::Result<T, AchievementError>;

impl AchievementError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }

    /// 检查是否为可重试的错误
    ///
    /// 乐观锁冲突由调用方重新读取后重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::ConcurrentModification { .. })
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Storage(_) | Self::Internal(_)
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::DuplicateSubmission { .. } => "DUPLICATE_SUBMISSION",
            Self::ValidationFailed(_) => "VALIDATION_FAILED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
