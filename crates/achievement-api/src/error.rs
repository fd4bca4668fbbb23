//! API 错误类型定义
//!
//! 服务层错误原样包装，另加认证失败与请求参数错误

use achievement_service::AchievementError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("未授权: {0}")]
    Unauthorized(String),

    #[error("参数验证失败: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Service(#[from] AchievementError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Service(e) => match e {
                AchievementError::NotFound { .. } => StatusCode::NOT_FOUND,
                AchievementError::ConcurrentModification { .. }
                | AchievementError::DuplicateSubmission { .. } => StatusCode::CONFLICT,
                AchievementError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AchievementError::ValidationFailed(_) => StatusCode::FORBIDDEN,
                AchievementError::Storage(_) => StatusCode::BAD_GATEWAY,
                AchievementError::Database(_) | AchievementError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Service(e) => e.error_code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息记录日志
        let message = match &self {
            Self::Service(AchievementError::Database(e)) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Service(AchievementError::Storage(e)) => {
                tracing::error!(error = %e, "对象存储操作失败");
                "存储服务暂不可用，请稍后重试".to_string()
            }
            Self::Service(AchievementError::Internal(e)) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::BadRequest(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
