//! 登录处理器

use achievement_service::dto::LoginRequest;
use axum::{Json, extract::State};
use tracing::info;
use validator::Validate;

use crate::dto::{ApiResponse, LoginResponse};
use crate::error::Result;
use crate::state::AppState;

/// 邮箱密码登录，成功后签发 JWT
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    req.validate()?;

    let (principal, result) = state
        .auth_service
        .authenticate(&req.email, &req.password)
        .await?;
    let (token, expires_at) = state.jwt_manager.generate_token(&principal)?;

    info!(user_oid = principal.oid, "用户登录成功");

    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        expires_at,
        result,
    })))
}
