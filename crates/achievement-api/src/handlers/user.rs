//! 用户维护处理器

use achievement_service::dto::{UserCreationDto, UserDto, UserUpdateDto};
use axum::{
    Json,
    extract::{Path, State},
};
use validator::Validate;

use crate::dto::ApiResponse;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserDto>>> {
    let user = state.user_service.get_user(&id).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(req): Json<UserCreationDto>,
) -> Result<Json<ApiResponse<UserDto>>> {
    req.validate()?;

    let user = state.user_service.create_user(&actor, req).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PUT /api/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UserUpdateDto>,
) -> Result<Json<ApiResponse<UserDto>>> {
    req.validate()?;

    let user = state.user_service.update_user(&actor, &id, req).await?;
    Ok(Json(ApiResponse::success(user)))
}
