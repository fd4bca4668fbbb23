//! 成就查询处理器

use achievement_service::PaginatedResult;
use achievement_service::dto::{AchievementDetailDto, AchievementDto, AchievementQuery};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use validator::Validate;

use crate::dto::ApiResponse;
use crate::error::Result;
use crate::state::AppState;

/// GET /api/achievements
pub async fn list_achievements(
    State(state): State<AppState>,
    Query(query): Query<AchievementQuery>,
) -> Result<Json<ApiResponse<PaginatedResult<AchievementDto>>>> {
    query.validate()?;

    let page = state.achievement_service.find_achievements(query).await?;
    Ok(Json(ApiResponse::success(page)))
}

/// GET /api/achievements/{id}
pub async fn get_achievement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<AchievementDetailDto>>> {
    let detail = state.achievement_service.get_achievement(&id).await?;
    Ok(Json(ApiResponse::success(detail)))
}
