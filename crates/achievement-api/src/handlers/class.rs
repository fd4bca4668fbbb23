//! 班级查询处理器

use achievement_service::dto::{ClassDto, ClassQuery};
use axum::{
    Json,
    extract::{Query, State},
};

use crate::dto::ApiResponse;
use crate::error::Result;
use crate::state::AppState;

/// GET /api/classes?grade=&classCode=
pub async fn list_classes(
    State(state): State<AppState>,
    Query(query): Query<ClassQuery>,
) -> Result<Json<ApiResponse<Vec<ClassDto>>>> {
    let classes = state.class_service.find_classes(query).await?;
    Ok(Json(ApiResponse::success(classes)))
}
