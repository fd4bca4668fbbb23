//! 成就审批处理器

use achievement_service::PaginatedResult;
use achievement_service::dto::{
    ApprovalDetailDto, ApprovalDto, ApprovalQuery, CreateApprovalRequest, ReviewApprovalRequest,
    UpdateApprovalRequest,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use validator::Validate;

use crate::dto::{ApiResponse, SubmitParams, VersionParams};
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// GET /api/achievement-approvals
pub async fn list_approvals(
    State(state): State<AppState>,
    Query(query): Query<ApprovalQuery>,
) -> Result<Json<ApiResponse<PaginatedResult<ApprovalDto>>>> {
    query.validate()?;

    let page = state.approval_service.find_approvals(query).await?;
    Ok(Json(ApiResponse::success(page)))
}

/// 提交成就审批
///
/// POST /api/achievement-approvals?deleteExisting=true
pub async fn submit_approval(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(params): Query<SubmitParams>,
    Json(req): Json<CreateApprovalRequest>,
) -> Result<Json<ApiResponse<ApprovalDetailDto>>> {
    req.validate()?;

    let detail = state
        .approval_service
        .submit(&actor, req, params.delete_existing)
        .await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// GET /api/achievement-approvals/{id}
pub async fn get_approval(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ApprovalDetailDto>>> {
    let detail = state.approval_service.get_approval(&id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// PUT /api/achievement-approvals/{id}
pub async fn update_approval(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateApprovalRequest>,
) -> Result<Json<ApiResponse<ApprovalDetailDto>>> {
    req.validate()?;

    let detail = state.approval_service.update_approval(&actor, &id, req).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// DELETE /api/achievement-approvals/{id}?version=N
pub async fn delete_approval(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<VersionParams>,
) -> Result<Json<ApiResponse<()>>> {
    state.approval_service.delete_approval(&id, params.version).await?;
    Ok(Json(ApiResponse::<()>::success_empty()))
}

/// 审核
///
/// POST /api/achievement-approvals/{id}/reviews
pub async fn review_approval(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<ReviewApprovalRequest>,
) -> Result<Json<ApiResponse<ApprovalDetailDto>>> {
    req.validate()?;

    let detail = state.approval_service.review_approval(&actor, &id, req).await?;
    Ok(Json(ApiResponse::success(detail)))
}
