//! JWT 认证中间件
//!
//! 验证请求中的 Bearer Token 并将操作人注入请求扩展

use achievement_service::AuthenticatedUser;
use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppState;

/// 公开路由（不需要认证）
const PUBLIC_PATHS: [&str; 3] = ["/api/auth/login", "/health", "/ready"];

/// 认证中间件
///
/// 从 Authorization header 中提取 Bearer Token，验证后将 `AuthenticatedUser`
/// 注入请求扩展。公开路由跳过验证。
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();

    if PUBLIC_PATHS.iter().any(|p| path.starts_with(p)) {
        return next.run(request).await;
    }

    let token = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token.to_string(),
        None => return ApiError::Unauthorized("缺少认证 Token".to_string()).into_response(),
    };

    match state
        .jwt_manager
        .verify_token(&token)
        .and_then(|claims| claims.principal())
    {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// 处理器中提取当前操作人
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .map(CurrentUser)
            .ok_or_else(|| ApiError::Unauthorized("未登录".to_string()))
    }
}
