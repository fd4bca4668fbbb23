//! 学生成就审批 REST API
//!
//! 对外提供登录、成就审批、成就查询、用户与班级维护接口。
//!
//! ## 模块结构
//!
//! - `auth`: JWT 签发与校验
//! - `dto`: 统一响应包装与查询参数
//! - `error`: API 错误类型
//! - `handlers`: HTTP 请求处理器
//! - `middleware`: 认证中间件
//! - `routes`: 路由配置
//! - `state`: 应用状态

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use dto::ApiResponse;
pub use error::{ApiError, Result};
pub use state::AppState;
