//! 中间件模块

mod auth;

pub use auth::{CurrentUser, auth_middleware};
