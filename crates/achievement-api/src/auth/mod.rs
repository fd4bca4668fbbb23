//! 认证模块
//!
//! 提供 JWT Token 生成与验证

mod jwt;

pub use jwt::{Claims, JwtConfig, JwtManager};
