//! HTTP 请求处理器

pub mod achievement;
pub mod approval;
pub mod auth;
pub mod class;
pub mod health;
pub mod user;
