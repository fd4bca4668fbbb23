//! 学生成就审批服务
//!
//! 提供成就提交、审批、查询以及用户认证等核心业务能力。
//!
//! ## 核心功能
//!
//! - **成就提交**：校验学生与活动后，复制附件到审批桶并写入待审批记录
//! - **审批流转**：审核人通过/驳回待审批记录，通过时生成正式成就
//! - **乐观锁**：所有可变记录携带 version，过期写入被拒绝
//! - **用户认证**：邮箱 + 密码登录，凭证校验可替换
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `repository`: 数据库仓储层
//! - `storage`: 对象存储（S3）访问
//! - `credential`: 密码哈希与校验
//! - `mapper`: 实体与 DTO 转换
//! - `service`: 业务服务层

pub mod credential;
pub mod error;
pub mod mapper;
pub mod models;
pub mod repository;
pub mod service;
pub mod storage;

pub use credential::{BcryptVerifier, CredentialVerifier};
pub use error::{AchievementError, Result};
pub use models::*;
pub use repository::{
    AchievementRepository, ActivityRepository, ApprovalRepository, ClassRepository,
    StudentRepository, UserRepository,
};
pub use service::{
    AchievementQueryService, ApprovalService, AuthService, AuthenticatedUser, ClassService,
    UserService, dto,
};
pub use storage::{AttachmentUrlResolver, ObjectStorage, S3ObjectStorage};
