//! 数据库仓储层
//!
//! 提供所有实体的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 连接池在构造时显式注入，没有全局连接
//! - 多表写入在单个事务内完成
//! - 带版本号的条件写入影响 0 行时返回 `ConcurrentModification`
//! - 数据库错误记录日志后原样向上传递

mod achievement_repo;
mod activity_repo;
mod approval_repo;
mod class_repo;
mod student_repo;
mod traits;
mod user_repo;

use achievement_shared::observability::metrics;
use tracing::warn;

use crate::error::AchievementError;

pub use achievement_repo::AchievementRepository;
pub use activity_repo::ActivityRepository;
pub use approval_repo::ApprovalRepository;
pub use class_repo::ClassRepository;
pub use student_repo::StudentRepository;
pub use traits::*;
pub use user_repo::UserRepository;

/// 解析字符串形式的 oid，非数字返回 None
pub fn parse_oid(id: &str) -> Option<i64> {
    id.parse::<i64>().ok()
}

/// 构造乐观锁冲突错误并记录指标
pub(crate) fn version_conflict(entity: &'static str, oid: i64, expected_version: i32) -> AchievementError {
    warn!(entity, oid, expected_version, "版本号不匹配，拒绝写入");
    metrics::record_optimistic_lock_conflict(entity);
    AchievementError::ConcurrentModification { entity, oid }
}
