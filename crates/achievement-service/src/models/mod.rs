//! 成就服务领域模型

pub mod achievement;
pub mod approval;
pub mod enums;
pub mod pagination;
pub mod reference;

pub use achievement::{
    Achievement, AchievementAttachment, AchievementDetail, AchievementFilter, AchievementSummary,
};
pub use approval::{
    AchievementApproval, ApprovalAggregate, ApprovalAttachment, ApprovalFilter, ApprovalRecord,
    ApprovalReview, ApprovalSummary, NewAchievementApproval, NewAttachment, NewReview, ReviewOutcome,
};
pub use enums::{
    ActivityStatus, ApprovalStatus, ReviewDecision, StudentStatus, SubmissionRole, UserRole,
    UserStatus,
};
pub use pagination::{OrderField, Ordering, PageRequest, PaginatedResult, SortDirection};
pub use reference::{Activity, Class, NewUser, Student, User, UserWithStudents};
