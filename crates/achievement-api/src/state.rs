//! 应用状态定义
//!
//! 仓储在此处以同一个连接池构造并注入各服务

use std::sync::Arc;

use achievement_service::{
    AchievementQueryService, AchievementRepository, ActivityRepository, ApprovalRepository,
    ApprovalService, AttachmentUrlResolver, AuthService, BcryptVerifier, ClassRepository,
    ClassService, ObjectStorage, StudentRepository, UserRepository, UserService,
};
use achievement_shared::config::StorageConfig;
use achievement_shared::database::Database;

use crate::auth::{JwtConfig, JwtManager};

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub approval_service: Arc<ApprovalService>,
    pub achievement_service: Arc<AchievementQueryService>,
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub class_service: Arc<ClassService>,
    pub jwt_manager: Arc<JwtManager>,
}

impl AppState {
    pub fn new(
        db: Database,
        storage: Arc<dyn ObjectStorage>,
        storage_config: &StorageConfig,
        jwt_config: JwtConfig,
    ) -> Self {
        let pool = db.pool().clone();
        let approval_repo = Arc::new(ApprovalRepository::new(pool.clone()));
        let achievement_repo = Arc::new(AchievementRepository::new(pool.clone()));
        let student_repo = Arc::new(StudentRepository::new(pool.clone()));
        let activity_repo = Arc::new(ActivityRepository::new(pool.clone()));
        let user_repo = Arc::new(UserRepository::new(pool.clone()));
        let class_repo = Arc::new(ClassRepository::new(pool.clone()));

        let url_resolver = AttachmentUrlResolver::from_config(storage.clone(), storage_config);
        let bcrypt = BcryptVerifier::default();

        let approval_service = ApprovalService::new(
            approval_repo,
            achievement_repo.clone(),
            student_repo,
            activity_repo,
            storage,
            url_resolver.clone(),
            storage_config.approval_bucket.clone(),
        );

        Self {
            db,
            approval_service: Arc::new(approval_service),
            achievement_service: Arc::new(AchievementQueryService::new(achievement_repo, url_resolver)),
            auth_service: Arc::new(AuthService::new(user_repo.clone(), Arc::new(bcrypt))),
            user_service: Arc::new(UserService::new(user_repo, bcrypt)),
            class_service: Arc::new(ClassService::new(class_repo)),
            jwt_manager: Arc::new(JwtManager::new(jwt_config)),
        }
    }
}
