//! 活动仓储

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::error;

use super::traits::ActivityRepositoryTrait;
use crate::error::Result;
use crate::models::Activity;

pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_oid(&self, oid: i64) -> Result<Option<Activity>> {
        let activity = sqlx::query_as::<_, Activity>(
            r#"
            SELECT oid, name_en, name_zh_hant, name_zh_hans, start_date, end_date,
                   student_submission_allowed, teacher_submission_allowed, status
            FROM activity
            WHERE oid = $1
            "#,
        )
        .bind(oid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(activity)
    }

    /// 在给定连接上批量加载活动，返回 oid -> 活动
    pub async fn load_by_oids(
        conn: &mut PgConnection,
        oids: &[i64],
    ) -> Result<HashMap<i64, Activity>> {
        if oids.is_empty() {
            return Ok(HashMap::new());
        }

        let activities = sqlx::query_as::<_, Activity>(
            r#"
            SELECT oid, name_en, name_zh_hant, name_zh_hans, start_date, end_date,
                   student_submission_allowed, teacher_submission_allowed, status
            FROM activity
            WHERE oid = ANY($1)
            "#,
        )
        .bind(oids)
        .fetch_all(conn)
        .await?;

        Ok(activities.into_iter().map(|a| (a.oid, a)).collect())
    }
}

#[async_trait]
impl ActivityRepositoryTrait for ActivityRepository {
    async fn get_by_oid(&self, oid: i64) -> Result<Option<Activity>> {
        self.get_by_oid(oid)
            .await
            .inspect_err(|e| error!(activity_oid = oid, error = %e, "查询活动失败"))
    }
}
