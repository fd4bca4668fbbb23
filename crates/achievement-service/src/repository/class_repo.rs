//! 班级仓储

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::error;

use super::traits::ClassRepositoryTrait;
use crate::error::Result;
use crate::models::Class;

pub struct ClassRepository {
    pool: PgPool,
}

impl ClassRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按年级、班别查询，条件均可省略
    pub async fn find(&self, grade: Option<i32>, class_code: Option<&str>) -> Result<Vec<Class>> {
        let classes = sqlx::query_as::<_, Class>(
            r#"
            SELECT oid, grade, class_code, created_by_user_oid, created_at,
                   updated_by_user_oid, updated_at
            FROM class
            WHERE ($1::int IS NULL OR grade = $1)
              AND ($2::text IS NULL OR class_code = $2)
            ORDER BY grade ASC, class_code ASC
            "#,
        )
        .bind(grade)
        .bind(class_code)
        .fetch_all(&self.pool)
        .await?;

        Ok(classes)
    }
}

#[async_trait]
impl ClassRepositoryTrait for ClassRepository {
    async fn find(&self, grade: Option<i32>, class_code: Option<String>) -> Result<Vec<Class>> {
        self.find(grade, class_code.as_deref())
            .await
            .inspect_err(|e| error!(?grade, error = %e, "查询班级失败"))
    }
}
