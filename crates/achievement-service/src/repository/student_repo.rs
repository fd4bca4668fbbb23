//! 学生仓储

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::error;

use super::traits::StudentRepositoryTrait;
use crate::error::Result;
use crate::models::Student;

/// 学生仓储（只读）
pub struct StudentRepository {
    pool: PgPool,
}

impl StudentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按学号查询
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(
            r#"
            SELECT oid, id, name_en, name_zh_hant, name_zh_hans, class_oid, class_number, status
            FROM student
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(student)
    }

    pub async fn get_by_oid(&self, oid: i64) -> Result<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(
            r#"
            SELECT oid, id, name_en, name_zh_hant, name_zh_hans, class_oid, class_number, status
            FROM student
            WHERE oid = $1
            "#,
        )
        .bind(oid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(student)
    }

    pub async fn is_entitled(&self, user_oid: i64, student_oid: i64) -> Result<bool> {
        let entitled = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_student WHERE user_oid = $1 AND student_oid = $2
            )
            "#,
        )
        .bind(user_oid)
        .bind(student_oid)
        .fetch_one(&self.pool)
        .await?;

        Ok(entitled)
    }

    // ==================== 事务内批量加载 ====================

    /// 在给定连接上批量加载学生，返回 oid -> 学生
    pub async fn load_by_oids(
        conn: &mut PgConnection,
        oids: &[i64],
    ) -> Result<HashMap<i64, Student>> {
        if oids.is_empty() {
            return Ok(HashMap::new());
        }

        let students = sqlx::query_as::<_, Student>(
            r#"
            SELECT oid, id, name_en, name_zh_hant, name_zh_hans, class_oid, class_number, status
            FROM student
            WHERE oid = ANY($1)
            "#,
        )
        .bind(oids)
        .fetch_all(conn)
        .await?;

        Ok(students.into_iter().map(|s| (s.oid, s)).collect())
    }

    /// 加载某用户可代为提交的学生
    pub async fn load_entitled(conn: &mut PgConnection, user_oid: i64) -> Result<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(
            r#"
            SELECT s.oid, s.id, s.name_en, s.name_zh_hant, s.name_zh_hans,
                   s.class_oid, s.class_number, s.status
            FROM user_student us
            JOIN student s ON s.oid = us.student_oid
            WHERE us.user_oid = $1
            ORDER BY s.id ASC
            "#,
        )
        .bind(user_oid)
        .fetch_all(conn)
        .await?;

        Ok(students)
    }
}

#[async_trait]
impl StudentRepositoryTrait for StudentRepository {
    async fn get_by_id(&self, id: &str) -> Result<Option<Student>> {
        self.get_by_id(id)
            .await
            .inspect_err(|e| error!(student_id = %id, error = %e, "查询学生失败"))
    }

    async fn get_by_oid(&self, oid: i64) -> Result<Option<Student>> {
        self.get_by_oid(oid)
            .await
            .inspect_err(|e| error!(student_oid = oid, error = %e, "查询学生失败"))
    }

    async fn is_entitled(&self, user_oid: i64, student_oid: i64) -> Result<bool> {
        self.is_entitled(user_oid, student_oid)
            .await
            .inspect_err(|e| error!(user_oid, student_oid, error = %e, "查询学生授权失败"))
    }
}
