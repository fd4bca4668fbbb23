//! 参考实体：学生、活动、用户、班级
//!
//! 学生、活动、班级只读；用户仅由用户维护服务与登录流程修改

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{ActivityStatus, StudentStatus, SubmissionRole, UserRole, UserStatus};

/// 学生
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub oid: i64,
    /// 学号
    pub id: String,
    pub name_en: Option<String>,
    pub name_zh_hant: Option<String>,
    pub name_zh_hans: Option<String>,
    pub class_oid: Option<i64>,
    pub class_number: Option<i32>,
    pub status: StudentStatus,
}

impl Student {
    pub fn is_active(&self) -> bool {
        self.status == StudentStatus::Active
    }
}

/// 活动
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub oid: i64,
    pub name_en: Option<String>,
    pub name_zh_hant: Option<String>,
    pub name_zh_hans: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub student_submission_allowed: bool,
    pub teacher_submission_allowed: bool,
    pub status: ActivityStatus,
}

impl Activity {
    /// 活动是否允许该角色提交
    pub fn accepts(&self, role: SubmissionRole) -> bool {
        match role {
            SubmissionRole::Student => self.student_submission_allowed,
            SubmissionRole::Teacher => self.teacher_submission_allowed,
        }
    }

    /// 活动在指定日期是否开放（首尾两天均包含）
    pub fn is_open_on(&self, date: NaiveDate) -> bool {
        self.status == ActivityStatus::Open && self.start_date <= date && date <= self.end_date
    }
}

/// 系统用户
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub oid: i64,
    pub email: String,
    /// 密码哈希，不参与序列化
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub name_en: Option<String>,
    pub name_zh_hant: Option<String>,
    pub name_zh_hans: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub last_login_datetime: Option<DateTime<Utc>>,
    pub password_expiry_datetime: Option<DateTime<Utc>>,
    pub with_approval_right: bool,
    pub created_by_user_oid: i64,
    pub created_at: DateTime<Utc>,
    pub updated_by_user_oid: i64,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// 待创建的用户
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub name_en: Option<String>,
    pub name_zh_hant: Option<String>,
    pub name_zh_hans: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub last_login_datetime: Option<DateTime<Utc>>,
    pub with_approval_right: bool,
    pub created_by_user_oid: i64,
    pub created_at: DateTime<Utc>,
}

/// 用户及其可代为提交的学生
#[derive(Debug, Clone)]
pub struct UserWithStudents {
    pub user: User,
    pub entitled_students: Vec<Student>,
}

/// 班级
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub oid: i64,
    pub grade: i32,
    pub class_code: String,
    pub created_by_user_oid: i64,
    pub created_at: DateTime<Utc>,
    pub updated_by_user_oid: i64,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(start: &str, end: &str) -> Activity {
        Activity {
            oid: 1,
            name_en: Some("Science Fair".to_string()),
            name_zh_hant: None,
            name_zh_hans: None,
            start_date: start.parse().unwrap(),
            end_date: end.parse().unwrap(),
            student_submission_allowed: false,
            teacher_submission_allowed: true,
            status: ActivityStatus::Open,
        }
    }

    #[test]
    fn test_activity_open_window_is_inclusive() {
        let a = activity("2025-03-01", "2025-03-31");
        assert!(a.is_open_on("2025-03-01".parse().unwrap()));
        assert!(a.is_open_on("2025-03-31".parse().unwrap()));
        assert!(!a.is_open_on("2025-04-01".parse().unwrap()));
        assert!(!a.is_open_on("2025-02-28".parse().unwrap()));
    }

    #[test]
    fn test_closed_activity_is_never_open() {
        let mut a = activity("2025-03-01", "2025-03-31");
        a.status = ActivityStatus::Closed;
        assert!(!a.is_open_on("2025-03-15".parse().unwrap()));
    }

    #[test]
    fn test_activity_accepts_role() {
        let a = activity("2025-03-01", "2025-03-31");
        assert!(a.accepts(SubmissionRole::Teacher));
        assert!(!a.accepts(SubmissionRole::Student));
    }
}
