//! 提交前校验
//!
//! 任何副作用发生之前完成，失败时直接返回

use chrono::NaiveDate;
use tracing::debug;

use super::AuthenticatedUser;
use crate::error::{AchievementError, Result};
use crate::models::{Activity, Student, SubmissionRole};
use crate::repository::{ActivityRepositoryTrait, StudentRepositoryTrait, parse_oid};

/// 校验学生存在且调用者可为其提交
///
/// 教职员可为任意在读学生提交；学生只能为已授权的学生提交
pub async fn validate_student(
    students: &dyn StudentRepositoryTrait,
    actor: &AuthenticatedUser,
    student_id: &str,
) -> Result<Student> {
    let student = students
        .get_by_id(student_id)
        .await?
        .ok_or_else(|| AchievementError::not_found("Student", "id", student_id))?;

    if !student.is_active() {
        return Err(AchievementError::ValidationFailed(format!(
            "学生 {} 已非在读状态",
            student_id
        )));
    }

    if !actor.role.is_staff() && !students.is_entitled(actor.oid, student.oid).await? {
        debug!(user_oid = actor.oid, student_id, "用户无权代该学生提交");
        return Err(AchievementError::ValidationFailed(format!(
            "无权为学生 {} 提交成就",
            student_id
        )));
    }

    Ok(student)
}

/// 校验活动存在、允许该角色提交且在 `today` 开放
pub async fn validate_activity(
    activities: &dyn ActivityRepositoryTrait,
    activity_id: &str,
    role: SubmissionRole,
    today: NaiveDate,
) -> Result<Activity> {
    let not_found = || AchievementError::not_found("Activity", "id", activity_id);

    let oid = parse_oid(activity_id).ok_or_else(not_found)?;
    let activity = activities.get_by_oid(oid).await?.ok_or_else(not_found)?;

    if !activity.accepts(role) {
        return Err(AchievementError::ValidationFailed(format!(
            "活动 {} 不接受{}提交",
            activity_id,
            role.as_str()
        )));
    }

    if !activity.is_open_on(today) {
        return Err(AchievementError::ValidationFailed(format!(
            "活动 {} 当前未开放",
            activity_id
        )));
    }

    Ok(activity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityStatus, StudentStatus, UserRole};
    use crate::repository::{MockActivityRepositoryTrait, MockStudentRepositoryTrait};

    fn student(status: StudentStatus) -> Student {
        Student {
            oid: 7,
            id: "S001".to_string(),
            name_en: None,
            name_zh_hant: None,
            name_zh_hans: None,
            class_oid: None,
            class_number: None,
            status,
        }
    }

    fn activity(status: ActivityStatus) -> Activity {
        Activity {
            oid: 42,
            name_en: None,
            name_zh_hant: None,
            name_zh_hans: None,
            start_date: "2025-03-01".parse().unwrap(),
            end_date: "2025-03-31".parse().unwrap(),
            student_submission_allowed: true,
            teacher_submission_allowed: false,
            status,
        }
    }

    fn actor(role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser {
            oid: 5,
            role,
            with_approval_right: false,
        }
    }

    #[tokio::test]
    async fn test_unknown_student_is_not_found() {
        let mut repo = MockStudentRepositoryTrait::new();
        repo.expect_get_by_id().returning(|_| Ok(None));

        let err = validate_student(&repo, &actor(UserRole::Teacher), "S404")
            .await
            .unwrap_err();
        assert!(matches!(err, AchievementError::NotFound { entity: "Student", .. }));
    }

    #[tokio::test]
    async fn test_staff_skips_entitlement_check() {
        let mut repo = MockStudentRepositoryTrait::new();
        repo.expect_get_by_id()
            .returning(|_| Ok(Some(student(StudentStatus::Active))));
        repo.expect_is_entitled().never();

        let s = validate_student(&repo, &actor(UserRole::Admin), "S001")
            .await
            .unwrap();
        assert_eq!(s.oid, 7);
    }

    #[tokio::test]
    async fn test_student_must_be_entitled() {
        let mut repo = MockStudentRepositoryTrait::new();
        repo.expect_get_by_id()
            .returning(|_| Ok(Some(student(StudentStatus::Active))));
        repo.expect_is_entitled()
            .withf(|user_oid, student_oid| *user_oid == 5 && *student_oid == 7)
            .returning(|_, _| Ok(false));

        let err = validate_student(&repo, &actor(UserRole::Student), "S001")
            .await
            .unwrap_err();
        assert!(matches!(err, AchievementError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_inactive_student_is_rejected() {
        let mut repo = MockStudentRepositoryTrait::new();
        repo.expect_get_by_id()
            .returning(|_| Ok(Some(student(StudentStatus::Inactive))));

        let err = validate_student(&repo, &actor(UserRole::Teacher), "S001")
            .await
            .unwrap_err();
        assert!(matches!(err, AchievementError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_activity_checks() {
        let mut repo = MockActivityRepositoryTrait::new();
        repo.expect_get_by_oid().returning(|oid| {
            Ok(match oid {
                42 => Some(activity(ActivityStatus::Open)),
                43 => Some(activity(ActivityStatus::Closed)),
                _ => None,
            })
        });
        let today: NaiveDate = "2025-03-15".parse().unwrap();

        let ok = validate_activity(&repo, "42", SubmissionRole::Student, today).await;
        assert_eq!(ok.unwrap().oid, 42);

        let wrong_role = validate_activity(&repo, "42", SubmissionRole::Teacher, today).await;
        assert!(matches!(wrong_role, Err(AchievementError::ValidationFailed(_))));

        let closed = validate_activity(&repo, "43", SubmissionRole::Student, today).await;
        assert!(matches!(closed, Err(AchievementError::ValidationFailed(_))));

        let late = validate_activity(
            &repo,
            "42",
            SubmissionRole::Student,
            "2025-04-01".parse().unwrap(),
        )
        .await;
        assert!(matches!(late, Err(AchievementError::ValidationFailed(_))));

        let missing = validate_activity(&repo, "99", SubmissionRole::Student, today).await;
        assert!(matches!(missing, Err(AchievementError::NotFound { .. })));

        let malformed = validate_activity(&repo, "abc", SubmissionRole::Student, today).await;
        assert!(matches!(malformed, Err(AchievementError::NotFound { .. })));
    }
}
