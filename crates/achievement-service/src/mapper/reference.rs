//! 学生、活动、班级的摘要 DTO

use super::localized_name::from_columns;
use crate::models::{Activity, Class, Student};
use crate::service::dto::{ActivitySummaryDto, ClassDto, StudentSummaryDto};

pub fn student_to_dto(student: &Student) -> StudentSummaryDto {
    StudentSummaryDto {
        id: student.id.clone(),
        name: from_columns(
            student.name_en.as_deref(),
            student.name_zh_hant.as_deref(),
            student.name_zh_hans.as_deref(),
        ),
        class_number: student.class_number,
        status: student.status,
    }
}

pub fn activity_to_dto(activity: &Activity) -> ActivitySummaryDto {
    ActivitySummaryDto {
        id: activity.oid.to_string(),
        name: from_columns(
            activity.name_en.as_deref(),
            activity.name_zh_hant.as_deref(),
            activity.name_zh_hans.as_deref(),
        ),
        start_date: activity.start_date,
        end_date: activity.end_date,
        status: activity.status,
    }
}

pub fn class_to_dto(class: &Class) -> ClassDto {
    ClassDto {
        id: class.oid.to_string(),
        grade: class.grade,
        class_code: class.class_code.clone(),
    }
}
