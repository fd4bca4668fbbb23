//! 班级查询服务

use std::sync::Arc;

use tracing::instrument;

use super::dto::{ClassDto, ClassQuery};
use crate::error::Result;
use crate::mapper::reference::class_to_dto;
use crate::repository::ClassRepositoryTrait;

pub struct ClassService {
    class_repo: Arc<dyn ClassRepositoryTrait>,
}

impl ClassService {
    pub fn new(class_repo: Arc<dyn ClassRepositoryTrait>) -> Self {
        Self { class_repo }
    }

    /// 按年级、班别查询，条件均可省略
    #[instrument(skip(self))]
    pub async fn find_classes(&self, query: ClassQuery) -> Result<Vec<ClassDto>> {
        let classes = self.class_repo.find(query.grade, query.class_code).await?;
        Ok(classes.iter().map(class_to_dto).collect())
    }
}
