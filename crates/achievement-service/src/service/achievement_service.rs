//! 成就查询服务
//!
//! 只读操作：成就详情与列表

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::instrument;

use super::dto::{AchievementDetailDto, AchievementDto, AchievementQuery};
use super::requested_ordering;
use crate::error::{AchievementError, Result};
use crate::mapper::achievement as achievement_mapper;
use crate::models::{AchievementFilter, PageRequest, PaginatedResult};
use crate::repository::{AchievementRepositoryTrait, parse_oid};
use crate::storage::AttachmentUrlResolver;

pub struct AchievementQueryService {
    achievement_repo: Arc<dyn AchievementRepositoryTrait>,
    url_resolver: AttachmentUrlResolver,
}

impl AchievementQueryService {
    pub fn new(
        achievement_repo: Arc<dyn AchievementRepositoryTrait>,
        url_resolver: AttachmentUrlResolver,
    ) -> Self {
        Self {
            achievement_repo,
            url_resolver,
        }
    }

    /// 获取成就详情，附件地址并发解析
    #[instrument(skip(self))]
    pub async fn get_achievement(&self, id: &str) -> Result<AchievementDetailDto> {
        let not_found = || AchievementError::not_found("Achievement", "id", id);

        let oid = parse_oid(id).ok_or_else(not_found)?;
        let detail = self
            .achievement_repo
            .get_by_oid(oid)
            .await?
            .ok_or_else(not_found)?;

        let urls = try_join_all(
            detail
                .attachments
                .iter()
                .map(|a| self.url_resolver.resolve(&a.bucket_name, &a.object_key)),
        )
        .await?;

        Ok(achievement_mapper::detail_to_dto(
            &detail.achievement,
            &detail.student,
            &detail.activity,
            &detail.attachments,
            urls,
        ))
    }

    #[instrument(skip(self))]
    pub async fn find_achievements(
        &self,
        query: AchievementQuery,
    ) -> Result<PaginatedResult<AchievementDto>> {
        let page = PageRequest::new(query.offset.unwrap_or(0), query.limit).with_ordering(
            requested_ordering(query.order_by_field, query.order_by_direction),
        );

        let activity_oid = match query.activity_id.as_deref() {
            Some(id) => match parse_oid(id) {
                Some(oid) => Some(oid),
                None => return Ok(PaginatedResult::new(Vec::new(), 0, &page)),
            },
            None => None,
        };

        let filter = AchievementFilter {
            student_id: query.student_id,
            student_oid: None,
            activity_oid,
            role: query.role,
        };

        let result = self.achievement_repo.find(&filter, &page).await?;
        Ok(result.map(|summary| achievement_mapper::summary_to_dto(&summary)))
    }
}
