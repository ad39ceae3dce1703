//! 评价服务
//!
//! 住户对已完成的收集任务给收集员打分，每个任务只能评价一次。

use std::sync::Arc;

use tracing::info;

use crate::error::{ApiError, Result};
use crate::models::{CollectionStatus, NewRating, Rating, RatingSummary};
use crate::repository::{CollectionRepositoryTrait, RatingRepositoryTrait};

pub const MIN_SCORE: i16 = 1;
pub const MAX_SCORE: i16 = 5;

pub struct RatingService<RR, CR>
where
    RR: RatingRepositoryTrait,
    CR: CollectionRepositoryTrait,
{
    rating_repo: Arc<RR>,
    collection_repo: Arc<CR>,
}

impl<RR, CR> RatingService<RR, CR>
where
    RR: RatingRepositoryTrait,
    CR: CollectionRepositoryTrait,
{
    pub fn new(rating_repo: Arc<RR>, collection_repo: Arc<CR>) -> Self {
        Self {
            rating_repo,
            collection_repo,
        }
    }

    pub async fn rate(
        &self,
        rater_id: &str,
        collection_id: i64,
        score: i16,
        comment: Option<String>,
    ) -> Result<Rating> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(ApiError::Validation(format!(
                "评分必须在 {MIN_SCORE} 到 {MAX_SCORE} 之间"
            )));
        }

        let collection = self
            .collection_repo
            .get(collection_id)
            .await?
            .ok_or(ApiError::CollectionNotFound(collection_id))?;

        if collection.household_id != rater_id {
            return Err(ApiError::Forbidden("只有预约住户可以评价".to_string()));
        }
        if collection.status != CollectionStatus::Completed {
            return Err(ApiError::Validation("只能评价已完成的收集任务".to_string()));
        }
        let Some(collector_id) = collection.collector_id else {
            return Err(ApiError::Validation("该收集任务没有收集员".to_string()));
        };

        let rating = self
            .rating_repo
            .create(&NewRating {
                collection_id,
                rater_id: rater_id.to_string(),
                ratee_id: collector_id,
                score,
                comment: comment.filter(|c| !c.trim().is_empty()),
            })
            .await?
            .ok_or(ApiError::AlreadyRated(collection_id))?;

        info!(collection_id, score, "Collection rated");
        Ok(rating)
    }

    pub async fn summary(&self, user_id: &str) -> Result<RatingSummary> {
        let ratings = self.rating_repo.list_for_user(user_id).await?;
        Ok(RatingSummary::from_ratings(user_id, ratings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::collection::fixtures::collection;
    use crate::repository::{MockCollectionRepositoryTrait, MockRatingRepositoryTrait};
    use chrono::Utc;

    fn stored(rating: &NewRating) -> Rating {
        Rating {
            id: 1,
            collection_id: rating.collection_id,
            rater_id: rating.rater_id.clone(),
            ratee_id: rating.ratee_id.clone(),
            score: rating.score,
            comment: rating.comment.clone(),
            created_at: Utc::now(),
        }
    }

    fn collections() -> MockCollectionRepositoryTrait {
        let mut repo = MockCollectionRepositoryTrait::new();
        repo.expect_get().returning(|id| {
            let mut c = match id {
                1 => collection(1, CollectionStatus::Completed),
                2 => collection(2, CollectionStatus::InProgress),
                _ => collection(id, CollectionStatus::Completed),
            };
            if id != 3 {
                c.collector_id = Some("collector-1".to_string());
            }
            Ok(Some(c))
        });
        repo
    }

    #[tokio::test]
    async fn test_rate_completed_collection() {
        let mut ratings = MockRatingRepositoryTrait::new();
        ratings
            .expect_create()
            .withf(|r| r.ratee_id == "collector-1" && r.score == 5 && r.comment.is_none())
            .times(1)
            .returning(|r| Ok(Some(stored(r))));

        let svc = RatingService::new(Arc::new(ratings), Arc::new(collections()));
        let rating = svc
            .rate("household-1", 1, 5, Some("   ".to_string()))
            .await
            .unwrap();
        assert_eq!(rating.ratee_id, "collector-1");
    }

    #[tokio::test]
    async fn test_rate_rejections() {
        let mut ratings = MockRatingRepositoryTrait::new();
        ratings.expect_create().returning(|_| Ok(None));

        let svc = RatingService::new(Arc::new(ratings), Arc::new(collections()));

        assert!(matches!(
            svc.rate("household-1", 1, 6, None).await,
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            svc.rate("household-1", 1, 0, None).await,
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            svc.rate("collector-1", 1, 4, None).await,
            Err(ApiError::Forbidden(_))
        ));
        // 未完成
        assert!(matches!(
            svc.rate("household-1", 2, 4, None).await,
            Err(ApiError::Validation(_))
        ));
        // 没有收集员
        assert!(matches!(
            svc.rate("household-1", 3, 4, None).await,
            Err(ApiError::Validation(_))
        ));
        // 重复评价
        assert!(matches!(
            svc.rate("household-1", 1, 4, None).await,
            Err(ApiError::AlreadyRated(1))
        ));
    }

    #[tokio::test]
    async fn test_summary() {
        let mut ratings = MockRatingRepositoryTrait::new();
        ratings.expect_list_for_user().returning(|user| {
            Ok([4, 5]
                .into_iter()
                .map(|score| {
                    stored(&NewRating {
                        collection_id: 1,
                        rater_id: "household-1".into(),
                        ratee_id: user.to_string(),
                        score,
                        comment: None,
                    })
                })
                .collect())
        });

        let svc = RatingService::new(Arc::new(ratings), Arc::new(MockCollectionRepositoryTrait::new()));
        let summary = svc.summary("collector-1").await.unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.average, Some(4.5));
    }
}
