//! 环保徽章服务
//!
//! 住户累计完成收集次数达到徽章门槛即自动授予，同一徽章只授予一次。

use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::Result;
use crate::models::{Badge, UserBadge};
use crate::repository::BadgeRepositoryTrait;

pub struct BadgeService<BR>
where
    BR: BadgeRepositoryTrait,
{
    badge_repo: Arc<BR>,
}

impl<BR> BadgeService<BR>
where
    BR: BadgeRepositoryTrait,
{
    pub fn new(badge_repo: Arc<BR>) -> Self {
        Self { badge_repo }
    }

    /// 全部徽章定义，按门槛升序
    pub async fn list(&self) -> Result<Vec<Badge>> {
        let mut badges = self.badge_repo.list_badges().await?;
        badges.sort_by_key(|b| (b.threshold, b.id));
        Ok(badges)
    }

    pub async fn mine(&self, user_id: &str) -> Result<Vec<UserBadge>> {
        self.badge_repo.list_user_badges(user_id).await
    }

    /// 根据完成次数补发缺少的徽章，返回本次新授予的徽章
    #[instrument(skip(self))]
    pub async fn evaluate(&self, user_id: &str, completed: i64) -> Result<Vec<Badge>> {
        let owned: Vec<i64> = self
            .badge_repo
            .list_user_badges(user_id)
            .await?
            .into_iter()
            .map(|b| b.badge_id)
            .collect();

        let mut awarded = Vec::new();
        for badge in self.list().await? {
            if i64::from(badge.threshold) > completed || owned.contains(&badge.id) {
                continue;
            }
            // 并发完成时另一请求可能已授予
            if self.badge_repo.award(user_id, badge.id).await? {
                info!(user_id, badge = %badge.code, completed, "Badge awarded");
                awarded.push(badge);
            }
        }

        Ok(awarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockBadgeRepositoryTrait;
    use chrono::Utc;

    fn badge(id: i64, code: &str, threshold: i32) -> Badge {
        Badge {
            id,
            code: code.to_string(),
            name: code.to_string(),
            description: None,
            threshold,
        }
    }

    fn owned(badge: &Badge) -> UserBadge {
        UserBadge {
            badge_id: badge.id,
            code: badge.code.clone(),
            name: badge.name.clone(),
            description: None,
            awarded_at: Utc::now(),
        }
    }

    fn catalogue() -> Vec<Badge> {
        vec![
            badge(3, "eco_champion", 25),
            badge(1, "first_pickup", 1),
            badge(2, "eco_starter", 5),
        ]
    }

    #[tokio::test]
    async fn test_list_sorted_by_threshold() {
        let mut repo = MockBadgeRepositoryTrait::new();
        repo.expect_list_badges().returning(|| Ok(catalogue()));

        let svc = BadgeService::new(Arc::new(repo));
        let codes: Vec<String> = svc.list().await.unwrap().into_iter().map(|b| b.code).collect();
        assert_eq!(codes, vec!["first_pickup", "eco_starter", "eco_champion"]);
    }

    #[tokio::test]
    async fn test_evaluate_awards_reached_thresholds_only() {
        let mut repo = MockBadgeRepositoryTrait::new();
        repo.expect_list_badges().returning(|| Ok(catalogue()));
        repo.expect_list_user_badges()
            .returning(|_| Ok(vec![owned(&badge(1, "first_pickup", 1))]));
        repo.expect_award()
            .withf(|user, badge_id| user == "household-1" && *badge_id == 2)
            .times(1)
            .returning(|_, _| Ok(true));

        let svc = BadgeService::new(Arc::new(repo));
        let awarded = svc.evaluate("household-1", 5).await.unwrap();

        assert_eq!(awarded.len(), 1);
        assert_eq!(awarded[0].code, "eco_starter");
    }

    #[tokio::test]
    async fn test_evaluate_skips_concurrently_awarded() {
        let mut repo = MockBadgeRepositoryTrait::new();
        repo.expect_list_badges().returning(|| Ok(catalogue()));
        repo.expect_list_user_badges().returning(|_| Ok(vec![]));
        repo.expect_award().times(1).returning(|_, _| Ok(false));

        let svc = BadgeService::new(Arc::new(repo));
        assert!(svc.evaluate("household-1", 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_evaluate_nothing_when_below_threshold() {
        let mut repo = MockBadgeRepositoryTrait::new();
        repo.expect_list_badges().returning(|| Ok(catalogue()));
        repo.expect_list_user_badges().returning(|_| Ok(vec![]));
        repo.expect_award().never();

        let svc = BadgeService::new(Arc::new(repo));
        assert!(svc.evaluate("household-1", 0).await.unwrap().is_empty());
    }
}
