//! 仓储 Trait 定义

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Badge, Collection, CollectionStatus, NewCollection, NewPayment, NewRating, NewUser, Payment,
    PaymentOutcome, Rating, User, UserBadge, UserUpdate,
};

/// 用户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<User>>;
    async fn upsert(&self, user: &NewUser) -> Result<User>;
    async fn update(&self, id: &str, changes: &UserUpdate) -> Result<Option<User>>;
    async fn list_collectors(&self) -> Result<Vec<User>>;
    async fn mark_phone_verified(&self, id: &str, phone: &str) -> Result<bool>;
}

/// 收集任务仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollectionRepositoryTrait: Send + Sync {
    async fn create(&self, collection: &NewCollection) -> Result<Collection>;
    async fn get(&self, id: i64) -> Result<Option<Collection>>;
    async fn list_for_household(
        &self,
        household_id: &str,
        status: Option<CollectionStatus>,
    ) -> Result<Vec<Collection>>;
    /// 已分配给该收集员的任务，以及尚未被接单的预约
    async fn list_for_collector(
        &self,
        collector_id: &str,
        status: Option<CollectionStatus>,
    ) -> Result<Vec<Collection>>;
    /// 已分配给该收集员且仍需上门的任务
    async fn list_active_assigned(&self, collector_id: &str) -> Result<Vec<Collection>>;
    /// 仅当任务仍为 scheduled 且未分配时接单成功
    async fn assign_collector(&self, id: i64, collector_id: &str) -> Result<Option<Collection>>;
    /// 仅当当前状态等于 `from` 时更新
    async fn update_status(
        &self,
        id: i64,
        from: CollectionStatus,
        to: CollectionStatus,
    ) -> Result<Option<Collection>>;
    async fn count_completed_for_household(&self, household_id: &str) -> Result<i64>;
}

/// 支付仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentRepositoryTrait: Send + Sync {
    async fn create(&self, payment: &NewPayment) -> Result<Payment>;
    async fn get(&self, id: i64) -> Result<Option<Payment>>;
    async fn get_by_checkout_request(&self, checkout_request_id: &str) -> Result<Option<Payment>>;
    async fn set_checkout_request(&self, id: i64, checkout_request_id: &str) -> Result<Payment>;
    /// 仅当仍为 pending 时写入终态
    async fn finalize(&self, id: i64, outcome: &PaymentOutcome) -> Result<Option<Payment>>;
}

/// 评价仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatingRepositoryTrait: Send + Sync {
    /// 同一收集任务已有评价时返回 None
    async fn create(&self, rating: &NewRating) -> Result<Option<Rating>>;
    async fn list_for_user(&self, ratee_id: &str) -> Result<Vec<Rating>>;
}

/// 徽章仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BadgeRepositoryTrait: Send + Sync {
    async fn list_badges(&self) -> Result<Vec<Badge>>;
    async fn list_user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>>;
    /// 已拥有时返回 false
    async fn award(&self, user_id: &str, badge_id: i64) -> Result<bool>;
}
