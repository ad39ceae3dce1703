//! 收集任务服务
//!
//! 负责预约、接单、状态流转和路线规划，并在状态变化时通过推送中继通知相关用户。
//!
//! ## 状态流转
//!
//! - 开始 / 完成：仅已接单的收集员
//! - 取消：住户或已接单的收集员
//! - 完成后为住户评估徽章（失败不影响主流程）

use std::sync::Arc;

use chrono::Utc;
use notification_relay::{Hub, RelayEvent};
use route_planner::{Coordinate, PlannedRoute, RouteMode, RoutePlanner, RoutePoint};
use tracing::{info, instrument, warn};
use wastelink_shared::observability::metrics;

use super::badge_service::BadgeService;
use crate::error::{ApiError, Result};
use crate::models::{Collection, CollectionStatus, NewCollection, User, UserRole};
use crate::repository::{BadgeRepositoryTrait, CollectionRepositoryTrait, UserRepositoryTrait};

/// 路线规划参数
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RouteQuery {
    pub mode: RouteMode,
    /// 两者同时提供时覆盖默认车场
    pub depot_lat: Option<f64>,
    pub depot_lng: Option<f64>,
}

impl RouteQuery {
    fn depot(&self, default: Coordinate) -> Result<Coordinate> {
        match (self.depot_lat, self.depot_lng) {
            (None, None) => Ok(default),
            (Some(lat), Some(lng)) => {
                Coordinate::new(lat, lng).map_err(|e| ApiError::Validation(e.to_string()))
            }
            _ => Err(ApiError::Validation(
                "depotLat 与 depotLng 必须同时提供".to_string(),
            )),
        }
    }
}

pub struct CollectionService<CR, UR, BR>
where
    CR: CollectionRepositoryTrait,
    UR: UserRepositoryTrait,
    BR: BadgeRepositoryTrait,
{
    collection_repo: Arc<CR>,
    user_repo: Arc<UR>,
    badges: Arc<BadgeService<BR>>,
    hub: Arc<Hub>,
    planner: RoutePlanner,
    depot: Coordinate,
}

impl<CR, UR, BR> CollectionService<CR, UR, BR>
where
    CR: CollectionRepositoryTrait,
    UR: UserRepositoryTrait,
    BR: BadgeRepositoryTrait,
{
    pub fn new(
        collection_repo: Arc<CR>,
        user_repo: Arc<UR>,
        badges: Arc<BadgeService<BR>>,
        hub: Arc<Hub>,
        planner: RoutePlanner,
        depot: Coordinate,
    ) -> Self {
        Self {
            collection_repo,
            user_repo,
            badges,
            hub,
            planner,
            depot,
        }
    }

    async fn load_user(&self, user_id: &str) -> Result<User> {
        self.user_repo
            .get(user_id)
            .await?
            .ok_or_else(|| ApiError::UserNotFound(user_id.to_string()))
    }

    async fn load_collection(&self, id: i64) -> Result<Collection> {
        self.collection_repo
            .get(id)
            .await?
            .ok_or(ApiError::CollectionNotFound(id))
    }

    /// 住户预约收集，并通知所有收集员
    #[instrument(skip(self, new), fields(household_id = %new.household_id))]
    pub async fn create(&self, new: NewCollection) -> Result<Collection> {
        let user = self.load_user(&new.household_id).await?;
        if !user.is(UserRole::Household) {
            return Err(ApiError::Forbidden("只有住户可以预约收集".to_string()));
        }

        let collection = self.collection_repo.create(&new).await?;
        info!(collection_id = collection.id, "Collection scheduled");

        let collectors = self.user_repo.list_collectors().await?;
        let event = RelayEvent::new_collection(
            collection.id,
            format!(
                "New {} pickup ({} kg) at {}",
                collection.waste_type, collection.quantity_kg, collection.address
            ),
        );
        let delivered = self
            .hub
            .publish_many(collectors.iter().map(|c| c.id.as_str()), &event);
        info!(
            collection_id = collection.id,
            collectors = collectors.len(),
            delivered,
            "New collection broadcast"
        );

        Ok(collection)
    }

    /// 按角色列出与当前用户相关的任务
    pub async fn list(
        &self,
        user_id: &str,
        status: Option<CollectionStatus>,
    ) -> Result<Vec<Collection>> {
        let user = self.load_user(user_id).await?;
        match user.role {
            UserRole::Household => self.collection_repo.list_for_household(user_id, status).await,
            UserRole::Collector => self.collection_repo.list_for_collector(user_id, status).await,
            _ => Err(ApiError::Forbidden(
                "只有住户和收集员可以查看收集任务".to_string(),
            )),
        }
    }

    /// 参与方可见；收集员还可以查看尚未被接单的预约
    pub async fn get(&self, user_id: &str, id: i64) -> Result<Collection> {
        let collection = self.load_collection(id).await?;
        if collection.involves(user_id) {
            return Ok(collection);
        }

        let open = collection.collector_id.is_none() && collection.status == CollectionStatus::Scheduled;
        if open && self.load_user(user_id).await?.is(UserRole::Collector) {
            return Ok(collection);
        }

        Err(ApiError::Forbidden("无权查看该收集任务".to_string()))
    }

    /// 收集员接单
    #[instrument(skip(self))]
    pub async fn accept(&self, collector_id: &str, id: i64) -> Result<Collection> {
        let user = self.load_user(collector_id).await?;
        if !user.is(UserRole::Collector) {
            return Err(ApiError::Forbidden("只有收集员可以接单".to_string()));
        }

        let collection = self.load_collection(id).await?;
        if collection.collector_id.is_some() {
            return Err(ApiError::CollectionAlreadyAssigned(id));
        }
        if collection.status != CollectionStatus::Scheduled {
            return Err(ApiError::InvalidStatusTransition {
                from: collection.status.to_string(),
                to: "assigned".to_string(),
            });
        }

        // 并发接单时只有一个请求能更新成功
        let assigned = self
            .collection_repo
            .assign_collector(id, collector_id)
            .await?
            .ok_or(ApiError::CollectionAlreadyAssigned(id))?;

        info!(collection_id = id, "Collection accepted");

        self.hub.publish(
            &assigned.household_id,
            RelayEvent::collection_update(
                id,
                assigned.status.as_str(),
                format!("{} accepted your pickup", user.display_name),
            ),
        );

        Ok(assigned)
    }

    /// 状态流转
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        user_id: &str,
        id: i64,
        next: CollectionStatus,
    ) -> Result<Collection> {
        let collection = self.load_collection(id).await?;
        if !collection.involves(user_id) {
            return Err(ApiError::Forbidden("无权修改该收集任务".to_string()));
        }

        let is_collector = collection.collector_id.as_deref() == Some(user_id);
        match next {
            CollectionStatus::InProgress | CollectionStatus::Completed if !is_collector => {
                return Err(ApiError::Forbidden(
                    "只有已接单的收集员可以开始或完成任务".to_string(),
                ));
            }
            _ => {}
        }

        let current = collection.status;
        if !current.can_transition_to(next) {
            return Err(ApiError::InvalidStatusTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        let updated = match self.collection_repo.update_status(id, current, next).await? {
            Some(updated) => updated,
            None => {
                // 读取后状态已被其他请求修改
                let latest = self.load_collection(id).await?;
                return Err(ApiError::InvalidStatusTransition {
                    from: latest.status.to_string(),
                    to: next.to_string(),
                });
            }
        };

        info!(collection_id = id, from = %current, to = %next, "Collection status changed");

        let event = RelayEvent::collection_update(id, next.as_str(), status_message(id, next));
        self.hub.publish_many(updated.participants(), &event);

        if next == CollectionStatus::Completed {
            self.award_badges(&updated.household_id).await;
        }

        Ok(updated)
    }

    async fn award_badges(&self, household_id: &str) {
        let result = async {
            let completed = self
                .collection_repo
                .count_completed_for_household(household_id)
                .await?;
            self.badges.evaluate(household_id, completed).await
        }
        .await;

        match result {
            Ok(awarded) if !awarded.is_empty() => {
                let names: Vec<&str> = awarded.iter().map(|b| b.name.as_str()).collect();
                self.hub.publish(household_id, RelayEvent::badge_awarded(&names));
            }
            Ok(_) => {}
            Err(e) => warn!(household_id, error = %e, "Badge evaluation failed"),
        }
    }

    /// 为收集员规划当天路线，没有待上门任务时返回 None
    #[instrument(skip(self))]
    pub async fn plan_route(
        &self,
        collector_id: &str,
        query: RouteQuery,
    ) -> Result<Option<PlannedRoute>> {
        let user = self.load_user(collector_id).await?;
        if !user.is(UserRole::Collector) {
            return Err(ApiError::Forbidden("只有收集员可以规划路线".to_string()));
        }

        let depot = query.depot(self.depot)?;
        let points: Vec<RoutePoint> = self
            .collection_repo
            .list_active_assigned(collector_id)
            .await?
            .iter()
            .map(Collection::to_route_point)
            .collect();

        let route = {
            let mut rng = rand::rng();
            self.planner
                .plan(depot, &points, query.mode, Utc::now(), &mut rng)
        };

        if let Some(route) = &route {
            metrics::record_route_planned(
                query.mode.label(),
                route.collection_count(),
                route.total_distance_km,
            );
        }

        Ok(route)
    }
}

fn status_message(id: i64, status: CollectionStatus) -> String {
    match status {
        CollectionStatus::Scheduled => format!("Pickup #{id} is scheduled"),
        CollectionStatus::InProgress => format!("Pickup #{id} is on the way"),
        CollectionStatus::Completed => format!("Pickup #{id} has been completed"),
        CollectionStatus::Cancelled => format!("Pickup #{id} was cancelled"),
    }
}
