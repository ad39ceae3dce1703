//! 应用状态定义
//!
//! 仓储与服务在启动时组装一次，通过 Arc 在 handler 间共享

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use notification_relay::{Hub, RelayState};
use route_planner::{Coordinate, PlannerConfig, RoutePlanner};
use sqlx::PgPool;
use wastelink_shared::cache::Cache;
use wastelink_shared::config::AppConfig;

use crate::auth::JwtVerifier;
use crate::error::{ApiError, Result};
use crate::repository::{
    BadgeRepository, CollectionRepository, PaymentRepository, RatingRepository, UserRepository,
};
use crate::service::{
    BadgeService, CollectionService, LogEmailSender, LogOtpSender, MemoryOtpStore, OtpService,
    OtpStore, PaymentGateway, PaymentService, RatingService, RedisOtpStore, SimulatedMpesaGateway,
};

pub type AppCollectionService = CollectionService<CollectionRepository, UserRepository, BadgeRepository>;
pub type AppPaymentService = PaymentService<PaymentRepository, CollectionRepository>;
pub type AppRatingService = RatingService<RatingRepository, CollectionRepository>;
pub type AppBadgeService = BadgeService<BadgeRepository>;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL 连接池
    pub pool: PgPool,
    /// Redis 缓存客户端
    pub cache: Arc<Cache>,
    pub jwt: Arc<JwtVerifier>,
    pub hub: Arc<Hub>,
    pub relay: RelayState,
    pub users: Arc<UserRepository>,
    pub collections: Arc<AppCollectionService>,
    pub payments: Arc<AppPaymentService>,
    pub ratings: Arc<AppRatingService>,
    pub badges: Arc<AppBadgeService>,
    pub otp: Arc<OtpService>,
    /// 内存验证码存储，`otp.backend = "redis"` 时为 None
    pub memory_otp_store: Option<Arc<MemoryOtpStore>>,
}

impl AppState {
    /// 按配置组装全部依赖
    pub fn new(pool: PgPool, cache: Arc<Cache>, config: &AppConfig) -> Result<Self> {
        Self::with_gateway(pool, cache, config, Arc::new(SimulatedMpesaGateway::new()))
    }

    pub fn with_gateway(
        pool: PgPool,
        cache: Arc<Cache>,
        config: &AppConfig,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<Self> {
        let jwt = Arc::new(JwtVerifier::from_config(&config.auth)?);
        let hub = Hub::new(config.relay.queue_capacity);
        let relay = RelayState::new(hub.clone(), jwt.clone())
            .with_auth_timeout(Duration::from_secs(config.relay.auth_timeout_seconds));

        let users = Arc::new(UserRepository::new(pool.clone()));
        let collection_repo = Arc::new(CollectionRepository::new(pool.clone()));

        let badges = Arc::new(BadgeService::new(Arc::new(BadgeRepository::new(pool.clone()))));

        let depot = Coordinate::new(config.route.depot_lat, config.route.depot_lng)
            .map_err(|e| ApiError::Internal(format!("默认车场坐标无效: {e}")))?;
        let planner = RoutePlanner::new(PlannerConfig {
            average_speed_kmh: config.route.average_speed_kmh,
            fuel_liters_per_100km: config.route.fuel_liters_per_100km,
            placeholder_jitter_deg: config.route.placeholder_jitter_deg,
        });

        let collections = Arc::new(CollectionService::new(
            collection_repo.clone(),
            users.clone(),
            badges.clone(),
            hub.clone(),
            planner,
            depot,
        ));

        let payments = Arc::new(PaymentService::new(
            Arc::new(PaymentRepository::new(pool.clone())),
            collection_repo.clone(),
            gateway,
            config.payments.clone(),
        ));

        let ratings = Arc::new(RatingService::new(
            Arc::new(RatingRepository::new(pool.clone())),
            collection_repo,
        ));

        let memory_otp_store =
            (config.otp.backend != "redis").then(|| Arc::new(MemoryOtpStore::new()));
        let otp_store: Arc<dyn OtpStore> = match &memory_otp_store {
            Some(store) => store.clone(),
            None => Arc::new(RedisOtpStore::new(cache.clone())),
        };
        let otp = Arc::new(OtpService::new(
            otp_store,
            Arc::new(LogOtpSender),
            Arc::new(LogEmailSender),
            &config.otp,
        ));

        Ok(Self {
            pool,
            cache,
            jwt,
            hub,
            relay,
            users,
            collections,
            payments,
            ratings,
            badges,
            otp,
            memory_otp_store,
        })
    }
}

impl FromRef<AppState> for RelayState {
    fn from_ref(state: &AppState) -> Self {
        state.relay.clone()
    }
}
