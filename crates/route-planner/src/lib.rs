//! 收集路线规划
//!
//! 为收集员生成上门顺序及路线统计：
//! - 球面距离（haversine）计算
//! - 活跃收集点筛选与缺失坐标的占位定位
//! - 最近邻贪心排序 / 按垃圾类型分组
//! - 距离、耗时、预计到达时间与油耗估算

pub mod error;
pub mod geo;
pub mod models;
pub mod planner;

pub use error::{PlannerError, Result};
pub use geo::{Coordinate, EARTH_RADIUS_KM, haversine_km};
pub use models::{PlannedRoute, PlannerConfig, RouteMode, RoutePoint, Stop, WasteTypeFilter};
pub use planner::{
    RoutePlanner, active_points, nearest_neighbor_order, plan_route, tour_distance_km,
};

pub use wastelink_shared::domain::{CollectionStatus, WasteType};
