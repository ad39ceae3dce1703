//! 路线规划数据模型

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use wastelink_shared::domain::{CollectionStatus, WasteType};

use crate::geo::Coordinate;

/// 待规划的收集点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePoint {
    pub collection_id: i64,
    pub waste_type: WasteType,
    pub status: CollectionStatus,
    /// 住户未提供坐标时为空，规划时使用仓库附近的占位坐标
    pub location: Option<Coordinate>,
}

/// 垃圾类型过滤
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WasteTypeFilter {
    #[default]
    All,
    Only(WasteType),
}

impl WasteTypeFilter {
    pub fn matches(&self, waste_type: WasteType) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => *expected == waste_type,
        }
    }
}

/// 规划模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RouteMode {
    /// 最近邻贪心排序
    #[default]
    Optimal,
    /// 按垃圾类型过滤，保持原有顺序
    GroupByType(WasteTypeFilter),
}

impl RouteMode {
    /// 指标与日志使用的模式标签
    pub fn label(&self) -> &'static str {
        match self {
            Self::Optimal => "optimal",
            Self::GroupByType(_) => "by_type",
        }
    }
}

/// 路线中的一个停靠点
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    /// None 表示仓库（起点 / 终点）
    pub collection_id: Option<i64>,
    pub location: Coordinate,
    /// 坐标是否为占位值
    pub placeholder: bool,
}

impl Stop {
    pub fn depot(location: Coordinate) -> Self {
        Self {
            collection_id: None,
            location,
            placeholder: false,
        }
    }

    pub fn is_depot(&self) -> bool {
        self.collection_id.is_none()
    }
}

/// 规划结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedRoute {
    /// 仓库, p1..pn, 仓库
    pub stops: Vec<Stop>,
    pub total_distance_km: f64,
    pub total_duration_minutes: f64,
    pub eta: DateTime<Utc>,
    pub fuel_liters: f64,
}

impl PlannedRoute {
    pub fn total_duration(&self) -> TimeDelta {
        TimeDelta::milliseconds((self.total_duration_minutes * 60_000.0).round() as i64)
    }

    /// 不含仓库的收集点数量
    pub fn collection_count(&self) -> usize {
        self.stops.iter().filter(|s| !s.is_depot()).count()
    }
}

/// 规划参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// 平均车速（km/h）
    pub average_speed_kmh: f64,
    /// 百公里油耗（升）
    pub fuel_liters_per_100km: f64,
    /// 占位坐标在仓库周围的抖动范围（度）
    pub placeholder_jitter_deg: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            average_speed_kmh: 30.0,
            fuel_liters_per_100km: 10.0,
            placeholder_jitter_deg: 0.05,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches() {
        assert!(WasteTypeFilter::All.matches(WasteType::Glass));
        assert!(WasteTypeFilter::Only(WasteType::Glass).matches(WasteType::Glass));
        assert!(!WasteTypeFilter::Only(WasteType::Glass).matches(WasteType::Paper));
    }

    #[test]
    fn test_mode_label() {
        assert_eq!(RouteMode::Optimal.label(), "optimal");
        assert_eq!(RouteMode::GroupByType(WasteTypeFilter::All).label(), "by_type");
    }

    #[test]
    fn test_route_serializes_camel_case() {
        let depot = Coordinate { lat: -1.0, lng: 36.0 };
        let route = PlannedRoute {
            stops: vec![Stop::depot(depot), Stop::depot(depot)],
            total_distance_km: 0.0,
            total_duration_minutes: 0.0,
            eta: Utc::now(),
            fuel_liters: 0.0,
        };

        let json = serde_json::to_value(&route).unwrap();
        assert!(json.get("totalDistanceKm").is_some());
        assert!(json.get("fuelLiters").is_some());
        assert!(json["stops"][0]["collectionId"].is_null());
    }

    #[test]
    fn test_total_duration_conversion() {
        let route = PlannedRoute {
            stops: vec![],
            total_distance_km: 15.0,
            total_duration_minutes: 30.0,
            eta: Utc::now(),
            fuel_liters: 1.5,
        };
        assert_eq!(route.total_duration(), TimeDelta::minutes(30));
    }
}
