//! 最近邻路线规划
//!
//! 算法为 O(n²) 的贪心最近邻，不做 2-opt 等改进，对刻意构造的分布可能得到次优路线。
//! 除注入的随机数生成器外不依赖任何外部状态。

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use tracing::debug;

use crate::geo::{Coordinate, haversine_km};
use crate::models::{PlannedRoute, PlannerConfig, RouteMode, RoutePoint, Stop};

/// 筛选仍需上门的收集点（scheduled / in_progress）
pub fn active_points(points: &[RoutePoint]) -> Vec<&RoutePoint> {
    points.iter().filter(|p| p.status.is_active()).collect()
}

/// 贪心最近邻顺序
///
/// 返回 `points` 的下标序列。距离相同时取输入顺序靠前者。
pub fn nearest_neighbor_order(depot: Coordinate, points: &[Coordinate]) -> Vec<usize> {
    let mut visited = vec![false; points.len()];
    let mut order = Vec::with_capacity(points.len());
    let mut current = depot;

    for _ in 0..points.len() {
        let mut best: Option<(usize, f64)> = None;
        for (idx, point) in points.iter().enumerate() {
            if visited[idx] {
                continue;
            }
            let distance = haversine_km(current, *point);
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((idx, distance)),
            }
        }

        // 未访问点一定存在
        if let Some((idx, _)) = best {
            visited[idx] = true;
            order.push(idx);
            current = points[idx];
        }
    }

    order
}

/// 路线规划器
#[derive(Debug, Clone, Default)]
pub struct RoutePlanner {
    config: PlannerConfig,
}

impl RoutePlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// 解析收集点坐标
    ///
    /// 没有坐标的点在仓库周围 ±jitter 度内随机取一个占位坐标，第二个返回值标记是否为占位。
    pub fn resolve_location<R: Rng + ?Sized>(
        &self,
        point: &RoutePoint,
        depot: Coordinate,
        rng: &mut R,
    ) -> (Coordinate, bool) {
        match point.location {
            Some(location) => (location, false),
            None => {
                let jitter = self.config.placeholder_jitter_deg.abs();
                let dlat = rng.random_range(-jitter..=jitter);
                let dlng = rng.random_range(-jitter..=jitter);
                (depot.offset(dlat, dlng), true)
            }
        }
    }

    /// 规划路线
    ///
    /// 状态过滤（以及按类型模式下的类型过滤）后没有收集点时返回 None。
    /// 结果的停靠点为 仓库, p1..pn, 仓库。
    pub fn plan<R: Rng + ?Sized>(
        &self,
        depot: Coordinate,
        points: &[RoutePoint],
        mode: RouteMode,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Option<PlannedRoute> {
        let candidates: Vec<&RoutePoint> = match mode {
            RouteMode::Optimal => active_points(points),
            RouteMode::GroupByType(filter) => active_points(points)
                .into_iter()
                .filter(|p| filter.matches(p.waste_type))
                .collect(),
        };

        if candidates.is_empty() {
            debug!(mode = mode.label(), "No active collections to plan");
            return None;
        }

        let resolved: Vec<(i64, Coordinate, bool)> = candidates
            .iter()
            .map(|p| {
                let (location, placeholder) = self.resolve_location(p, depot, rng);
                (p.collection_id, location, placeholder)
            })
            .collect();

        let order: Vec<usize> = match mode {
            RouteMode::Optimal => {
                let coords: Vec<Coordinate> = resolved.iter().map(|(_, c, _)| *c).collect();
                nearest_neighbor_order(depot, &coords)
            }
            RouteMode::GroupByType(_) => (0..resolved.len()).collect(),
        };

        let mut stops = Vec::with_capacity(order.len() + 2);
        stops.push(Stop::depot(depot));
        stops.extend(order.into_iter().map(|idx| {
            let (collection_id, location, placeholder) = resolved[idx];
            Stop {
                collection_id: Some(collection_id),
                location,
                placeholder,
            }
        }));
        stops.push(Stop::depot(depot));

        let total_distance_km = tour_distance_km(&stops);
        let total_duration_minutes = if self.config.average_speed_kmh > 0.0 {
            total_distance_km / self.config.average_speed_kmh * 60.0
        } else {
            0.0
        };
        let eta = now + TimeDelta::milliseconds((total_duration_minutes * 60_000.0).round() as i64);
        let fuel_liters = total_distance_km / 100.0 * self.config.fuel_liters_per_100km;

        debug!(
            mode = mode.label(),
            stops = stops.len(),
            distance_km = total_distance_km,
            "Route planned"
        );

        Some(PlannedRoute {
            stops,
            total_distance_km,
            total_duration_minutes,
            eta,
            fuel_liters,
        })
    }
}

/// 使用默认参数规划路线
pub fn plan_route<R: Rng + ?Sized>(
    depot: Coordinate,
    points: &[RoutePoint],
    mode: RouteMode,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Option<PlannedRoute> {
    RoutePlanner::default().plan(depot, points, mode, now, rng)
}

/// 相邻停靠点的距离之和
pub fn tour_distance_km(stops: &[Stop]) -> f64 {
    stops
        .windows(2)
        .map(|pair| haversine_km(pair[0].location, pair[1].location))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WasteTypeFilter;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;
    use wastelink_shared::domain::{CollectionStatus, WasteType};

    fn depot() -> Coordinate {
        Coordinate::new(-1.2921, 36.8219).unwrap()
    }

    fn point(id: i64, lat: f64, lng: f64) -> RoutePoint {
        RoutePoint {
            collection_id: id,
            waste_type: WasteType::General,
            status: CollectionStatus::Scheduled,
            location: Some(Coordinate::new(lat, lng).unwrap()),
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_closest_point_visited_first() {
        let planner = RoutePlanner::default();
        let points = vec![point(1, -1.3218, 36.7116), point(2, -1.2683, 36.8106)];

        let route = planner
            .plan(depot(), &points, RouteMode::Optimal, now(), &mut rng())
            .unwrap();

        let ids: Vec<_> = route.stops.iter().map(|s| s.collection_id).collect();
        assert_eq!(ids, vec![None, Some(2), Some(1), None]);

        let first_leg = haversine_km(depot(), route.stops[1].location);
        assert!((2.9..3.1).contains(&first_leg));
    }

    #[test]
    fn test_stops_start_and_end_at_depot() {
        let planner = RoutePlanner::default();
        let points = vec![
            point(1, -1.28, 36.80),
            point(2, -1.30, 36.83),
            point(3, -1.25, 36.79),
        ];

        let route = planner
            .plan(depot(), &points, RouteMode::Optimal, now(), &mut rng())
            .unwrap();

        assert_eq!(route.stops.len(), points.len() + 2);
        assert!(route.stops.first().unwrap().is_depot());
        assert!(route.stops.last().unwrap().is_depot());
        assert_eq!(route.collection_count(), 3);
    }

    #[test]
    fn test_every_active_point_visited_once() {
        let planner = RoutePlanner::default();
        let mut points: Vec<RoutePoint> = (0..20)
            .map(|i| point(i, -1.2 - (i as f64) * 0.01, 36.7 + ((i * 7) % 13) as f64 * 0.01))
            .collect();
        points[3].status = CollectionStatus::Completed;
        points[8].status = CollectionStatus::Cancelled;
        points[11].status = CollectionStatus::InProgress;
        points[15].location = None;

        let route = planner
            .plan(depot(), &points, RouteMode::Optimal, now(), &mut rng())
            .unwrap();

        let visited: Vec<i64> = route.stops.iter().filter_map(|s| s.collection_id).collect();
        let unique: HashSet<i64> = visited.iter().copied().collect();

        assert_eq!(visited.len(), 18);
        assert_eq!(unique.len(), 18);
        assert!(!unique.contains(&3));
        assert!(!unique.contains(&8));
        assert!(unique.contains(&11));
        assert!(unique.contains(&15));
    }

    #[test]
    fn test_distance_equals_segment_sum() {
        let planner = RoutePlanner::default();
        let points = vec![point(1, -1.28, 36.80), point(2, -1.30, 36.83)];

        let route = planner
            .plan(depot(), &points, RouteMode::Optimal, now(), &mut rng())
            .unwrap();

        let expected: f64 = route
            .stops
            .windows(2)
            .map(|w| haversine_km(w[0].location, w[1].location))
            .sum();
        assert!((route.total_distance_km - expected).abs() < 1e-9);
    }

    #[test]
    fn test_duration_eta_and_fuel() {
        let planner = RoutePlanner::default();
        let points = vec![point(1, -1.3218, 36.7116)];

        let route = planner
            .plan(depot(), &points, RouteMode::Optimal, now(), &mut rng())
            .unwrap();

        let d = route.total_distance_km;
        assert!((route.total_duration_minutes - d / 30.0 * 60.0).abs() < 1e-9);
        assert!((route.fuel_liters - d / 100.0 * 10.0).abs() < 1e-9);
        assert_eq!(route.eta, now() + route.total_duration());
    }

    #[test]
    fn test_no_active_points_returns_none() {
        let planner = RoutePlanner::default();
        assert!(
            planner
                .plan(depot(), &[], RouteMode::Optimal, now(), &mut rng())
                .is_none()
        );

        let mut done = point(1, -1.28, 36.80);
        done.status = CollectionStatus::Completed;
        assert!(
            planner
                .plan(depot(), &[done], RouteMode::Optimal, now(), &mut rng())
                .is_none()
        );
    }

    #[test]
    fn test_group_by_type_keeps_input_order() {
        let planner = RoutePlanner::default();
        let mut points = vec![
            point(1, -1.40, 36.90),
            point(2, -1.29, 36.82),
            point(3, -1.35, 36.70),
        ];
        points[1].waste_type = WasteType::Plastic;

        let all = planner
            .plan(
                depot(),
                &points,
                RouteMode::GroupByType(WasteTypeFilter::All),
                now(),
                &mut rng(),
            )
            .unwrap();
        let ids: Vec<_> = all.stops.iter().filter_map(|s| s.collection_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let general = planner
            .plan(
                depot(),
                &points,
                RouteMode::GroupByType(WasteTypeFilter::Only(WasteType::General)),
                now(),
                &mut rng(),
            )
            .unwrap();
        let ids: Vec<_> = general.stops.iter().filter_map(|s| s.collection_id).collect();
        assert_eq!(ids, vec![1, 3]);

        assert!(
            planner
                .plan(
                    depot(),
                    &points,
                    RouteMode::GroupByType(WasteTypeFilter::Only(WasteType::Glass)),
                    now(),
                    &mut rng(),
                )
                .is_none()
        );
    }

    #[test]
    fn test_placeholder_within_jitter() {
        let planner = RoutePlanner::default();
        let mut p = point(1, 0.0, 0.0);
        p.location = None;
        let mut rng = rng();

        for _ in 0..100 {
            let (location, placeholder) = planner.resolve_location(&p, depot(), &mut rng);
            assert!(placeholder);
            assert!((location.lat - depot().lat).abs() <= 0.05 + 1e-12);
            assert!((location.lng - depot().lng).abs() <= 0.05 + 1e-12);
        }
    }

    #[test]
    fn test_placeholder_is_deterministic_for_seed() {
        let planner = RoutePlanner::default();
        let mut p = point(1, 0.0, 0.0);
        p.location = None;

        let a = planner.resolve_location(&p, depot(), &mut StdRng::seed_from_u64(7));
        let b = planner.resolve_location(&p, depot(), &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_nearest_neighbor_tie_uses_input_order() {
        let origin = Coordinate::new(0.0, 0.0).unwrap();
        let east = Coordinate::new(0.0, 0.1).unwrap();
        let west = Coordinate::new(0.0, -0.1).unwrap();

        assert_eq!(nearest_neighbor_order(origin, &[east, west]), vec![0, 1]);
        assert_eq!(nearest_neighbor_order(origin, &[west, east]), vec![0, 1]);
    }

    #[test]
    fn test_nearest_neighbor_empty() {
        assert!(nearest_neighbor_order(depot(), &[]).is_empty());
    }

    #[test]
    fn test_active_points_filter() {
        let mut points = vec![point(1, 0.0, 0.0), point(2, 0.0, 0.0), point(3, 0.0, 0.0)];
        points[0].status = CollectionStatus::InProgress;
        points[2].status = CollectionStatus::Cancelled;

        let ids: Vec<_> = active_points(&points).iter().map(|p| p.collection_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
