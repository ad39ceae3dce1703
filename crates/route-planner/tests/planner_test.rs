//! 路线规划集成测试
//!
//! 通过公开 API 验证规划结果的整体性质。

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use route_planner::{
    CollectionStatus, Coordinate, PlannerConfig, RouteMode, RoutePlanner, RoutePoint, WasteType,
    plan_route, tour_distance_km,
};
use std::collections::HashSet;

fn depot() -> Coordinate {
    Coordinate::new(-1.2921, 36.8219).unwrap()
}

fn random_points(rng: &mut StdRng, count: usize) -> Vec<RoutePoint> {
    let statuses = [
        CollectionStatus::Scheduled,
        CollectionStatus::InProgress,
        CollectionStatus::Completed,
        CollectionStatus::Cancelled,
    ];

    (0..count)
        .map(|i| RoutePoint {
            collection_id: 1000 + i as i64,
            waste_type: WasteType::General,
            status: statuses[rng.random_range(0..statuses.len())],
            location: if rng.random_bool(0.2) {
                None
            } else {
                Some(Coordinate {
                    lat: -1.2921 + rng.random_range(-0.3..0.3),
                    lng: 36.8219 + rng.random_range(-0.3..0.3),
                })
            },
        })
        .collect()
}

#[test]
fn test_random_layouts_keep_tour_invariants() {
    for seed in 0..50u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let count = rng.random_range(0..40);
        let points = random_points(&mut rng, count);

        let active: HashSet<i64> = points
            .iter()
            .filter(|p| p.status.is_active())
            .map(|p| p.collection_id)
            .collect();

        let route = plan_route(depot(), &points, RouteMode::Optimal, Utc::now(), &mut rng);

        let Some(route) = route else {
            assert!(active.is_empty(), "seed {seed}: 有活跃点却返回 None");
            continue;
        };

        assert_eq!(route.stops.len(), active.len() + 2, "seed {seed}");
        assert!(route.stops[0].is_depot());
        assert!(route.stops[route.stops.len() - 1].is_depot());

        let visited: Vec<i64> = route.stops.iter().filter_map(|s| s.collection_id).collect();
        let visited_set: HashSet<i64> = visited.iter().copied().collect();
        assert_eq!(visited.len(), visited_set.len(), "seed {seed}: 重复访问");
        assert_eq!(visited_set, active, "seed {seed}");

        assert!((route.total_distance_km - tour_distance_km(&route.stops)).abs() < 1e-9);
    }
}

#[test]
fn test_custom_config_changes_estimates() {
    let planner = RoutePlanner::new(PlannerConfig {
        average_speed_kmh: 60.0,
        fuel_liters_per_100km: 20.0,
        placeholder_jitter_deg: 0.0,
    });

    let points = vec![RoutePoint {
        collection_id: 1,
        waste_type: WasteType::Metal,
        status: CollectionStatus::Scheduled,
        location: None,
    }];

    let route = planner
        .plan(
            depot(),
            &points,
            RouteMode::Optimal,
            Utc::now(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

    // 零抖动时占位点与仓库重合
    assert!(route.stops[1].placeholder);
    assert_eq!(route.stops[1].location, depot());
    assert_eq!(route.total_distance_km, 0.0);
    assert_eq!(route.fuel_liters, 0.0);
}
