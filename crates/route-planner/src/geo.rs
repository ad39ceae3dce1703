//! 地理坐标与球面距离

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

/// 地球平均半径（千米）
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// 经纬度坐标（十进制度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// 创建坐标并校验范围
    ///
    /// 纬度必须位于 [-90, 90]，经度位于 [-180, 180]，且均为有限值。
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);

        if valid {
            Ok(Self { lat, lng })
        } else {
            Err(PlannerError::InvalidCoordinate { lat, lng })
        }
    }

    /// 偏移指定度数，结果夹在合法范围内
    pub(crate) fn offset(&self, dlat: f64, dlng: f64) -> Self {
        Self {
            lat: (self.lat + dlat).clamp(-90.0, 90.0),
            lng: (self.lng + dlng).clamp(-180.0, 180.0),
        }
    }
}

/// 两点间的大圆距离（千米）
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // 浮点误差可能让 h 略超过 1
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}
