//! 用户实体

use chrono::{DateTime, Utc};
use route_planner::Coordinate;
use serde::{Deserialize, Serialize};

use super::UserRole;

/// 用户资料
///
/// `id` 为身份提供方签发的 subject
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub role: UserRole,
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub phone_verified: bool,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn location(&self) -> Option<Coordinate> {
        match (self.location_lat, self.location_lng) {
            (Some(lat), Some(lng)) => Coordinate::new(lat, lng).ok(),
            _ => None,
        }
    }

    pub fn is(&self, role: UserRole) -> bool {
        self.role == role
    }
}

/// 创建或覆盖用户资料
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub id: String,
    pub role: UserRole,
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<Coordinate>,
}

/// 部分更新，None 表示保持原值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<Coordinate>,
}
