//! 收集任务实体

use chrono::{DateTime, Utc};
use route_planner::{Coordinate, RoutePoint};
use serde::{Deserialize, Serialize};

use super::{CollectionStatus, WasteType};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: i64,
    pub household_id: String,
    pub collector_id: Option<String>,
    pub waste_type: WasteType,
    pub quantity_kg: f64,
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub scheduled_for: DateTime<Utc>,
    pub status: CollectionStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Collection {
    /// 是否为该任务的参与方（住户或已接单的收集员）
    pub fn involves(&self, user_id: &str) -> bool {
        self.household_id == user_id || self.collector_id.as_deref() == Some(user_id)
    }

    pub fn location(&self) -> Option<Coordinate> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Coordinate::new(lat, lng).ok(),
            _ => None,
        }
    }

    pub fn to_route_point(&self) -> RoutePoint {
        RoutePoint {
            collection_id: self.id,
            waste_type: self.waste_type,
            status: self.status,
            location: self.location(),
        }
    }

    /// 状态变更需要通知的用户
    pub fn participants(&self) -> Vec<&str> {
        let mut users = vec![self.household_id.as_str()];
        if let Some(collector) = self.collector_id.as_deref() {
            users.push(collector);
        }
        users
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn collection(id: i64, status: CollectionStatus) -> Collection {
        Collection {
            id,
            household_id: "household-1".to_string(),
            collector_id: None,
            waste_type: WasteType::Plastic,
            quantity_kg: 12.5,
            address: "Kilimani, Nairobi".to_string(),
            lat: Some(-1.2921),
            lng: Some(36.7856),
            scheduled_for: Utc::now(),
            status,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}


/// 新建收集任务
#[derive(Debug, Clone, PartialEq)]
pub struct NewCollection {
    pub household_id: String,
    pub waste_type: WasteType,
    pub quantity_kg: f64,
    pub address: String,
    pub location: Option<Coordinate>,
    pub scheduled_for: DateTime<Utc>,
    pub notes: Option<String>,
}
