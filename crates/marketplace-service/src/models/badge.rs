//! 徽章实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 徽章定义
///
/// 住户累计完成的收集次数达到 `threshold` 时授予
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub threshold: i32,
}

/// 用户已获得的徽章
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserBadge {
    pub badge_id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub awarded_at: DateTime<Utc>,
}
