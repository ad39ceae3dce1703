//! 评价、反馈、环保贴士与回收意向

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::WasteType;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: i64,
    pub collection_id: i64,
    pub rater_id: String,
    pub ratee_id: String,
    pub score: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRating {
    pub collection_id: i64,
    pub rater_id: String,
    pub ratee_id: String,
    pub score: i16,
    pub comment: Option<String>,
}

/// 某用户收到的评价汇总
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub user_id: String,
    pub count: usize,
    /// 没有评价时为 None
    pub average: Option<f64>,
    pub ratings: Vec<Rating>,
}

impl RatingSummary {
    pub fn from_ratings(user_id: impl Into<String>, ratings: Vec<Rating>) -> Self {
        let count = ratings.len();
        let average = if count == 0 {
            None
        } else {
            let total: i64 = ratings.iter().map(|r| i64::from(r.score)).sum();
            // 保留两位小数
            Some(((total as f64 / count as f64) * 100.0).round() / 100.0)
        };

        Self {
            user_id: user_id.into(),
            count,
            average,
            ratings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: i64,
    pub user_id: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EcoTip {
    pub id: i64,
    pub author_id: String,
    pub title: String,
    pub content: String,
    pub waste_type: Option<WasteType>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MaterialInterest {
    pub id: i64,
    pub recycler_id: String,
    pub waste_type: WasteType,
    pub min_quantity_kg: f64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(score: i16) -> Rating {
        Rating {
            id: 1,
            collection_id: 1,
            rater_id: "household-1".into(),
            ratee_id: "collector-1".into(),
            score,
            comment: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_rating_summary_average() {
        let summary = RatingSummary::from_ratings("collector-1", vec![rating(5), rating(4), rating(4)]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average, Some(4.33));
    }

    #[test]
    fn test_rating_summary_empty() {
        let summary = RatingSummary::from_ratings("collector-1", vec![]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.average, None);
    }
}
