//! 评价仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::RatingRepositoryTrait;
use crate::error::Result;
use crate::models::{NewRating, Rating};

pub struct RatingRepository {
    pool: PgPool,
}

impl RatingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RatingRepositoryTrait for RatingRepository {
    async fn create(&self, rating: &NewRating) -> Result<Option<Rating>> {
        let row = sqlx::query_as::<_, Rating>(
            r#"
            INSERT INTO ratings (collection_id, rater_id, ratee_id, score, comment)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (collection_id) DO NOTHING
            RETURNING id, collection_id, rater_id, ratee_id, score, comment, created_at
            "#,
        )
        .bind(rating.collection_id)
        .bind(&rating.rater_id)
        .bind(&rating.ratee_id)
        .bind(rating.score)
        .bind(&rating.comment)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_for_user(&self, ratee_id: &str) -> Result<Vec<Rating>> {
        let rows = sqlx::query_as::<_, Rating>(
            r#"
            SELECT id, collection_id, rater_id, ratee_id, score, comment, created_at
            FROM ratings
            WHERE ratee_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(ratee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
