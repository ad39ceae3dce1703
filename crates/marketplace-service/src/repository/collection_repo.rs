//! 收集任务仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::CollectionRepositoryTrait;
use crate::error::Result;
use crate::models::{Collection, CollectionStatus, NewCollection};

const COLLECTION_COLUMNS: &str = "id, household_id, collector_id, waste_type, quantity_kg, \
                                  address, lat, lng, scheduled_for, status, notes, \
                                  created_at, updated_at";

pub struct CollectionRepository {
    pool: PgPool,
}

impl CollectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CollectionRepositoryTrait for CollectionRepository {
    async fn create(&self, collection: &NewCollection) -> Result<Collection> {
        let row = sqlx::query_as::<_, Collection>(&format!(
            r#"
            INSERT INTO collections
                (household_id, waste_type, quantity_kg, address, lat, lng, scheduled_for, notes, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COLLECTION_COLUMNS}
            "#
        ))
        .bind(&collection.household_id)
        .bind(collection.waste_type)
        .bind(collection.quantity_kg)
        .bind(&collection.address)
        .bind(collection.location.map(|c| c.lat))
        .bind(collection.location.map(|c| c.lng))
        .bind(collection.scheduled_for)
        .bind(&collection.notes)
        .bind(CollectionStatus::Scheduled)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get(&self, id: i64) -> Result<Option<Collection>> {
        let row = sqlx::query_as::<_, Collection>(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_for_household(
        &self,
        household_id: &str,
        status: Option<CollectionStatus>,
    ) -> Result<Vec<Collection>> {
        let rows = sqlx::query_as::<_, Collection>(&format!(
            r#"
            SELECT {COLLECTION_COLUMNS} FROM collections
            WHERE household_id = $1 AND ($2::varchar IS NULL OR status = $2)
            ORDER BY scheduled_for DESC, id DESC
            "#
        ))
        .bind(household_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_for_collector(
        &self,
        collector_id: &str,
        status: Option<CollectionStatus>,
    ) -> Result<Vec<Collection>> {
        let rows = sqlx::query_as::<_, Collection>(&format!(
            r#"
            SELECT {COLLECTION_COLUMNS} FROM collections
            WHERE (collector_id = $1 OR (collector_id IS NULL AND status = $3))
              AND ($2::varchar IS NULL OR status = $2)
            ORDER BY scheduled_for ASC, id ASC
            "#
        ))
        .bind(collector_id)
        .bind(status)
        .bind(CollectionStatus::Scheduled)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_active_assigned(&self, collector_id: &str) -> Result<Vec<Collection>> {
        let rows = sqlx::query_as::<_, Collection>(&format!(
            r#"
            SELECT {COLLECTION_COLUMNS} FROM collections
            WHERE collector_id = $1 AND status IN ($2, $3)
            ORDER BY scheduled_for ASC, id ASC
            "#
        ))
        .bind(collector_id)
        .bind(CollectionStatus::Scheduled)
        .bind(CollectionStatus::InProgress)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn assign_collector(&self, id: i64, collector_id: &str) -> Result<Option<Collection>> {
        let row = sqlx::query_as::<_, Collection>(&format!(
            r#"
            UPDATE collections
            SET collector_id = $2, updated_at = NOW()
            WHERE id = $1 AND collector_id IS NULL AND status = $3
            RETURNING {COLLECTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(collector_id)
        .bind(CollectionStatus::Scheduled)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_status(
        &self,
        id: i64,
        from: CollectionStatus,
        to: CollectionStatus,
    ) -> Result<Option<Collection>> {
        let row = sqlx::query_as::<_, Collection>(&format!(
            r#"
            UPDATE collections
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {COLLECTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn count_completed_for_household(&self, household_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM collections WHERE household_id = $1 AND status = $2",
        )
        .bind(household_id)
        .bind(CollectionStatus::Completed)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
