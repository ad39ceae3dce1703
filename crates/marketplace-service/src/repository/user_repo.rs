//! 用户仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::UserRepositoryTrait;
use crate::error::Result;
use crate::models::{NewUser, User, UserRole, UserUpdate};

const USER_COLUMNS: &str = "id, role, display_name, email, phone, phone_verified, \
                            location_lat, location_lng, created_at, updated_at";

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn get(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn upsert(&self, user: &NewUser) -> Result<User> {
        // 手机号变化时需要重新验证
        let row = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, role, display_name, email, phone, location_lat, location_lng)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                role = EXCLUDED.role,
                display_name = EXCLUDED.display_name,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                phone_verified = users.phone_verified AND users.phone IS NOT DISTINCT FROM EXCLUDED.phone,
                location_lat = EXCLUDED.location_lat,
                location_lng = EXCLUDED.location_lng,
                updated_at = NOW()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.id)
        .bind(user.role)
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.location.map(|c| c.lat))
        .bind(user.location.map(|c| c.lng))
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update(&self, id: &str, changes: &UserUpdate) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                display_name = COALESCE($2, display_name),
                email = COALESCE($3, email),
                phone_verified = CASE WHEN $4::varchar IS NULL OR $4 = phone
                                      THEN phone_verified ELSE FALSE END,
                phone = COALESCE($4, phone),
                location_lat = COALESCE($5, location_lat),
                location_lng = COALESCE($6, location_lng),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.display_name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(changes.location.map(|c| c.lat))
        .bind(changes.location.map(|c| c.lng))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_collectors(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY display_name ASC"
        ))
        .bind(UserRole::Collector)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn mark_phone_verified(&self, id: &str, phone: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET phone = $2, phone_verified = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(phone)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
