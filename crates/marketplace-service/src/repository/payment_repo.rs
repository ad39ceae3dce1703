//! 支付仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::PaymentRepositoryTrait;
use crate::error::Result;
use crate::models::{NewPayment, Payment, PaymentOutcome, PaymentStatus};

const PAYMENT_COLUMNS: &str = "id, collection_id, payer_id, phone, amount, status, \
                               checkout_request_id, receipt_number, failure_reason, \
                               created_at, updated_at";

pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepositoryTrait for PaymentRepository {
    async fn create(&self, payment: &NewPayment) -> Result<Payment> {
        let row = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (collection_id, payer_id, phone, amount, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment.collection_id)
        .bind(&payment.payer_id)
        .bind(&payment.phone)
        .bind(payment.amount)
        .bind(PaymentStatus::Pending)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get(&self, id: i64) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get_by_checkout_request(&self, checkout_request_id: &str) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE checkout_request_id = $1"
        ))
        .bind(checkout_request_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn set_checkout_request(&self, id: i64, checkout_request_id: &str) -> Result<Payment> {
        let row = sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments SET checkout_request_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(checkout_request_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn finalize(&self, id: i64, outcome: &PaymentOutcome) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET status = $2, receipt_number = $3, failure_reason = $4, updated_at = NOW()
            WHERE id = $1 AND status = $5
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(outcome.status)
        .bind(&outcome.receipt_number)
        .bind(&outcome.failure_reason)
        .bind(PaymentStatus::Pending)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
