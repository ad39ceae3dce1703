//! 支付实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PaymentStatus;

/// M-Pesa 支付记录，金额单位为肯尼亚先令
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub collection_id: i64,
    pub payer_id: String,
    pub phone: String,
    pub amount: i64,
    pub status: PaymentStatus,
    pub checkout_request_id: Option<String>,
    pub receipt_number: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub collection_id: i64,
    pub payer_id: String,
    /// 已规范化为 254 开头
    pub phone: String,
    pub amount: i64,
}

/// 支付终态及附带信息
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub status: PaymentStatus,
    pub receipt_number: Option<String>,
    pub failure_reason: Option<String>,
}

impl PaymentOutcome {
    pub fn success(receipt_number: Option<String>) -> Self {
        Self {
            status: PaymentStatus::Success,
            receipt_number,
            failure_reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: PaymentStatus::Failed,
            receipt_number: None,
            failure_reason: Some(reason.into()),
        }
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self {
            status: PaymentStatus::Cancelled,
            receipt_number: None,
            failure_reason: Some(reason.into()),
        }
    }
}
