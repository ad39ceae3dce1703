//! 移动支付网关
//!
//! 当前为模拟实现：记录日志并返回合成的 CheckoutRequestID，
//! 实际结果通过 `/payments/callback` 回调写入。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, Result};

/// STK Push 请求
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StkPushRequest {
    /// 2547XXXXXXXX / 2541XXXXXXXX
    pub phone: String,
    pub amount: i64,
    /// 账单参考号（支付记录 ID）
    pub account_reference: String,
    pub description: String,
    pub callback_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StkPushResponse {
    pub checkout_request_id: String,
    pub merchant_request_id: String,
    pub customer_message: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate_stk_push(&self, request: &StkPushRequest) -> Result<StkPushResponse>;
}

/// 模拟 M-Pesa 网关
#[derive(Debug, Clone, Default)]
pub struct SimulatedMpesaGateway;

impl SimulatedMpesaGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentGateway for SimulatedMpesaGateway {
    async fn initiate_stk_push(&self, request: &StkPushRequest) -> Result<StkPushResponse> {
        if request.amount <= 0 {
            return Err(ApiError::PaymentGateway("金额必须大于 0".to_string()));
        }

        let checkout_request_id = format!("ws_CO_{}", Uuid::new_v4().simple());
        let merchant_request_id = Uuid::new_v4().to_string();

        info!(
            phone = %request.phone,
            amount = request.amount,
            reference = %request.account_reference,
            checkout_request_id = %checkout_request_id,
            "模拟发送 STK Push"
        );

        Ok(StkPushResponse {
            checkout_request_id,
            merchant_request_id,
            customer_message: "Success. Request accepted for processing".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount: i64) -> StkPushRequest {
        StkPushRequest {
            phone: "254712345678".to_string(),
            amount,
            account_reference: "PAY-1".to_string(),
            description: "Collection 1".to_string(),
            callback_url: "http://localhost/callback".to_string(),
        }
    }

    #[tokio::test]
    async fn test_simulated_gateway_returns_checkout_id() {
        let gateway = SimulatedMpesaGateway::new();
        let a = gateway.initiate_stk_push(&request(100)).await.unwrap();
        let b = gateway.initiate_stk_push(&request(100)).await.unwrap();

        assert!(a.checkout_request_id.starts_with("ws_CO_"));
        assert_ne!(a.checkout_request_id, b.checkout_request_id);
    }

    #[tokio::test]
    async fn test_simulated_gateway_rejects_non_positive_amount() {
        let gateway = SimulatedMpesaGateway::new();
        assert!(matches!(
            gateway.initiate_stk_push(&request(0)).await,
            Err(ApiError::PaymentGateway(_))
        ));
    }
}
