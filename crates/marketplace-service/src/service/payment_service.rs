//! M-Pesa 支付服务
//!
//! 流程：创建 pending 记录 → 发起 STK Push → 网关回调写入终态。
//! 网关调用失败时记录直接置为 failed。终态不可再变更，重复回调忽略。

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument, warn};
use wastelink_shared::config::PaymentsConfig;
use wastelink_shared::observability::metrics;

use super::gateway::{PaymentGateway, StkPushRequest};
use super::phone::normalize_kenyan_phone;
use crate::error::{ApiError, Result};
use crate::models::{NewPayment, Payment, PaymentOutcome, PaymentStatus};
use crate::repository::{CollectionRepositoryTrait, PaymentRepositoryTrait};

/// 用户在手机上取消
const RESULT_CODE_CANCELLED_BY_USER: i32 = 1032;

/// 网关回调
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallback {
    pub checkout_request_id: String,
    /// 0 表示成功
    pub result_code: i32,
    #[serde(default)]
    pub result_desc: String,
    #[serde(default)]
    pub receipt_number: Option<String>,
}

impl PaymentCallback {
    fn outcome(&self) -> PaymentOutcome {
        match self.result_code {
            0 => PaymentOutcome::success(self.receipt_number.clone()),
            RESULT_CODE_CANCELLED_BY_USER => PaymentOutcome::cancelled(self.result_desc.clone()),
            _ => PaymentOutcome::failed(self.result_desc.clone()),
        }
    }
}

pub struct PaymentService<PR, CR>
where
    PR: PaymentRepositoryTrait,
    CR: CollectionRepositoryTrait,
{
    payment_repo: Arc<PR>,
    collection_repo: Arc<CR>,
    gateway: Arc<dyn PaymentGateway>,
    config: PaymentsConfig,
}

impl<PR, CR> PaymentService<PR, CR>
where
    PR: PaymentRepositoryTrait,
    CR: CollectionRepositoryTrait,
{
    pub fn new(
        payment_repo: Arc<PR>,
        collection_repo: Arc<CR>,
        gateway: Arc<dyn PaymentGateway>,
        config: PaymentsConfig,
    ) -> Self {
        Self {
            payment_repo,
            collection_repo,
            gateway,
            config,
        }
    }

    /// 发起支付
    #[instrument(skip(self, phone))]
    pub async fn initiate(
        &self,
        payer_id: &str,
        collection_id: i64,
        phone: &str,
        amount: i64,
    ) -> Result<Payment> {
        if amount < self.config.min_amount || amount > self.config.max_amount {
            return Err(ApiError::Validation(format!(
                "金额必须在 {} 到 {} 之间",
                self.config.min_amount, self.config.max_amount
            )));
        }
        let phone = normalize_kenyan_phone(phone)?;

        let collection = self
            .collection_repo
            .get(collection_id)
            .await?
            .ok_or(ApiError::CollectionNotFound(collection_id))?;
        if collection.household_id != payer_id {
            return Err(ApiError::Forbidden("只能为自己的收集任务付款".to_string()));
        }

        let payment = self
            .payment_repo
            .create(&NewPayment {
                collection_id,
                payer_id: payer_id.to_string(),
                phone: phone.clone(),
                amount,
            })
            .await?;

        let request = StkPushRequest {
            phone,
            amount,
            account_reference: format!("WL-{}", payment.id),
            description: format!("Waste collection #{collection_id}"),
            callback_url: self.config.callback_url.clone(),
        };

        match self.gateway.initiate_stk_push(&request).await {
            Ok(response) => {
                info!(
                    payment_id = payment.id,
                    checkout_request_id = %response.checkout_request_id,
                    "STK push initiated"
                );
                self.payment_repo
                    .set_checkout_request(payment.id, &response.checkout_request_id)
                    .await
            }
            Err(e) => {
                warn!(payment_id = payment.id, error = %e, "STK push failed");
                self.payment_repo
                    .finalize(payment.id, &PaymentOutcome::failed(e.to_string()))
                    .await?;
                metrics::record_payment(PaymentStatus::Failed.as_str());
                Err(match e {
                    ApiError::PaymentGateway(_) => e,
                    other => ApiError::PaymentGateway(other.to_string()),
                })
            }
        }
    }

    /// 查询支付状态（仅付款人）
    pub async fn get(&self, payer_id: &str, id: i64) -> Result<Payment> {
        let payment = self
            .payment_repo
            .get(id)
            .await?
            .ok_or(ApiError::PaymentNotFound(id))?;
        if payment.payer_id != payer_id {
            return Err(ApiError::Forbidden("无权查看该支付记录".to_string()));
        }
        Ok(payment)
    }

    /// 处理网关回调，返回最新的支付记录
    #[instrument(skip(self, callback), fields(checkout_request_id = %callback.checkout_request_id))]
    pub async fn handle_callback(&self, callback: &PaymentCallback) -> Result<Payment> {
        let payment = self
            .payment_repo
            .get_by_checkout_request(&callback.checkout_request_id)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("checkout request {}", callback.checkout_request_id))
            })?;

        if payment.status.is_terminal() {
            info!(
                payment_id = payment.id,
                status = %payment.status,
                "Callback for finalized payment ignored"
            );
            return Ok(payment);
        }

        let outcome = callback.outcome();
        match self.payment_repo.finalize(payment.id, &outcome).await? {
            Some(updated) => {
                info!(payment_id = updated.id, status = %updated.status, "Payment finalized");
                metrics::record_payment(updated.status.as_str());
                Ok(updated)
            }
            None => {
                // 并发回调已先写入终态
                info!(payment_id = payment.id, "Payment finalized concurrently");
                self.payment_repo
                    .get(payment.id)
                    .await?
                    .ok_or(ApiError::PaymentNotFound(payment.id))
            }
        }
    }

    /// 付款人主动取消，仅 pending 可取消
    #[instrument(skip(self))]
    pub async fn cancel(&self, payer_id: &str, id: i64) -> Result<Payment> {
        let payment = self.get(payer_id, id).await?;
        let outcome = PaymentOutcome::cancelled("cancelled by payer");

        if !payment.status.can_transition_to(outcome.status) {
            return Err(ApiError::InvalidStatusTransition {
                from: payment.status.to_string(),
                to: outcome.status.to_string(),
            });
        }

        let updated = self
            .payment_repo
            .finalize(id, &outcome)
            .await?
            .ok_or_else(|| ApiError::InvalidStatusTransition {
                from: "finalized".to_string(),
                to: outcome.status.to_string(),
            })?;

        metrics::record_payment(updated.status.as_str());
        Ok(updated)
    }
}
