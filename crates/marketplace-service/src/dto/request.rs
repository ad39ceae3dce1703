//! 请求体与查询参数

use chrono::{DateTime, Utc};
use route_planner::{Coordinate, RouteMode, WasteTypeFilter};
use serde::Deserialize;
use validator::Validate;

use crate::error::ApiError;
use crate::models::{CollectionStatus, UserRole, WasteType};
use crate::service::RouteQuery;

/// 经纬度必须成对出现
fn coordinate(lat: Option<f64>, lng: Option<f64>) -> Result<Option<Coordinate>, ApiError> {
    match (lat, lng) {
        (None, None) => Ok(None),
        (Some(lat), Some(lng)) => Coordinate::new(lat, lng)
            .map(Some)
            .map_err(|e| ApiError::Validation(e.to_string())),
        _ => Err(ApiError::Validation("lat 与 lng 必须同时提供".to_string())),
    }
}

/// 创建或覆盖个人资料
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProfileRequest {
    pub role: UserRole,
    #[validate(length(min = 1, max = 100, message = "显示名称长度必须在1-100个字符之间"))]
    pub display_name: String,
    #[validate(email(message = "邮箱格式无效"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl UpsertProfileRequest {
    pub fn location(&self) -> Result<Option<Coordinate>, ApiError> {
        coordinate(self.lat, self.lng)
    }
}

/// 部分更新个人资料
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "显示名称长度必须在1-100个字符之间"))]
    pub display_name: Option<String>,
    #[validate(email(message = "邮箱格式无效"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl UpdateProfileRequest {
    pub fn location(&self) -> Result<Option<Coordinate>, ApiError> {
        coordinate(self.lat, self.lng)
    }
}

/// 预约收集
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest {
    #[serde(default)]
    pub waste_type: WasteType,
    #[validate(range(min = 0.1, max = 10000.0, message = "重量必须在0.1-10000公斤之间"))]
    pub quantity_kg: f64,
    #[validate(length(min = 1, max = 255, message = "地址长度必须在1-255个字符之间"))]
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub scheduled_for: DateTime<Utc>,
    #[validate(length(max = 500, message = "备注不能超过500个字符"))]
    pub notes: Option<String>,
}

impl CreateCollectionRequest {
    pub fn location(&self) -> Result<Option<Coordinate>, ApiError> {
        coordinate(self.lat, self.lng)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionListQuery {
    pub status: Option<CollectionStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: CollectionStatus,
}

/// 路线规划查询参数
///
/// `mode` 为 `optimal`（默认）或 `by_type`；`by_type` 下 `wasteType` 为空表示全部类型
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteParams {
    pub mode: Option<String>,
    pub waste_type: Option<WasteType>,
    pub depot_lat: Option<f64>,
    pub depot_lng: Option<f64>,
}

impl TryFrom<RouteParams> for RouteQuery {
    type Error = ApiError;

    fn try_from(params: RouteParams) -> Result<Self, Self::Error> {
        let filter = params
            .waste_type
            .map_or(WasteTypeFilter::All, WasteTypeFilter::Only);

        let mode = match params.mode.as_deref().map(str::trim) {
            None | Some("") | Some("optimal") => RouteMode::Optimal,
            Some("by_type") => RouteMode::GroupByType(filter),
            Some(other) => {
                return Err(ApiError::Validation(format!(
                    "未知的规划模式: {other}，可选 optimal / by_type"
                )));
            }
        };

        Ok(RouteQuery {
            mode,
            depot_lat: params.depot_lat,
            depot_lng: params.depot_lng,
        })
    }
}

/// 站内消息
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 128, message = "接收方不能为空"))]
    pub recipient_id: String,
    #[validate(length(min = 1, max = 1000, message = "消息长度必须在1-1000个字符之间"))]
    pub content: String,
}

/// 发起支付
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    pub collection_id: i64,
    #[validate(length(min = 9, max = 20, message = "手机号长度无效"))]
    pub phone: String,
    #[validate(range(min = 1, message = "金额必须大于0"))]
    pub amount: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    #[validate(length(min = 9, max = 20, message = "手机号长度无效"))]
    pub phone: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[validate(length(min = 9, max = 20, message = "手机号长度无效"))]
    pub phone: String,
    #[validate(length(min = 4, max = 10, message = "验证码长度无效"))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailCodeRequest {
    #[validate(email(message = "邮箱格式无效"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailCodeRequest {
    #[validate(email(message = "邮箱格式无效"))]
    pub email: String,
    #[validate(length(min = 4, max = 10, message = "验证码长度无效"))]
    pub code: String,
}

/// 评价收集员
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RateCollectionRequest {
    #[validate(range(min = 1, max = 5, message = "评分必须在1-5之间"))]
    pub score: i16,
    #[validate(length(max = 500, message = "评价内容不能超过500个字符"))]
    pub comment: Option<String>,
}

/// 回收商登记感兴趣的材料
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialInterestRequest {
    pub waste_type: WasteType,
    #[validate(range(min = 0.0, message = "最小重量不能为负"))]
    pub min_quantity_kg: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    #[validate(length(min = 1, max = 200, message = "主题长度必须在1-200个字符之间"))]
    pub subject: String,
    #[validate(length(min = 1, max = 2000, message = "内容长度必须在1-2000个字符之间"))]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEcoTipRequest {
    #[validate(length(min = 1, max = 200, message = "标题长度必须在1-200个字符之间"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "内容长度必须在1-5000个字符之间"))]
    pub content: String,
    pub waste_type: Option<WasteType>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcoTipQuery {
    pub waste_type: Option<WasteType>,
}
