//! 请求与响应 DTO

pub mod request;
pub mod response;

pub use request::{
    CollectionListQuery, CreateCollectionRequest, CreateEcoTipRequest, CreateFeedbackRequest,
    CreateMaterialInterestRequest, EcoTipQuery, InitiatePaymentRequest, RateCollectionRequest,
    RouteParams, SendEmailCodeRequest, SendMessageRequest, SendOtpRequest, UpdateProfileRequest,
    UpdateStatusRequest, UpsertProfileRequest, VerifyEmailCodeRequest, VerifyOtpRequest,
};
pub use response::{ApiResponse, DeletedResponse, MessageDelivery, VerificationResult};
