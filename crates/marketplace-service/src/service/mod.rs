//! 业务服务层

pub mod badge_service;
pub mod collection_service;
pub mod gateway;
pub mod otp;
pub mod payment_service;
pub mod phone;
pub mod rating_service;
pub mod senders;

pub use badge_service::BadgeService;
pub use collection_service::{CollectionService, RouteQuery};
pub use gateway::{PaymentGateway, SimulatedMpesaGateway, StkPushRequest, StkPushResponse};
pub use otp::{MemoryOtpStore, OtpDispatch, OtpEntry, OtpService, OtpStore, OtpTarget, RedisOtpStore};
pub use payment_service::{PaymentCallback, PaymentService};
pub use phone::normalize_kenyan_phone;
pub use rating_service::{MAX_SCORE, MIN_SCORE, RatingService};
pub use senders::{LogEmailSender, LogOtpSender, OtpSender};
