//! 市场服务领域模型
//!
//! 数据库行与 API 输出共用同一组结构

pub mod badge;
pub mod collection;
pub mod engagement;
pub mod payment;
pub mod user;

pub use badge::{Badge, UserBadge};
pub use collection::{Collection, NewCollection};
pub use engagement::{EcoTip, Feedback, MaterialInterest, NewRating, Rating, RatingSummary};
pub use payment::{NewPayment, Payment, PaymentOutcome};
pub use user::{NewUser, User, UserUpdate};

pub use wastelink_shared::domain::{CollectionStatus, PaymentStatus, UserRole, WasteType};
