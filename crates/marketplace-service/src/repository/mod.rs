//! 数据访问层
//!
//! 每个仓储同时提供 trait（供服务层依赖和 mock）和基于 PgPool 的实现

mod badge_repo;
mod collection_repo;
mod payment_repo;
mod rating_repo;
mod traits;
mod user_repo;

pub use badge_repo::BadgeRepository;
pub use collection_repo::CollectionRepository;
pub use payment_repo::PaymentRepository;
pub use rating_repo::RatingRepository;
pub use traits::*;
pub use user_repo::UserRepository;
