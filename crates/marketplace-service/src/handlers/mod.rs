//! HTTP 请求处理器模块

pub mod badges;
pub mod collections;
pub mod engagement;
pub mod health;
pub mod messages;
pub mod otp;
pub mod payments;
pub mod users;
