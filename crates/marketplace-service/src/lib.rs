//! WasteLink 市场服务
//!
//! 住户预约上门收集、收集员接单与路线规划、M-Pesa 支付、验证码、评价与徽章的 REST API，
//! 并在同一进程内提供 `/ws` 实时推送。

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;

pub use error::{ApiError, Result};
pub use state::AppState;
