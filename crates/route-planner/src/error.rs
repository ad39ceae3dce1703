//! 路线规划错误类型

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PlannerError {
    #[error("无效的坐标: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },
}

pub type Result<T> = std::result::Result<T, PlannerError>;
