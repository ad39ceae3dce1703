//! 认证模块
//!
//! 令牌由外部身份提供方签发，服务端只做校验

mod jwt;

pub use jwt::{Claims, JwtVerifier};
