//! 共享库
//!
//! 包含所有服务共用的配置、错误处理、数据库连接、缓存、实时推送事件和可观测性等基础设施代码。

pub mod cache;
pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod events;
pub mod observability;
