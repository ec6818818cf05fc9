//! CRM 管理后台公共模块
//!
//! 包含配置加载、错误类型、统一响应体、中间件、共享模型以及 SQL 只读校验。

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;
