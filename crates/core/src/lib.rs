//! # Proxy Core
//!
//! CDS Hooks 分发代理的核心数据模型、错误类型和组件接口。
//!
//! - [`models`]: 调用句柄、服务定义、触发请求、出站请求和调用结果
//! - [`traits`]: 服务目录 ([`ServiceCatalog`]) 与服务调用器 ([`ServiceInvoker`]) 接口
//! - [`errors`]: 统一错误类型 [`ProxyError`]

pub mod errors;
pub mod models;
pub mod traits;

pub use errors::*;
pub use models::{
    CallOutcome, CatalogDocument, CdsRequest, HookContext, InstanceHandle, ServiceDefinition,
    TriggerRequest,
};
pub use traits::{ServiceCatalog, ServiceInvoker};

/// 统一的Result类型
pub type ProxyResult<T> = std::result::Result<T, ProxyError>;
