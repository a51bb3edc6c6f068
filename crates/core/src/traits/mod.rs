//! 组件接口定义
//!
//! 分发引擎只通过这两个接口与外部协作者交互：
//! - [`ServiceCatalog`]: 按hook类型解析适用的后端服务
//! - [`ServiceInvoker`]: 执行一次出站调用

pub mod catalog;
pub mod invoker;

pub use catalog::ServiceCatalog;
pub use invoker::ServiceInvoker;
