//! # Proxy Worker
//!
//! 出站CDS服务调用的执行端：有界工作池 [`DispatchExecutor`] 与HTTP调用器 [`HttpServiceInvoker`]。

pub mod executor;
pub mod invoker;

pub use executor::DispatchExecutor;
pub use invoker::HttpServiceInvoker;
