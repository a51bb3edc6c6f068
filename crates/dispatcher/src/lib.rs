//! # Proxy Dispatcher
//!
//! 批次分发引擎：一次入站触发 → 一个批次 → N 个并发后端调用，
//! 调用方按自己的节奏轮询每个结果。
//!
//! - [`batch`]: 调用条目状态机与批次上的轮询操作
//! - [`registry`]: 进程内批次注册表
//! - [`proxy`]: 转发与轮询协议门面 [`HookProxy`]
//! - [`dispatch`]: 出站调用提交接口 [`CallDispatcher`]
//! - [`sweeper`]: 闲置批次回收

pub mod batch;
pub mod dispatch;
pub mod proxy;
pub mod registry;
pub mod sweeper;

pub use batch::{Batch, Completion, EntryState};
pub use dispatch::{CallDispatcher, DispatchJob, DispatchRejected};
pub use proxy::{record_completion, HookProxy, NextResult, ProxyOptions};
pub use registry::BatchRegistry;
pub use sweeper::RetentionSweeper;
