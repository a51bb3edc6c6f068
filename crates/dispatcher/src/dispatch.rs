//! 出站调用的提交接口
//!
//! 批次在提交前已登记好条目，执行端只需在调用结束后把结果交回
//! [`Batch::on_complete`]。

use std::sync::Arc;

use proxy_core::{CdsRequest, InstanceHandle, ServiceDefinition};

use crate::batch::Batch;

/// 一次待执行的后端调用
#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub batch: Arc<Batch>,
    pub handle: InstanceHandle,
    pub service: ServiceDefinition,
    pub request: CdsRequest,
}

/// 执行端拒绝接纳的调用
#[derive(Debug)]
pub struct DispatchRejected {
    pub job: Box<DispatchJob>,
    pub reason: String,
}

/// 出站调用执行端
///
/// `submit` 不得阻塞调用线程；无法接纳时返回原调用，由调用方记为失败。
pub trait CallDispatcher: Send + Sync {
    fn submit(&self, job: DispatchJob) -> Result<(), DispatchRejected>;
}
