use async_trait::async_trait;

use crate::models::{CallOutcome, CdsRequest, ServiceDefinition};

/// 后端服务调用器
///
/// 实现不得返回错误或panic，所有失败都折算为 [`CallOutcome::Failed`]。
#[async_trait]
pub trait ServiceInvoker: Send + Sync {
    async fn invoke(&self, service: &ServiceDefinition, request: &CdsRequest) -> CallOutcome;
}
