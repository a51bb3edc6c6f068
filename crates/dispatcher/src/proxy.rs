//! 分发代理门面
//!
//! 组合注册表、服务目录和执行端，提供转发与三种轮询操作。

use std::sync::Arc;

use metrics::counter;
use proxy_core::{
    CallOutcome, CdsRequest, InstanceHandle, ProxyResult, ServiceCatalog, ServiceDefinition,
    TriggerRequest,
};
use tracing::{debug, info, warn};

use crate::batch::{Batch, Completion};
use crate::dispatch::{CallDispatcher, DispatchJob};
use crate::registry::BatchRegistry;

/// 代理选项
#[derive(Debug, Clone)]
pub struct ProxyOptions {
    /// 触发请求未带 `fhir_endpoint` 时使用
    pub default_fhir_endpoint: Option<String>,
    pub fhir_version: String,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            default_fhir_endpoint: None,
            fhir_version: "R4".to_string(),
        }
    }
}

/// `next` 轮询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextResult {
    /// 批次不存在
    UnknownBatch,
    /// 批次已排空并被移除
    Drained,
    /// 下一个可取的调用
    Ready(InstanceHandle),
    /// 暂无完成的调用，稍后再轮询
    NotReady,
}

pub struct HookProxy {
    registry: Arc<BatchRegistry>,
    catalog: Arc<dyn ServiceCatalog>,
    dispatcher: Arc<dyn CallDispatcher>,
    options: ProxyOptions,
}

impl HookProxy {
    pub fn new(
        registry: Arc<BatchRegistry>,
        catalog: Arc<dyn ServiceCatalog>,
        dispatcher: Arc<dyn CallDispatcher>,
        options: ProxyOptions,
    ) -> Self {
        Self {
            registry,
            catalog,
            dispatcher,
            options,
        }
    }

    pub fn registry(&self) -> &Arc<BatchRegistry> {
        &self.registry
    }

    /// 创建批次并向所有注册到该hook的服务分发调用
    ///
    /// 先解析服务目录并登记全部条目，再把批次放入注册表，轮询方不会看到空批次。
    /// 返回批次ID；没有任何存活调用（无匹配服务或全部已失败）时返回 `None`，
    /// 此时批次不会留在注册表中。
    pub async fn forward(&self, mut request: TriggerRequest) -> ProxyResult<Option<String>> {
        if request.fhir_endpoint.is_none() {
            request.fhir_endpoint = self.options.default_fhir_endpoint.clone();
        }
        let batch = Batch::from_trigger(request)?;

        let services = match self.catalog.services_for_hook(batch.hook()).await {
            Ok(services) => services,
            Err(e) => {
                warn!(batch_id = %batch.id(), hook = %batch.hook(), "解析服务目录失败: {e}");
                return Err(e);
            }
        };
        let service_count = services.len();
        if services.is_empty() {
            info!(batch_id = %batch.id(), hook = %batch.hook(), "没有匹配的服务");
            return Ok(None);
        }

        let calls: Vec<(InstanceHandle, ServiceDefinition)> = services
            .into_iter()
            .map(|service| (batch.add_entry(&service.id), service))
            .collect();
        let batch = self.registry.register(batch)?;
        counter!("cds_proxy_batches_submitted_total").increment(1);

        for (handle, service) in calls {
            self.dispatch_call(&batch, handle, service);
        }

        if batch.is_drained() {
            self.registry.remove_batch(&batch);
            info!(
                batch_id = %batch.id(),
                hook = %batch.hook(),
                service_count,
                "没有可轮询的调用"
            );
            return Ok(None);
        }

        info!(
            batch_id = %batch.id(),
            hook = %batch.hook(),
            service_count,
            "批次已分发"
        );
        Ok(Some(batch.id().to_string()))
    }

    /// 提交已登记条目的调用，被拒绝时条目记为失败
    fn dispatch_call(&self, batch: &Arc<Batch>, handle: InstanceHandle, service: ServiceDefinition) {
        let request = CdsRequest::new(
            service.hook.clone(),
            &handle,
            batch.context().clone(),
            batch.fhir_endpoint().map(|url| url.to_string()),
            self.options.fhir_version.clone(),
        );
        debug!(
            batch_id = %batch.id(),
            service_id = %service.id,
            hook_instance = %handle.hook_instance,
            "提交CDS服务调用"
        );
        counter!("cds_proxy_calls_dispatched_total").increment(1);

        let job = DispatchJob {
            batch: Arc::clone(batch),
            handle,
            service,
            request,
        };
        if let Err(rejected) = self.dispatcher.submit(job) {
            counter!("cds_proxy_calls_rejected_total").increment(1);
            warn!(
                batch_id = %batch.id(),
                service_id = %rejected.job.service.id,
                "调用未被执行端接纳: {}",
                rejected.reason
            );
            let job = rejected.job;
            record_completion(
                job.batch
                    .on_complete(&job.handle.hook_instance, CallOutcome::failed(rejected.reason)),
            );
        }
    }

    /// 取下一个已完成调用的句柄；批次已排空时移除批次
    pub fn next(&self, batch_id: &str) -> NextResult {
        let Some(batch) = self.registry.get(batch_id) else {
            return NextResult::UnknownBatch;
        };
        if self.registry.remove_drained(&batch) {
            return NextResult::Drained;
        }
        match batch.next_ready() {
            Some(handle) => NextResult::Ready(handle),
            None => NextResult::NotReady,
        }
    }

    /// 取出已出队调用的响应，最多成功一次
    pub fn response(&self, batch_id: &str, hook_instance: &str) -> Option<String> {
        self.registry.get(batch_id)?.fetch_response(hook_instance)
    }

    /// 中止批次，返回批次是否存在
    pub fn abort(&self, batch_id: &str) -> bool {
        self.registry.abort(batch_id)
    }

    /// 当前存活批次数量
    pub fn live_batches(&self) -> usize {
        self.registry.len()
    }
}

/// 记录调用完成指标
pub fn record_completion(completion: Completion) -> Completion {
    match &completion {
        Completion::Completed => counter!("cds_proxy_calls_completed_total").increment(1),
        Completion::Failed(_) => counter!("cds_proxy_calls_failed_total").increment(1),
        Completion::Ignored => counter!("cds_proxy_calls_ignored_total").increment(1),
    }
    completion
}
