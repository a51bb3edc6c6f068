//! 出站调用工作池
//!
//! 固定数量的工作任务从有界队列中取调用执行。提交端使用 `try_send`，
//! 队列已满或工作池已关闭时立即拒绝，由调用方把对应条目记为失败。

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use proxy_core::{CallOutcome, ProxyError, ProxyResult, ServiceInvoker};
use proxy_dispatcher::{record_completion, CallDispatcher, Completion, DispatchJob, DispatchRejected};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type JobReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<DispatchJob>>>;

pub struct DispatchExecutor {
    sender: Mutex<Option<mpsc::Sender<DispatchJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    max_workers: usize,
    queue_capacity: usize,
}

impl DispatchExecutor {
    /// 启动工作池，必须在tokio运行时内调用
    pub fn start(
        invoker: Arc<dyn ServiceInvoker>,
        max_workers: usize,
        queue_capacity: usize,
    ) -> ProxyResult<Self> {
        if max_workers == 0 || queue_capacity == 0 {
            return Err(ProxyError::Configuration(format!(
                "工作池参数无效: max_workers={max_workers}, queue_capacity={queue_capacity}"
            )));
        }

        let (sender, receiver) = mpsc::channel(queue_capacity);
        let receiver: JobReceiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let workers = (0..max_workers)
            .map(|worker_index| {
                tokio::spawn(run_worker(
                    worker_index,
                    Arc::clone(&receiver),
                    Arc::clone(&invoker),
                ))
            })
            .collect();

        info!(max_workers, queue_capacity, "调用工作池已启动");
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            max_workers,
            queue_capacity,
        })
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// 队列中等待执行的调用数
    pub fn queued(&self) -> usize {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |sender| self.queue_capacity - sender.capacity())
    }

    pub fn is_shutdown(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// 关闭队列并等待工作任务执行完已接纳的调用
    pub async fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let workers: Vec<JoinHandle<()>> = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        info!(workers = workers.len(), "等待调用工作池退出");
        for worker in workers {
            if let Err(e) = worker.await {
                warn!("工作任务异常退出: {e}");
            }
        }
        info!("调用工作池已关闭");
    }
}

impl CallDispatcher for DispatchExecutor {
    fn submit(&self, job: DispatchJob) -> Result<(), DispatchRejected> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(sender) = sender else {
            return Err(DispatchRejected {
                job: Box::new(job),
                reason: ProxyError::ExecutorUnavailable.to_string(),
            });
        };

        match sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) => Err(DispatchRejected {
                job: Box::new(job),
                reason: format!("调用队列已满 (容量 {})", self.queue_capacity),
            }),
            Err(TrySendError::Closed(job)) => Err(DispatchRejected {
                job: Box::new(job),
                reason: ProxyError::ExecutorUnavailable.to_string(),
            }),
        }
    }
}

async fn run_worker(worker_index: usize, receiver: JobReceiver, invoker: Arc<dyn ServiceInvoker>) {
    debug!(worker_index, "工作任务启动");
    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(job) = job else {
            break;
        };

        let start = Instant::now();
        let outcome = invoke_isolated(&invoker, &job).await;
        let completion = record_completion(job.batch.on_complete(&job.handle.hook_instance, outcome));
        match &completion {
            Completion::Completed => debug!(
                worker_index,
                batch_id = %job.batch.id(),
                service_id = %job.service.id,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "CDS服务调用完成"
            ),
            Completion::Failed(_) => {}
            Completion::Ignored => debug!(
                worker_index,
                batch_id = %job.batch.id(),
                hook_instance = %job.handle.hook_instance,
                "批次已中止，丢弃迟到的结果"
            ),
        }
    }
    debug!(worker_index, "工作任务退出");
}

/// 在独立任务中执行调用，调用panic时记为失败，工作任务继续运行
async fn invoke_isolated(invoker: &Arc<dyn ServiceInvoker>, job: &DispatchJob) -> CallOutcome {
    let invoker = Arc::clone(invoker);
    let service = job.service.clone();
    let request = job.request.clone();
    match tokio::spawn(async move { invoker.invoke(&service, &request).await }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(
                batch_id = %job.batch.id(),
                service_id = %job.service.id,
                "CDS服务调用异常终止: {e}"
            );
            CallOutcome::failed(format!("调用异常终止: {e}"))
        }
    }
}
