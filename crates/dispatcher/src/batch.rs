//! 批次与调用条目状态机
//!
//! 每个调用条目的状态转换：
//!
//! ```text
//! PENDING   --(2xx 且响应体可解析)-->   COMPLETED
//! PENDING   --(非2xx / 传输或解析失败)--> ERROR    (终态，立即移除)
//! COMPLETED --(next_ready)-->           DEQUEUED
//! DEQUEUED  --(fetch_response)-->       HANDLED  (终态，立即移除)
//! ```
//!
//! 所有状态变更都在批次内部的同一把锁下完成，锁内不做任何I/O。

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use proxy_core::{CallOutcome, HookContext, InstanceHandle, ProxyError, ProxyResult, TriggerRequest};
use tracing::{debug, error, warn};
use url::Url;
use uuid::Uuid;

/// 调用条目状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    Pending,
    Completed,
    Error,
    Dequeued,
    Handled,
}

impl EntryState {
    pub fn is_terminal(self) -> bool {
        matches!(self, EntryState::Error | EntryState::Handled)
    }
}

/// `on_complete` 对批次产生的效果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// 条目进入 COMPLETED
    Completed,
    /// 条目进入 ERROR 并被移除
    Failed(String),
    /// 批次已中止或条目不存在，回调被丢弃
    Ignored,
}

#[derive(Debug)]
struct Entry {
    handle: InstanceHandle,
    state: EntryState,
    response: Option<String>,
}

impl Entry {
    fn new(handle: InstanceHandle) -> Self {
        Self {
            handle,
            state: EntryState::Pending,
            response: None,
        }
    }
}

#[derive(Debug)]
struct BatchState {
    entries: Vec<Entry>,
    aborted: bool,
    last_activity: Instant,
}

/// 一次入站触发对应的批次
#[derive(Debug)]
pub struct Batch {
    id: String,
    hook: String,
    context: HookContext,
    parameters: BTreeMap<String, String>,
    fhir_endpoint: Option<Url>,
    state: Mutex<BatchState>,
}

impl Batch {
    /// 从触发请求创建批次，缺少hook类型或FHIR地址非法时失败
    pub fn create(id: impl Into<String>, request: TriggerRequest) -> ProxyResult<Self> {
        let hook = request.require_hook()?.to_string();
        let fhir_endpoint = request
            .fhir_endpoint
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| ProxyError::InvalidParameter(format!("fhir_endpoint: {e}")))?;

        Ok(Self {
            id: id.into(),
            hook,
            context: request.context,
            parameters: request.parameters,
            fhir_endpoint,
            state: Mutex::new(BatchState {
                entries: Vec::new(),
                aborted: false,
                last_activity: Instant::now(),
            }),
        })
    }

    /// 以调用方的 `handle` 作为批次ID创建批次，未提供时生成UUID
    pub fn from_trigger(request: TriggerRequest) -> ProxyResult<Self> {
        let id = request
            .handle
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self::create(id, request)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn hook(&self) -> &str {
        &self.hook
    }

    pub fn context(&self) -> &HookContext {
        &self.context
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn fhir_endpoint(&self) -> Option<&Url> {
        self.fhir_endpoint.as_ref()
    }

    fn lock(&self) -> MutexGuard<'_, BatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 为一次出站调用登记新的 PENDING 条目
    ///
    /// 必须在真正发出调用之前执行。批次已中止时不再登记，但仍返回句柄，
    /// 对应的完成回调会被丢弃。
    pub fn add_entry(&self, service_id: &str) -> InstanceHandle {
        let handle = InstanceHandle::generate(service_id);
        let mut state = self.lock();
        if state.aborted {
            debug!(batch_id = %self.id, service_id, "批次已中止，跳过登记");
            return handle;
        }
        state.entries.push(Entry::new(handle.clone()));
        state.last_activity = Instant::now();
        handle
    }

    /// 处理一次调用结果
    ///
    /// 单个后端失败只移除该条目，不会影响批次中的其他调用。
    pub fn on_complete(&self, hook_instance: &str, outcome: CallOutcome) -> Completion {
        let mut state = self.lock();
        if state.aborted {
            return Completion::Ignored;
        }

        let Some(index) = state
            .entries
            .iter()
            .position(|e| e.handle.hook_instance == hook_instance && e.state == EntryState::Pending)
        else {
            return Completion::Ignored;
        };
        state.last_activity = Instant::now();

        let failure = match outcome {
            CallOutcome::Response { status, body } if status / 100 == 2 => {
                match serde_json::from_str::<serde_json::Value>(&body) {
                    Ok(_) => {
                        let entry = &mut state.entries[index];
                        debug!(
                            batch_id = %self.id,
                            service_id = %entry.handle.hook_id,
                            hook_instance,
                            "{body}"
                        );
                        entry.state = EntryState::Completed;
                        entry.response = Some(body);
                        return Completion::Completed;
                    }
                    Err(e) => format!("响应体解析失败: {e}"),
                }
            }
            CallOutcome::Response { status, .. } => format!("HTTP错误码 {status}"),
            CallOutcome::Failed(reason) => reason,
        };

        let mut entry = state.entries.remove(index);
        entry.state = EntryState::Error;
        error!(
            batch_id = %self.id,
            service_id = %entry.handle.hook_id,
            hook_instance,
            "调用CDS服务 {} 失败: {}",
            entry.handle.hook_id,
            failure
        );
        Completion::Failed(failure)
    }

    /// 按登记顺序返回第一个已完成条目的句柄，并将其标记为 DEQUEUED
    ///
    /// 排在前面但仍在等待的条目会被跳过；没有已完成条目时返回 `None`，不阻塞。
    pub fn next_ready(&self) -> Option<InstanceHandle> {
        let mut state = self.lock();
        state.last_activity = Instant::now();
        let entry = state
            .entries
            .iter_mut()
            .find(|e| e.state == EntryState::Completed)?;
        entry.state = EntryState::Dequeued;
        Some(entry.handle.clone())
    }

    /// 取出已出队条目的响应并移除该条目
    ///
    /// 只有处于 DEQUEUED 状态的条目可以被取出，同一响应最多交付一次。
    pub fn fetch_response(&self, hook_instance: &str) -> Option<String> {
        let mut state = self.lock();
        state.last_activity = Instant::now();
        let index = state
            .entries
            .iter()
            .position(|e| e.handle.hook_instance == hook_instance && e.state == EntryState::Dequeued)?;
        let mut entry = state.entries.remove(index);
        entry.state = EntryState::Handled;
        if entry.response.is_none() {
            warn!(batch_id = %self.id, hook_instance, "已出队条目缺少响应");
        }
        entry.response.take()
    }

    /// 没有任何存活条目时为真
    pub fn is_drained(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// 中止批次：清空条目，之后到达的完成回调全部丢弃
    ///
    /// 已发出的网络调用不会被取消。重复调用无副作用。
    pub fn abort(&self) {
        let mut state = self.lock();
        if !state.aborted {
            debug!(batch_id = %self.id, pending = state.entries.len(), "中止批次");
        }
        state.aborted = true;
        state.entries.clear();
    }

    pub fn is_aborted(&self) -> bool {
        self.lock().aborted
    }

    /// 存活条目数量
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_drained()
    }

    /// 查询条目当前状态，已移除的条目返回 `None`
    pub fn entry_state(&self, hook_instance: &str) -> Option<EntryState> {
        self.lock()
            .entries
            .iter()
            .find(|e| e.handle.hook_instance == hook_instance)
            .map(|e| e.state)
    }

    /// 距上一次活动（创建、登记、回调或轮询）的时长
    pub fn idle_for(&self) -> Duration {
        self.lock().last_activity.elapsed()
    }
}
