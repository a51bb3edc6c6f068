//! 全局批次注册表
//!
//! 批次ID到批次的映射。插入是唯一需要互斥的写操作；每个批次有自己的锁，
//! 轮询不同批次之间互不阻塞。

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};
use std::time::Duration;

use metrics::gauge;
use proxy_core::{ProxyError, ProxyResult, TriggerRequest};
use tracing::{debug, info};

use crate::batch::Batch;

#[derive(Debug, Default)]
pub struct BatchRegistry {
    batches: RwLock<HashMap<String, Arc<Batch>>>,
}

impl BatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Batch>>> {
        self.batches.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Batch>>> {
        self.batches.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 创建并登记新批次
    ///
    /// 校验失败或ID已被占用时不登记任何批次。
    pub fn submit(&self, request: TriggerRequest) -> ProxyResult<Arc<Batch>> {
        self.register(Batch::from_trigger(request)?)
    }

    /// 原子地登记批次，ID冲突时返回 [`ProxyError::BatchConflict`]
    pub fn register(&self, batch: Batch) -> ProxyResult<Arc<Batch>> {
        let mut batches = self.write();
        if batches.contains_key(batch.id()) {
            return Err(ProxyError::BatchConflict {
                id: batch.id().to_string(),
            });
        }
        let batch = Arc::new(batch);
        batches.insert(batch.id().to_string(), Arc::clone(&batch));
        gauge!("cds_proxy_live_batches").set(batches.len() as f64);
        debug!(batch_id = %batch.id(), hook = %batch.hook(), "登记批次");
        Ok(batch)
    }

    pub fn get(&self, batch_id: &str) -> Option<Arc<Batch>> {
        self.read().get(batch_id).cloned()
    }

    /// 直接移除批次（不中止）
    pub fn remove(&self, batch_id: &str) -> Option<Arc<Batch>> {
        let mut batches = self.write();
        let removed = batches.remove(batch_id);
        gauge!("cds_proxy_live_batches").set(batches.len() as f64);
        removed
    }

    /// 仅当注册表中该ID仍指向同一个批次时移除
    pub fn remove_batch(&self, batch: &Arc<Batch>) -> bool {
        let mut batches = self.write();
        let same = batches
            .get(batch.id())
            .is_some_and(|current| Arc::ptr_eq(current, batch));
        if same {
            batches.remove(batch.id());
            gauge!("cds_proxy_live_batches").set(batches.len() as f64);
        }
        same
    }

    /// 批次已排空时将其移除，返回是否已排空
    pub fn remove_if_drained(&self, batch_id: &str) -> bool {
        self.get(batch_id)
            .is_some_and(|batch| self.remove_drained(&batch))
    }

    /// 同 [`remove_if_drained`](Self::remove_if_drained)，作用于已取出的批次
    ///
    /// [`HookProxy`](crate::HookProxy) 在登记前加好全部条目，排空后不会回退，检查不需要持有写锁。
    pub fn remove_drained(&self, batch: &Arc<Batch>) -> bool {
        if !batch.is_drained() {
            return false;
        }
        if self.remove_batch(batch) {
            debug!(batch_id = %batch.id(), "批次已排空，移除");
        }
        true
    }

    /// 移除并中止批次，返回批次是否存在
    pub fn abort(&self, batch_id: &str) -> bool {
        match self.remove(batch_id) {
            Some(batch) => {
                batch.abort();
                info!(batch_id, "批次已中止");
                true
            }
            None => false,
        }
    }

    /// 移除并中止闲置时间不少于 `idle_timeout` 的批次，返回被回收的批次ID
    ///
    /// 注册表本身从不按时间淘汰批次，这里只由回收任务显式调用。
    pub fn evict_idle(&self, idle_timeout: Duration) -> Vec<String> {
        let candidates: Vec<Arc<Batch>> = self.read().values().cloned().collect();

        candidates
            .into_iter()
            .filter(|batch| batch.idle_for() >= idle_timeout)
            .filter(|batch| self.remove_batch(batch))
            .map(|batch| {
                batch.abort();
                batch.id().to_string()
            })
            .collect()
    }

    pub fn contains(&self, batch_id: &str) -> bool {
        self.read().contains_key(batch_id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn batch_ids(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }
}
