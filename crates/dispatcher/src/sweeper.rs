use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::registry::BatchRegistry;

/// 闲置批次回收任务
///
/// 定期中止并移除长时间无活动（未轮询、未中止）的批次。
pub struct RetentionSweeper {
    registry: Arc<BatchRegistry>,
    idle_timeout: Duration,
    sweep_interval: Duration,
}

impl RetentionSweeper {
    pub fn new(registry: Arc<BatchRegistry>, idle_timeout: Duration, sweep_interval: Duration) -> Self {
        Self {
            registry,
            idle_timeout,
            sweep_interval,
        }
    }

    /// 执行一次回收，返回被回收的批次ID
    pub fn sweep_once(&self) -> Vec<String> {
        let evicted = self.registry.evict_idle(self.idle_timeout);
        if !evicted.is_empty() {
            counter!("cds_proxy_batches_evicted_total").increment(evicted.len() as u64);
            info!(
                count = evicted.len(),
                idle_timeout_seconds = self.idle_timeout.as_secs(),
                "回收闲置批次: {:?}",
                evicted
            );
        }
        evicted
    }

    /// 循环回收直到收到关闭信号
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            idle_timeout_seconds = self.idle_timeout.as_secs(),
            sweep_interval_seconds = self.sweep_interval.as_secs(),
            "启动闲置批次回收任务"
        );
        let mut ticker = interval(self.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 第一次tick立即触发，跳过
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.sweep_once();
                    debug!(evicted = evicted.len(), live = self.registry.len(), "回收检查完成");
                }
                _ = shutdown_rx.recv() => {
                    info!("闲置批次回收任务收到关闭信号");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy_core::TriggerRequest;

    #[test]
    fn test_sweep_once_respects_timeout() {
        let registry = Arc::new(BatchRegistry::new());
        let batch = registry.submit(TriggerRequest::new("patient-view")).unwrap();
        batch.add_entry("greeting");

        let lenient = RetentionSweeper::new(
            Arc::clone(&registry),
            Duration::from_secs(3600),
            Duration::from_secs(60),
        );
        assert!(lenient.sweep_once().is_empty());
        assert_eq!(registry.len(), 1);

        let strict = RetentionSweeper::new(Arc::clone(&registry), Duration::ZERO, Duration::from_secs(60));
        assert_eq!(strict.sweep_once(), vec![batch.id().to_string()]);
        assert!(registry.is_empty());
        assert!(batch.is_aborted());
    }

    #[tokio::test]
    async fn test_run_evicts_and_stops_on_shutdown() {
        let registry = Arc::new(BatchRegistry::new());
        let batch = registry.submit(TriggerRequest::new("patient-view")).unwrap();
        batch.add_entry("greeting");

        let sweeper = RetentionSweeper::new(
            Arc::clone(&registry),
            Duration::from_millis(10),
            Duration::from_millis(20),
        );
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(sweeper.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(registry.is_empty());
        assert!(batch.is_aborted());

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
