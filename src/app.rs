use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use proxy_api::{create_app, ApiOptions, AppState, RouteOptions};
use proxy_config::{AppConfig, CatalogConfig};
use proxy_core::{ServiceCatalog, ServiceInvoker};
use proxy_dispatcher::{BatchRegistry, HookProxy, ProxyOptions, RetentionSweeper};
use proxy_infrastructure::{HttpServiceCatalog, StaticServiceCatalog};
use proxy_worker::{DispatchExecutor, HttpServiceInvoker};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::shutdown::ShutdownManager;

/// 主应用程序
pub struct Application {
    config: AppConfig,
    registry: Arc<BatchRegistry>,
    proxy: Arc<HookProxy>,
    executor: Arc<DispatchExecutor>,
    metrics: Option<PrometheusHandle>,
}

impl Application {
    /// 组装应用组件，需要在tokio运行时内调用
    pub fn new(config: AppConfig, metrics: Option<PrometheusHandle>) -> Result<Self> {
        let catalog = create_catalog(&config.catalog)?;

        let invoker: Arc<dyn ServiceInvoker> = Arc::new(
            HttpServiceInvoker::new(
                config.catalog.cds_hooks_endpoint.clone(),
                Duration::from_secs(config.dispatch.request_timeout_seconds),
            )
            .context("创建CDS服务调用器失败")?,
        );

        let executor = Arc::new(
            DispatchExecutor::start(
                invoker,
                config.dispatch.max_workers,
                config.dispatch.queue_capacity,
            )
            .context("启动调用工作池失败")?,
        );

        let registry = Arc::new(BatchRegistry::new());
        let proxy = Arc::new(HookProxy::new(
            Arc::clone(&registry),
            catalog,
            executor.clone(),
            ProxyOptions {
                default_fhir_endpoint: config.dispatch.default_fhir_endpoint.clone(),
                fhir_version: config.dispatch.fhir_version.clone(),
            },
        ));

        Ok(Self {
            config,
            registry,
            proxy,
            executor,
            metrics,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn proxy(&self) -> &Arc<HookProxy> {
        &self.proxy
    }

    /// 带中间件的HTTP路由
    pub fn router(&self) -> Router {
        let state = AppState {
            proxy: Arc::clone(&self.proxy),
            metrics: self.metrics.clone(),
            static_dir: self.config.server.static_dir.as_ref().map(PathBuf::from),
        };
        let options = ApiOptions {
            routes: RouteOptions {
                metrics_endpoint: self.config.observability.metrics_endpoint.clone(),
            },
            cors_enabled: self.config.server.cors_enabled,
            request_timeout: Duration::from_secs(self.config.server.request_timeout_seconds),
        };
        create_app(state, &options)
    }

    /// 绑定配置中的地址并运行，直到收到关闭信号
    pub async fn run(&self, shutdown: ShutdownManager) -> Result<()> {
        let bind_address = &self.config.server.bind_address;
        let listener = TcpListener::bind(bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {bind_address}"))?;
        self.serve(listener, shutdown).await
    }

    /// 在给定监听器上运行HTTP服务和后台任务
    pub async fn serve(&self, listener: TcpListener, shutdown: ShutdownManager) -> Result<()> {
        let local_addr = listener.local_addr().context("读取监听地址失败")?;

        let sweeper_handle = if self.config.retention.enabled {
            let sweeper = RetentionSweeper::new(
                Arc::clone(&self.registry),
                self.config.retention.idle_timeout(),
                self.config.retention.sweep_interval(),
            );
            let shutdown_rx = shutdown.subscribe().await;
            Some(tokio::spawn(sweeper.run(shutdown_rx)))
        } else {
            info!("闲置批次回收已禁用");
            None
        };

        info!("CDS Hooks代理启动在 http://{local_addr}");
        let shutdown_rx = shutdown.subscribe().await;
        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(wait_for(shutdown_rx))
            .await;
        if served.is_err() {
            // 让回收任务也退出
            shutdown.shutdown().await;
        }

        info!("HTTP服务已停止，等待进行中的调用完成");
        self.executor.shutdown().await;
        if let Some(handle) = sweeper_handle {
            if let Err(e) = handle.await {
                error!("回收任务异常退出: {e}");
            }
        }
        info!("存活批次: {}", self.proxy.live_batches());

        served.context("HTTP服务运行失败")
    }
}

async fn wait_for(mut shutdown_rx: broadcast::Receiver<()>) {
    let _ = shutdown_rx.recv().await;
}

/// 配置了内联服务列表时使用静态目录，否则从发现端点获取
pub fn create_catalog(config: &CatalogConfig) -> Result<Arc<dyn ServiceCatalog>> {
    if config.is_static() {
        info!(services = config.services.len(), "使用静态CDS服务目录");
        return Ok(Arc::new(StaticServiceCatalog::new(config.services.clone())));
    }

    info!(endpoint = %config.cds_hooks_endpoint, "使用CDS Hooks发现端点");
    let catalog = HttpServiceCatalog::new(
        config.cds_hooks_endpoint.clone(),
        Duration::from_secs(config.fetch_timeout_seconds),
    )
    .context("创建服务目录失败")?;
    Ok(Arc::new(catalog))
}
