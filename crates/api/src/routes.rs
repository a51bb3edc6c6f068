use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use proxy_dispatcher::HookProxy;

use crate::handlers::{
    assets::static_asset,
    health::health_check,
    metrics::render_metrics,
    proxy::{abort_batch, fetch_response, forward, next_instance},
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<HookProxy>,
    pub metrics: Option<PrometheusHandle>,
    pub static_dir: Option<PathBuf>,
}

/// 路由选项
#[derive(Debug, Clone)]
pub struct RouteOptions {
    pub metrics_endpoint: String,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            metrics_endpoint: "/metrics".to_string(),
        }
    }
}

/// 创建API路由
pub fn create_routes(state: AppState, options: &RouteOptions) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_check))
        // 轮询协议
        .route("/forward", post(forward))
        .route("/next/{batch_id}", get(next_instance))
        .route("/response/{batch_id}/{hook_instance}", get(fetch_response))
        .route("/abort/{batch_id}", get(abort_batch));

    if state.metrics.is_some() {
        router = router.route(&options.metrics_endpoint, get(render_metrics));
    }
    if state.static_dir.is_some() {
        router = router.route("/static/{*path}", get(static_asset));
    }

    router.with_state(state)
}
