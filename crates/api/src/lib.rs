//! # Proxy API
//!
//! CDS Hooks分发代理的HTTP接口，基于Axum构建。
//!
//! ## 轮询协议
//!
//! - `POST /forward` - 表单提交触发请求，返回批次ID（纯文本），无可轮询调用时返回空
//! - `GET /next/{batch_id}` - 下一个就绪的调用句柄 `{"hookId","hookInstance"}`；
//!   暂无就绪时返回 `{}`，批次已取完返回 `204`，批次不存在返回 `404`
//! - `GET /response/{batch_id}/{hook_instance}` - 取出已出队调用的响应，只能成功一次
//! - `GET /abort/{batch_id}` - 中止批次，批次不存在返回 `304`
//!
//! ## 运维端点
//!
//! - `GET /health` - 健康检查与存活批次数
//! - `GET /metrics` - Prometheus指标（启用时）
//! - `GET /static/{*path}` - 静态资源（配置了静态目录时）
//!
//! ```bash
//! batch=$(curl -s -X POST http://localhost:8080/forward \
//!   -d hook=patient-view -d patientId=1288992)
//! curl -s http://localhost:8080/next/$batch
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use std::time::Duration;

use axum::Router;
use tower::ServiceBuilder;

use middleware::{cors_layer, request_logging, timeout_layer, trace_layer};
pub use routes::{create_routes, AppState, RouteOptions};

/// HTTP层选项
#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub routes: RouteOptions,
    pub cors_enabled: bool,
    pub request_timeout: Duration,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            routes: RouteOptions::default(),
            cors_enabled: true,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// 创建带中间件的完整应用
pub fn create_app(state: AppState, options: &ApiOptions) -> Router {
    let router = create_routes(state, &options.routes).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(timeout_layer(options.request_timeout))
            .layer(axum::middleware::from_fn(request_logging)),
    );

    if options.cors_enabled {
        router.layer(cors_layer())
    } else {
        router
    }
}
