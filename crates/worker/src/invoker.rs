//! 基于reqwest的CDS服务调用器

use std::time::{Duration, Instant};

use async_trait::async_trait;
use proxy_core::{CallOutcome, CdsRequest, ProxyError, ProxyResult, ServiceDefinition, ServiceInvoker};
use reqwest::header::ACCEPT;
use tracing::{debug, warn};

/// 通过HTTP调用CDS服务
///
/// 每个服务的调用地址为 `{endpoint}/{service.id}`，请求体为JSON编码的 [`CdsRequest`]。
#[derive(Debug, Clone)]
pub struct HttpServiceInvoker {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpServiceInvoker {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> ProxyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProxyError::Network(format!("创建HTTP客户端失败: {e}")))?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self { client, endpoint }
    }

    pub fn service_url(&self, service_id: &str) -> String {
        format!("{}/{}", self.endpoint, service_id)
    }
}

#[async_trait]
impl ServiceInvoker for HttpServiceInvoker {
    async fn invoke(&self, service: &ServiceDefinition, request: &CdsRequest) -> CallOutcome {
        let url = self.service_url(&service.id);
        let start = Instant::now();

        let response = match self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(service_id = %service.id, %url, "调用CDS服务出错: {e}");
                return CallOutcome::failed(e.to_string());
            }
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => {
                debug!(
                    service_id = %service.id,
                    status,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "CDS服务返回: {body}"
                );
                CallOutcome::response(status, body)
            }
            Err(e) => CallOutcome::failed(format!("读取响应体失败: {e}")),
        }
    }
}
