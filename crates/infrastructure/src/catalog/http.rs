use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use proxy_core::{CatalogDocument, ProxyError, ProxyResult, ServiceCatalog, ServiceDefinition};
use reqwest::header::ACCEPT;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// 从CDS Hooks发现端点获取的服务目录
///
/// 首次使用时才发起请求，成功后在进程生命周期内不再刷新。并发的首次调用共享同一次获取；
/// 获取失败时缓存保持为空，下一次调用会重新获取。
#[derive(Debug)]
pub struct HttpServiceCatalog {
    client: reqwest::Client,
    endpoint: String,
    document: OnceCell<CatalogDocument>,
}

impl HttpServiceCatalog {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> ProxyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProxyError::Network(format!("创建HTTP客户端失败: {e}")))?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            document: OnceCell::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_loaded(&self) -> bool {
        self.document.initialized()
    }

    async fn document(&self) -> ProxyResult<&CatalogDocument> {
        self.document.get_or_try_init(|| self.fetch()).await
    }

    async fn fetch(&self) -> ProxyResult<CatalogDocument> {
        counter!("cds_proxy_catalog_fetches_total").increment(1);
        let response = self
            .client
            .get(&self.endpoint)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.fetch_failed(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.fetch_failed(format!("HTTP错误码 {}", status.as_u16())));
        }

        let body = response.text().await.map_err(|e| self.fetch_failed(e))?;
        let document: CatalogDocument =
            serde_json::from_str(&body).map_err(|e| self.fetch_failed(format!("解析失败: {e}")))?;
        info!(
            endpoint = %self.endpoint,
            services = document.services.len(),
            "已加载CDS服务目录"
        );
        Ok(document)
    }

    fn fetch_failed(&self, reason: impl std::fmt::Display) -> ProxyError {
        warn!(endpoint = %self.endpoint, "获取CDS服务目录失败: {reason}");
        ProxyError::Catalog(format!("{}: {reason}", self.endpoint))
    }
}

#[async_trait]
impl ServiceCatalog for HttpServiceCatalog {
    async fn services_for_hook(&self, hook: &str) -> ProxyResult<Vec<ServiceDefinition>> {
        Ok(self.document().await?.services_for_hook(hook))
    }

    async fn service(&self, id: &str) -> ProxyResult<Option<ServiceDefinition>> {
        Ok(self.document().await?.service(id).cloned())
    }
}
