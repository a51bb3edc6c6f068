use async_trait::async_trait;
use proxy_core::{CatalogDocument, ProxyResult, ServiceCatalog, ServiceDefinition};

/// 固定服务列表，来自配置文件或测试
#[derive(Debug, Clone, Default)]
pub struct StaticServiceCatalog {
    document: CatalogDocument,
}

impl StaticServiceCatalog {
    pub fn new(services: Vec<ServiceDefinition>) -> Self {
        Self {
            document: CatalogDocument { services },
        }
    }

    pub fn services(&self) -> &[ServiceDefinition] {
        &self.document.services
    }
}

#[async_trait]
impl ServiceCatalog for StaticServiceCatalog {
    async fn services_for_hook(&self, hook: &str) -> ProxyResult<Vec<ServiceDefinition>> {
        Ok(self.document.services_for_hook(hook))
    }

    async fn service(&self, id: &str) -> ProxyResult<Option<ServiceDefinition>> {
        Ok(self.document.service(id).cloned())
    }
}
