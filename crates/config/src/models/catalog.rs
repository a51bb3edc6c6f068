use crate::validation::{ConfigValidator, ValidationUtils};
use proxy_core::ServiceDefinition;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// CDS Hooks discovery 端点；服务调用地址为 `{endpoint}/{service_id}`
    pub cds_hooks_endpoint: String,
    pub fetch_timeout_seconds: u64,
    /// 内联服务列表，非空时使用静态目录而不访问discovery端点
    pub services: Vec<ServiceDefinition>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            cds_hooks_endpoint: "http://localhost:8090/cds-services".to_string(),
            fetch_timeout_seconds: 30,
            services: Vec::new(),
        }
    }
}

impl CatalogConfig {
    pub fn is_static(&self) -> bool {
        !self.services.is_empty()
    }
}

impl ConfigValidator for CatalogConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_http_url(&self.cds_hooks_endpoint, "catalog.cds_hooks_endpoint")?;
        ValidationUtils::validate_timeout_seconds(
            self.fetch_timeout_seconds,
            "catalog.fetch_timeout_seconds",
        )?;

        let mut seen = std::collections::HashSet::new();
        for service in &self.services {
            ValidationUtils::validate_not_empty(&service.id, "catalog.services.id")?;
            ValidationUtils::validate_not_empty(&service.hook, "catalog.services.hook")?;
            if !seen.insert(service.id.as_str()) {
                return Err(crate::ConfigError::Validation(format!(
                    "Duplicate service id in catalog.services: {}",
                    service.id
                )));
            }
        }
        Ok(())
    }
}
