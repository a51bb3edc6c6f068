use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// 工作任务数量（并发出站调用上限）
    pub max_workers: usize,
    /// 待执行调用队列容量，队列满时新调用直接记为失败
    pub queue_capacity: usize,
    pub request_timeout_seconds: u64,
    /// 触发请求未携带 `fhir_endpoint` 时使用的FHIR服务地址
    pub default_fhir_endpoint: Option<String>,
    pub fhir_version: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            queue_capacity: 1000,
            request_timeout_seconds: 30,
            default_fhir_endpoint: None,
            fhir_version: "R4".to_string(),
        }
    }
}

impl ConfigValidator for DispatchConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_count(self.max_workers, "dispatch.max_workers", 1000)?;
        ValidationUtils::validate_count(self.queue_capacity, "dispatch.queue_capacity", 100_000)?;
        ValidationUtils::validate_timeout_seconds(
            self.request_timeout_seconds,
            "dispatch.request_timeout_seconds",
        )?;
        if let Some(endpoint) = &self.default_fhir_endpoint {
            ValidationUtils::validate_http_url(endpoint, "dispatch.default_fhir_endpoint")?;
        }

        let valid_versions = ["DSTU2", "STU3", "R4", "R5"];
        if !valid_versions.contains(&self.fhir_version.as_str()) {
            return Err(crate::ConfigError::Validation(format!(
                "Invalid FHIR version: {}. Valid options: {:?}",
                self.fhir_version, valid_versions
            )));
        }
        Ok(())
    }
}
