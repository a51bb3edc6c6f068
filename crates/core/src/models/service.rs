use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 后端决策服务定义（CDS Hooks discovery 文档中的一项）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub id: String,
    pub hook: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub prefetch: HashMap<String, String>,
}

impl ServiceDefinition {
    pub fn new(id: impl Into<String>, hook: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            hook: hook.into(),
            title: None,
            description: None,
            prefetch: HashMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Discovery 端点返回的服务目录文档
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub services: Vec<ServiceDefinition>,
}

impl CatalogDocument {
    pub fn service(&self, id: &str) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn services_for_hook(&self, hook: &str) -> Vec<ServiceDefinition> {
        self.services
            .iter()
            .filter(|s| s.hook == hook)
            .cloned()
            .collect()
    }
}
