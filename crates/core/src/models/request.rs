use serde::{Deserialize, Serialize};

use super::{HookContext, InstanceHandle};

/// 发往后端决策服务的CDS Hooks请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdsRequest {
    pub hook: String,
    pub hook_instance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fhir_server: Option<String>,
    pub fhir_version: String,
    pub context: HookContext,
}

impl CdsRequest {
    /// 为一次已登记的调用构建请求
    pub fn new(
        hook: impl Into<String>,
        handle: &InstanceHandle,
        context: HookContext,
        fhir_server: Option<String>,
        fhir_version: impl Into<String>,
    ) -> Self {
        Self {
            hook: hook.into(),
            hook_instance: handle.hook_instance.clone(),
            fhir_server,
            fhir_version: fhir_version.into(),
            context,
        }
    }
}
