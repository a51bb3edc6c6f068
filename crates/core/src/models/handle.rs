use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 一次出站调用的标识
///
/// `hook_instance` 在创建时随机生成，是后端服务和轮询方都能看到的唯一标识。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceHandle {
    /// 服务ID
    pub hook_id: String,
    /// 调用实例ID
    pub hook_instance: String,
}

impl InstanceHandle {
    /// 为指定服务分配新的调用实例ID
    pub fn generate(service_id: impl Into<String>) -> Self {
        Self {
            hook_id: service_id.into(),
            hook_instance: Uuid::new_v4().to_string(),
        }
    }

    pub fn service_id(&self) -> &str {
        &self.hook_id
    }

    pub fn call_instance_id(&self) -> &str {
        &self.hook_instance
    }
}
