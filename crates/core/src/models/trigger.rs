//! 入站触发请求
//!
//! `/forward` 表单字段被拆分为三部分：控制字段（`hook`、`handle`、`fhir_endpoint`）、
//! 识别的上下文字段（[`HookContext`]）以及其余未识别字段（`parameters`）。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ProxyError, ProxyResult};

/// 转发给后端服务的hook上下文
///
/// 只有这里列出的字段会进入出站请求的 `context`，缺省字段不会序列化。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookContext {
    /// 当前查看的患者 (`patientId`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    /// 触发hook的用户/临床人员 (`userId`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// 正在选择或签署的医嘱 (`orderId`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// 当前就诊 (`encounterId`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<String>,
}

impl HookContext {
    /// 尝试将表单字段识别为上下文字段，未识别时原样返回值
    fn accept(&mut self, key: &str, value: String) -> Option<String> {
        let slot = match key {
            "patientId" => &mut self.patient_id,
            "userId" => &mut self.user_id,
            "orderId" => &mut self.order_id,
            "encounterId" => &mut self.encounter_id,
            _ => return Some(value),
        };
        if slot.is_none() {
            *slot = Some(value);
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.patient_id.is_none()
            && self.user_id.is_none()
            && self.order_id.is_none()
            && self.encounter_id.is_none()
    }
}

/// 原始触发请求（尚未校验）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerRequest {
    pub hook: Option<String>,
    /// 调用方指定的批次ID
    pub handle: Option<String>,
    pub fhir_endpoint: Option<String>,
    pub context: HookContext,
    pub parameters: BTreeMap<String, String>,
}

impl TriggerRequest {
    pub fn new(hook: impl Into<String>) -> Self {
        Self {
            hook: Some(hook.into()),
            ..Self::default()
        }
    }

    /// 从表单键值对构建，同名字段只取第一个值，空值视为缺省
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut request = Self::default();
        for (key, value) in pairs {
            let key = key.into();
            let value = value.into();
            if value.trim().is_empty() {
                continue;
            }
            let slot = match key.as_str() {
                "hook" => &mut request.hook,
                "handle" => &mut request.handle,
                "fhir_endpoint" => &mut request.fhir_endpoint,
                _ => {
                    if let Some(value) = request.context.accept(&key, value) {
                        request.parameters.entry(key).or_insert(value);
                    }
                    continue;
                }
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        request
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn with_patient(mut self, patient_id: impl Into<String>) -> Self {
        self.context.patient_id = Some(patient_id.into());
        self
    }

    pub fn with_fhir_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.fhir_endpoint = Some(endpoint.into());
        self
    }

    /// 返回hook类型，缺失时报校验错误
    pub fn require_hook(&self) -> ProxyResult<&str> {
        match self.hook.as_deref().map(str::trim) {
            Some(hook) if !hook.is_empty() => Ok(hook),
            _ => Err(ProxyError::MissingHook),
        }
    }
}
