use thiserror::Error;

/// 代理错误类型定义
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("请求中未指定hook类型")]
    MissingHook,

    #[error("无效的请求参数: {0}")]
    InvalidParameter(String),

    #[error("批次ID已存在: {id}")]
    BatchConflict { id: String },

    #[error("批次未找到: {id}")]
    BatchNotFound { id: String },

    #[error("服务目录错误: {0}")]
    Catalog(String),

    #[error("网络错误: {0}")]
    Network(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("执行器不可用")]
    ExecutorUnavailable,

    #[error("内部错误: {0}")]
    Internal(String),
}

impl ProxyError {
    /// 是否属于请求校验失败（整个批次被拒绝）
    pub fn is_validation(&self) -> bool {
        matches!(self, ProxyError::MissingHook | ProxyError::InvalidParameter(_))
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for ProxyError {
    fn from(err: url::ParseError) -> Self {
        ProxyError::InvalidParameter(err.to_string())
    }
}
