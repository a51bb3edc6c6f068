use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use proxy_core::ProxyError;
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("未找到资源")]
    NotFound,

    #[error("内部服务器错误: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Proxy(e) => match e {
                ProxyError::MissingHook | ProxyError::InvalidParameter(_) => {
                    StatusCode::BAD_REQUEST
                }
                ProxyError::BatchConflict { .. } => StatusCode::CONFLICT,
                ProxyError::BatchNotFound { .. } => StatusCode::NOT_FOUND,
                ProxyError::Catalog(_) | ProxyError::Network(_) => StatusCode::BAD_GATEWAY,
                ProxyError::ExecutorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                ProxyError::Serialization(_)
                | ProxyError::Configuration(_)
                | ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Proxy(e) => match e {
                ProxyError::MissingHook => "MISSING_HOOK",
                ProxyError::InvalidParameter(_) => "INVALID_PARAMETER",
                ProxyError::BatchConflict { .. } => "BATCH_CONFLICT",
                ProxyError::BatchNotFound { .. } => "BATCH_NOT_FOUND",
                ProxyError::Catalog(_) => "CATALOG_UNAVAILABLE",
                ProxyError::Network(_) => "NETWORK_ERROR",
                ProxyError::ExecutorUnavailable => "EXECUTOR_UNAVAILABLE",
                ProxyError::Serialization(_) => "SERIALIZATION_ERROR",
                ProxyError::Configuration(_) => "CONFIGURATION_ERROR",
                ProxyError::Internal(_) => "INTERNAL_ERROR",
            },
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.error_code(), "请求处理失败: {self}");
        }

        let body = Json(json!({
            "success": false,
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "status": status.as_u16(),
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
