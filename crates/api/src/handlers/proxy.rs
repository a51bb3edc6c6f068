//! 轮询协议处理器
//!
//! 批次或调用不存在是轮询中的常态，用无响应体的状态码表示，不走 [`ApiError`]。

use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use proxy_core::TriggerRequest;
use proxy_dispatcher::NextResult;
use serde_json::json;
use tracing::{debug, info};

use crate::{
    error::{ApiError, ApiResult},
    response::{plain_text, raw_json, status_only},
    routes::AppState,
};

/// `POST /forward`：创建批次并分发，返回批次ID；没有可轮询的调用时返回空文本
pub async fn forward(
    State(state): State<AppState>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> ApiResult<Response> {
    let Form(fields) = form.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = TriggerRequest::from_pairs(fields);
    let batch_id = state.proxy.forward(request).await?;
    Ok(plain_text(batch_id.unwrap_or_default()))
}

/// `GET /next/{batch_id}`
pub async fn next_instance(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Response {
    match state.proxy.next(&batch_id) {
        NextResult::UnknownBatch => status_only(StatusCode::NOT_FOUND),
        NextResult::Drained => {
            debug!(batch_id, "批次已全部取完");
            status_only(StatusCode::NO_CONTENT)
        }
        NextResult::Ready(handle) => Json(handle).into_response(),
        NextResult::NotReady => Json(json!({})).into_response(),
    }
}

/// `GET /response/{batch_id}/{hook_instance}`
pub async fn fetch_response(
    State(state): State<AppState>,
    Path((batch_id, hook_instance)): Path<(String, String)>,
) -> Response {
    match state.proxy.response(&batch_id, &hook_instance) {
        Some(body) => raw_json(body),
        None => status_only(StatusCode::NOT_FOUND),
    }
}

/// `GET /abort/{batch_id}`：批次不存在时返回 304
pub async fn abort_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Response {
    if state.proxy.abort(&batch_id) {
        info!(batch_id, "客户端中止批次");
        status_only(StatusCode::OK)
    } else {
        status_only(StatusCode::NOT_MODIFIED)
    }
}
