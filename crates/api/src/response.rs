//! 轮询协议的响应形式

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// JSON文本原样返回（后端响应体已是JSON）
pub fn raw_json(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

/// 纯文本响应
pub fn plain_text(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

/// 无响应体的状态码
pub fn status_only(status: StatusCode) -> Response {
    status.into_response()
}
