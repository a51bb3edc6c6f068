use std::path::{Component, Path as FsPath, PathBuf};

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::warn;

use crate::routes::AppState;

/// `GET /static/{*path}`
///
/// 最后一段没有扩展名的路径重定向到该目录下的 `index.html`。
pub async fn static_asset(
    State(state): State<AppState>,
    Path(path): Path<String>,
    request: Request,
) -> Response {
    let Some(root) = state.static_dir.as_deref() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if !has_extension(&path) {
        let target = format!("/static/{}/index.html", path.trim_end_matches('/'));
        return Redirect::temporary(&target).into_response();
    }

    let Some(file) = resolve(root, &path) else {
        warn!(path, "拒绝访问静态资源目录之外的路径");
        return StatusCode::NOT_FOUND.into_response();
    };

    match ServeFile::new(file).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

fn has_extension(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .is_some_and(|(_, ext)| !ext.is_empty())
}

/// 只接受普通路径段，防止跳出静态目录
fn resolve(root: &FsPath, path: &str) -> Option<PathBuf> {
    let relative = FsPath::new(path);
    if relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        Some(root.join(relative))
    } else {
        None
    }
}
