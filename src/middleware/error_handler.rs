use axum::{
    body::{Body, to_bytes},
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::error;

// 错误响应体最多读取的字节数
const MAX_LOGGED_BODY: usize = 4096;

/// 记录所有 5xx 响应的请求和响应体
pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let response = next.run(req).await;

    if !response.status().is_server_error() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_LOGGED_BODY).await {
        Ok(b) => b,
        Err(e) => {
            error!("{} {} failed, unreadable body: {}", method, uri, e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    error!(
        "{} {} failed - Status: {}, Body: {}",
        method,
        uri,
        parts.status,
        String::from_utf8_lossy(&bytes)
    );

    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}
