//! HTTP Middleware
//!
//! 请求日志中间件。合成请求整段在阻塞线程上执行，耗时是主要的
//! 诊断信号，所以语音 API 的成功请求也记入 info；4xx/5xx 统一在
//! 此处带耗时落日志，业务层只记失败原因。

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// 语音 API 路径前缀，命中时成功请求也记录耗时
const VOICE_API_PREFIX: &str = "/api/voice";

pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            elapsed_ms,
            "HTTP server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            elapsed_ms,
            "HTTP client error"
        );
    } else if uri.path().starts_with(VOICE_API_PREFIX) {
        tracing::info!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            elapsed_ms,
            "Voice API request completed"
        );
    }

    response
}
