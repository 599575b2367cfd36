//! Service Handlers
//!
//! 根路径服务信息与进程级健康检查

use axum::Json;

use crate::infrastructure::http::dto::ServiceInfoResponse;

/// 服务信息 - 根路径
pub async fn service_info() -> Json<ServiceInfoResponse> {
    Json(ServiceInfoResponse {
        service: "minzai-voice-backend",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
    })
}

/// 进程级健康检查（不触碰模型或上游 API）
pub async fn health() -> Json<ServiceInfoResponse> {
    Json(ServiceInfoResponse {
        service: "minzai-voice-backend",
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
    })
}
