//! HTTP Routes
//!
//! API Endpoints:
//! - /                             GET   服务信息
//! - /health                      GET   进程级健康检查
//! - /api/voice/chat              POST  对话（按页面人设代理 DeepSeek）
//! - /api/voice/synthesize        POST  语音合成，返回 audio/wav
//! - /api/voice/health            GET   语音服务健康（权重 + 上游 API）
//! - /api/voice/config/{page}     GET   页面配置查询

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::service_info))
        .route("/health", get(handlers::health))
        .nest("/api/voice", voice_routes())
}

/// Voice 路由
fn voice_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat", post(handlers::chat))
        .route("/synthesize", post(handlers::synthesize))
        .route("/health", get(handlers::voice_health))
        .route("/config/:page", get(handlers::get_page_config))
}
