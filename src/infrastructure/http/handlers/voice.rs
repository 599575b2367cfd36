//! Voice Handlers - 对话 / 合成 / 配置查询 / 健康检查

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::domain::{ControlOverrides, SynthesisRequest};
use crate::infrastructure::http::dto::{
    ChatHealthResponse, ChatRequest, ChatResponse, PageConfigResponse, SynthesizeRequest,
    VoiceHealthResponse,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 对话：按页面人设代理到上游大模型
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let page_key = req
        .page
        .unwrap_or_else(|| state.store.default_page().to_string());
    let page = state
        .store
        .get_page(&page_key)
        .ok_or_else(|| ApiError::NotFound(format!("unknown page: {}", page_key)))?;

    let reply = state
        .chat
        .chat(&req.message, &page.personality)
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

    Ok(Json(ChatResponse {
        reply,
        role: page.role.clone(),
    }))
}

/// 合成：整段流水线在阻塞线程上执行，返回 WAV 容器
pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SynthesizeRequest>,
) -> Result<Response, ApiError> {
    // 空文本在进入编排器之前拒绝
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }

    let page = req
        .page
        .unwrap_or_else(|| state.store.default_page().to_string());
    let mut request = SynthesisRequest::new(req.text, page);
    request.overrides = ControlOverrides {
        top_k: req.top_k,
        top_p: req.top_p,
        temperature: req.temperature,
        speed: req.speed,
        seed: req.seed,
    };

    let orchestrator = state.orchestrator.clone();
    let wav = tokio::task::spawn_blocking(move || orchestrator.synthesize(&request))
        .await
        .map_err(|e| ApiError::Internal(format!("synthesis task panicked: {}", e)))??;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/wav")
        .header(header::CONTENT_LENGTH, wav.len())
        .header(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"output.wav\"",
        )
        .body(Body::from(wav))
        .unwrap())
}

/// 页面配置查询
pub async fn get_page_config(
    State(state): State<Arc<AppState>>,
    Path(page): Path<String>,
) -> Result<Json<PageConfigResponse>, ApiError> {
    let config = state
        .orchestrator
        .page_config(&page)
        .ok_or_else(|| ApiError::NotFound(format!("unknown page: {}", page)))?;

    Ok(Json(PageConfigResponse {
        page,
        role: config.role,
        personality: config.personality,
        voice_configured: config.voice_config.is_some(),
    }))
}

/// 语音服务健康检查：权重在位情况 + 上游对话 API 可用性
pub async fn voice_health(State(state): State<Arc<AppState>>) -> Json<VoiceHealthResponse> {
    let status = state.orchestrator.health_status();
    let chat = state.chat.health_check().await;

    let healthy = status.config_loaded && status.gpt_model_exists && status.sovits_model_exists;
    Json(VoiceHealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        device: status.device.to_string(),
        gpt_model_exists: status.gpt_model_exists,
        sovits_model_exists: status.sovits_model_exists,
        config_loaded: status.config_loaded,
        chat: ChatHealthResponse {
            healthy: chat.healthy,
            api_key_configured: chat.api_key_configured,
            base_url: chat.base_url,
            last_check: chat.last_check,
        },
    })
}
