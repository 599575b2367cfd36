//! Data Transfer Objects - HTTP 边界数据结构

use serde::{Deserialize, Serialize};

/// 对话请求
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// 页面标识，决定注入哪段人设文本
    #[serde(default)]
    pub page: Option<String>,
}

/// 对话响应
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub role: String,
}

/// 合成请求
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default)]
    pub seed: Option<i64>,
}

/// 页面配置响应（不回传权重路径等内部细节）
#[derive(Debug, Serialize)]
pub struct PageConfigResponse {
    pub page: String,
    pub role: String,
    pub personality: String,
    pub voice_configured: bool,
}

/// 语音服务健康响应
#[derive(Debug, Serialize)]
pub struct VoiceHealthResponse {
    pub status: String,
    pub device: String,
    pub gpt_model_exists: bool,
    pub sovits_model_exists: bool,
    pub config_loaded: bool,
    pub chat: ChatHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct ChatHealthResponse {
    pub healthy: bool,
    pub api_key_configured: bool,
    pub base_url: String,
    pub last_check: String,
}

/// 服务信息响应（根路径）
#[derive(Debug, Serialize)]
pub struct ServiceInfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}
