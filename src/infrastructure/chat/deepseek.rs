//! DeepSeek Client - 对话补全代理
//!
//! 实现 ChatPort trait，通过 HTTP 调用 DeepSeek chat/completions。
//! 上游失败时不向前端抛错，降级为固定的道歉回复，
//! 保证对话界面永远有内容可显示。

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{ChatError, ChatHealth, ChatPort};

/// 上游不可用时的兜底回复
const FALLBACK_REPLY: &str = "抱歉，我现在有点小问题，请稍后再试试吧！😅";

/// 闽仔的基础人设，页面级 personality 追加在其后
const BASE_PERSONA: &str = "你是闽仔，一个热情开朗的福建文化小使者。\
你熟悉福建的方言、美食、民俗和风景，说话亲切自然，偶尔带一点俏皮。\
回答保持简短口语化，不超过三句话。";

/// chat/completions 请求体
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// DeepSeek 客户端配置
#[derive(Debug, Clone)]
pub struct DeepSeekConfig {
    /// API Key，空字符串视为未配置
    pub api_key: String,
    /// API 基础 URL
    pub base_url: String,
    /// 模型名
    pub model: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for DeepSeekConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            timeout_secs: 30,
        }
    }
}

/// DeepSeek 对话客户端
pub struct DeepSeekClient {
    client: Client,
    config: DeepSeekConfig,
}

impl DeepSeekClient {
    /// 创建客户端。环境变量 DEEPSEEK_API_KEY 优先于配置文件中的 key。
    pub fn new(mut config: DeepSeekConfig) -> Result<Self, ChatError> {
        if let Ok(key) = std::env::var("DEEPSEEK_API_KEY") {
            if !key.trim().is_empty() {
                config.api_key = key;
            }
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn api_key_configured(&self) -> bool {
        !self.config.api_key.trim().is_empty()
    }

    /// 调用一次 chat/completions，返回首条回复文本
    async fn chat_completion(
        &self,
        message: &str,
        personality: &str,
    ) -> Result<String, ChatError> {
        if !self.api_key_configured() {
            return Err(ChatError::NotConfigured);
        }

        let system_prompt = if personality.trim().is_empty() {
            BASE_PERSONA.to_string()
        } else {
            format!("{}\n{}", BASE_PERSONA, personality)
        };

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: message.to_string(),
                },
            ],
            temperature: 0.8,
            max_tokens: 800,
            stream: false,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::UpstreamError(format!("{}: {}", status, body)));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::UpstreamError(format!("malformed response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ChatError::UpstreamError("empty choices".to_string()))
    }
}

#[async_trait]
impl ChatPort for DeepSeekClient {
    async fn chat(&self, message: &str, personality: &str) -> Result<String, ChatError> {
        match self.chat_completion(message, personality).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                tracing::warn!(error = %e, "Chat completion failed, using fallback reply");
                Ok(FALLBACK_REPLY.to_string())
            }
        }
    }

    async fn health_check(&self) -> ChatHealth {
        let configured = self.api_key_configured();
        let healthy = if configured {
            self.client
                .get(format!("{}/models", self.config.base_url))
                .bearer_auth(&self.config.api_key)
                .send()
                .await
                .map(|r| r.status().is_success())
                .unwrap_or(false)
        } else {
            false
        };

        ChatHealth {
            healthy,
            api_key_configured: configured,
            base_url: self.config.base_url.clone(),
            last_check: chrono::Utc::now().to_rfc3339(),
        }
    }
}
