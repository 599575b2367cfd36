//! Chat Port - 对话补全代理抽象
//!
//! 闽仔的自由文本对话由外部大模型 API 完成，本层只定义边界。

use async_trait::async_trait;
use thiserror::Error;

/// 对话服务错误
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Chat API key not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),
}

/// 对话服务健康状态
#[derive(Debug, Clone)]
pub struct ChatHealth {
    pub healthy: bool,
    pub api_key_configured: bool,
    pub base_url: String,
    pub last_check: String,
}

/// Chat Port
#[async_trait]
pub trait ChatPort: Send + Sync {
    /// 生成角色回复
    ///
    /// `personality` 为页面配置中的人设文本，注入系统提示词。
    async fn chat(&self, message: &str, personality: &str) -> Result<String, ChatError>;

    /// 检查上游 API 是否可用
    async fn health_check(&self) -> ChatHealth;
}
