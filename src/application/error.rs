//! 应用层错误定义
//!
//! 合成流水线的全部失败种类。每种错误只作用于单个请求，
//! 不触发进程级退出。

use thiserror::Error;

/// 语音合成错误
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// 页面未配置或语音配置为空
    #[error("No voice configuration for page: {0}")]
    ConfigurationMissing(String),

    /// 权重文件缺失
    #[error("Model file missing: {0}")]
    ModelFileMissing(String),

    /// 参考音频在所有候选位置均不存在
    #[error("Reference audio missing: {0}")]
    ReferenceAudioMissing(String),

    /// vendored 组件单元加载失败（配置缺陷，不可重试）
    #[error("Component load error: {0}")]
    ComponentLoad(String),

    /// 引擎会话构造失败
    #[error("Session construction error: {0}")]
    SessionConstruction(String),

    /// 引擎推理失败或无输出
    #[error("Inference error: {0}")]
    Inference(String),

    /// 音频容器构造失败
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl From<crate::application::ports::AudioError> for SynthesisError {
    fn from(e: crate::application::ports::AudioError) -> Self {
        Self::Encoding(e.to_string())
    }
}
