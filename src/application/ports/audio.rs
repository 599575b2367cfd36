//! Audio Port - 音频后处理抽象
//!
//! 编排器通过该端口把引擎原始波形定型为可交付的容器字节。

use thiserror::Error;

use super::engine::AudioFragment;

/// 音频后处理错误
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Empty audio payload")]
    EmptyPayload,

    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// 音频后处理端口
pub trait AudioPostProcessorPort: Send + Sync {
    /// 定型引擎输出：定点化 → 变速（factor 1.0 为 no-op）→ WAV 容器
    fn finalize(&self, fragment: &AudioFragment, speed_factor: f32) -> Result<Vec<u8>, AudioError>;
}
