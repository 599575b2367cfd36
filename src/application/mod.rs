//! 应用层 - 合成编排
//!
//! 包含：
//! - ports: 端口定义（引擎、音频后处理、对话代理）
//! - orchestrator: 合成请求状态机
//! - error: 合成错误种类

pub mod error;
pub mod orchestrator;
pub mod ports;

pub use error::SynthesisError;
pub use orchestrator::{HealthStatus, SynthesisOrchestrator};
