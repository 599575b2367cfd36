//! Minzai - 闽仔语音合成后端
//!
//! 架构设计: 分层架构（领域 / 应用 / 基础设施）
//!
//! 领域层 (domain/):
//! - VoiceConfigStore: 页面语音配置存储
//! - RoleResolver: 权重对 → 角色 + 参考音频解析
//! - SynthesisRequest: 合成请求值对象
//!
//! 应用层 (application/):
//! - Ports: 端口定义（InferenceSession, SessionFactory, AudioPostProcessor, Chat）
//! - SynthesisOrchestrator: 合成请求状态机，保证会话必被释放
//!
//! 基础设施层 (infrastructure/):
//! - Components: vendored 模型定义单元的按需解析与缓存
//! - Engine: 推理管线适配与会话装配
//! - Audio: 重采样变换缓存、变速、WAV 容器
//! - Chat: DeepSeek 对话代理
//! - HTTP: RESTful API

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
