//! Infrastructure Layer - 技术实现
//!
//! 音频处理、vendored 组件解析、推理引擎适配、对话代理、HTTP 边界。

pub mod audio;
pub mod chat;
pub mod components;
pub mod engine;
pub mod http;
