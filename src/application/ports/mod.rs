//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio;
mod chat;
mod engine;

pub use audio::{AudioError, AudioPostProcessorPort};
pub use chat::{ChatError, ChatHealth, ChatPort};
pub use engine::{
    AudioFragment, Device, EngineError, InferParams, InferenceSession, PipelineFactory,
    SessionFactoryPort, SessionParams,
};
