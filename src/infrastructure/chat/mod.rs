//! Chat - 外部对话补全适配

pub mod deepseek;

pub use deepseek::{DeepSeekClient, DeepSeekConfig};
