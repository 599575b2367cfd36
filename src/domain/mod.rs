//! 领域层 - 语音配置、角色解析、请求值对象

pub mod request;
pub mod role;
pub mod voice;

pub use request::{ControlOverrides, SynthesisRequest};
pub use role::{RoleRecord, RoleResolver};
pub use voice::{PageConfig, VoiceConfig, VoiceConfigDocument, VoiceConfigStore, VoiceParams};
