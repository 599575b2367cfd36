//! Application State

use std::sync::Arc;

use crate::application::ports::ChatPort;
use crate::application::SynthesisOrchestrator;
use crate::domain::VoiceConfigStore;

/// 应用状态
///
/// 合成编排器与对话代理在启动时装配完成，请求处理期间只读共享。
pub struct AppState {
    pub orchestrator: Arc<SynthesisOrchestrator>,
    pub chat: Arc<dyn ChatPort>,
    pub store: Arc<VoiceConfigStore>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<SynthesisOrchestrator>,
        chat: Arc<dyn ChatPort>,
        store: Arc<VoiceConfigStore>,
    ) -> Self {
        Self {
            orchestrator,
            chat,
            store,
        }
    }
}
