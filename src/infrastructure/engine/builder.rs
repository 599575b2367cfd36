//! Session Builder - 推理会话装配
//!
//! 把一对已验证的权重路径和一条角色记录装配成可推理的会话：
//! 经组件注册表取得管线工厂，构造会话，绑定参考音频。
//! 参考音频绑定失败时会话必须先释放再报错，不留半成品资源。

use std::path::Path;
use std::sync::Arc;

use crate::application::ports::{Device, InferenceSession, SessionFactoryPort, SessionParams};
use crate::application::SynthesisError;
use crate::domain::RoleRecord;
use crate::infrastructure::components::ComponentRegistry;

/// 与 vendored 引擎版本匹配的权重格式版本号
const ENGINE_VERSION: &str = "v2Pro";

const BERT_BASE_DIR: &str = "pretrained_models/chinese-roberta-wwm-ext-large";
const CNHUBERT_BASE_DIR: &str = "pretrained_models/chinese-hubert-base";

pub struct SessionBuilder {
    registry: Arc<ComponentRegistry>,
    device: Device,
}

impl SessionBuilder {
    pub fn new(registry: Arc<ComponentRegistry>, device: Device) -> Self {
        Self { registry, device }
    }
}

impl SessionFactoryPort for SessionBuilder {
    fn build(
        &self,
        gpt_path: &Path,
        sovits_path: &Path,
        role: &RoleRecord,
    ) -> Result<Box<dyn InferenceSession>, SynthesisError> {
        let factory = self.registry.pipeline_factory()?;

        let params = SessionParams {
            device: self.device,
            half_precision: self.device == Device::Cuda,
            version: ENGINE_VERSION.to_string(),
            t2s_weights_path: gpt_path.to_path_buf(),
            vits_weights_path: sovits_path.to_path_buf(),
            bert_base_path: self.registry.root().join(BERT_BASE_DIR),
            cnhubert_base_path: self.registry.root().join(CNHUBERT_BASE_DIR),
        };

        let mut session = factory
            .create(&params)
            .map_err(|e| SynthesisError::SessionConstruction(e.to_string()))?;

        // 会话已持有工作内存，此后任何失败都要先释放
        if !role.ref_audio_path.exists() {
            session.release();
            return Err(SynthesisError::ReferenceAudioMissing(
                role.ref_audio_path.display().to_string(),
            ));
        }
        if let Err(e) = session.set_reference(&role.ref_audio_path, &role.prompt_text) {
            session.release();
            return Err(SynthesisError::ReferenceAudioMissing(e.to_string()));
        }

        tracing::info!(
            role = %role.role,
            ref_audio = %role.ref_audio_path.display(),
            verified = role.verified,
            "Inference session ready"
        );
        Ok(session)
    }

    fn device(&self) -> Device {
        self.device
    }
}
