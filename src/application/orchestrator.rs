//! Synthesis Orchestrator - 合成请求编排
//!
//! 唯一掌握端到端请求流程的组件，按状态机推进：
//! Idle → ConfigResolved → WeightsVerified → RoleResolved →
//! SessionBuilt → Inferring → PostProcessed → Done，任一非终态
//! 可进入 Failed。会话资源在离开 Inferring 的每条路径上都被释放。

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::application::error::SynthesisError;
use crate::application::ports::{
    AudioPostProcessorPort, Device, InferParams, InferenceSession, SessionFactoryPort,
};
use crate::domain::{RoleResolver, SynthesisRequest, VoiceConfigStore, VoiceParams};

/// 状态机阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    ConfigResolved,
    WeightsVerified,
    RoleResolved,
    SessionBuilt,
    Inferring,
    PostProcessed,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::ConfigResolved => "config_resolved",
            Stage::WeightsVerified => "weights_verified",
            Stage::RoleResolved => "role_resolved",
            Stage::SessionBuilt => "session_built",
            Stage::Inferring => "inferring",
            Stage::PostProcessed => "post_processed",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

/// 健康状态快照
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub device: Device,
    pub gpt_model_exists: bool,
    pub sovits_model_exists: bool,
    pub gpt_weights_dir: PathBuf,
    pub sovits_weights_dir: PathBuf,
    pub config_loaded: bool,
}

/// 合成编排器
///
/// 除两个进程级缓存（组件句柄、重采样变换）外不持有共享可变状态；
/// 每个请求独自构建并释放自己的会话。
pub struct SynthesisOrchestrator {
    store: Arc<VoiceConfigStore>,
    roles: RoleResolver,
    sessions: Arc<dyn SessionFactoryPort>,
    audio: Arc<dyn AudioPostProcessorPort>,
    gpt_weights_dir: PathBuf,
    sovits_weights_dir: PathBuf,
}

impl SynthesisOrchestrator {
    pub fn new(
        store: Arc<VoiceConfigStore>,
        roles: RoleResolver,
        sessions: Arc<dyn SessionFactoryPort>,
        audio: Arc<dyn AudioPostProcessorPort>,
        gpt_weights_dir: impl Into<PathBuf>,
        sovits_weights_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            roles,
            sessions,
            audio,
            gpt_weights_dir: gpt_weights_dir.into(),
            sovits_weights_dir: sovits_weights_dir.into(),
        }
    }

    /// 执行一次合成，返回 WAV 容器字节
    ///
    /// 文本非空由调用方（HTTP 边界）保证。
    pub fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        let mut stage = Stage::Idle;

        let result = self.drive(request, &mut stage);

        match &result {
            Ok(bytes) => {
                tracing::info!(
                    page = %request.page,
                    audio_size = bytes.len(),
                    "Synthesis completed"
                );
            }
            Err(e) => {
                tracing::error!(page = %request.page, stage = %stage, error = %e, "Synthesis failed");
            }
        }

        result
    }

    fn drive(
        &self,
        request: &SynthesisRequest,
        stage: &mut Stage,
    ) -> Result<Vec<u8>, SynthesisError> {
        // Idle → ConfigResolved
        let page = self
            .store
            .get_page(&request.page)
            .ok_or_else(|| SynthesisError::ConfigurationMissing(request.page.clone()))?;
        let vc = page
            .voice_config
            .as_ref()
            .ok_or_else(|| SynthesisError::ConfigurationMissing(request.page.clone()))?;
        self.advance(stage, Stage::ConfigResolved);

        // ConfigResolved → WeightsVerified
        let gpt_path = self.gpt_weights_dir.join(&vc.gpt_model);
        let sovits_path = self.sovits_weights_dir.join(&vc.sovits_model);
        for path in [&gpt_path, &sovits_path] {
            if !path.exists() {
                return Err(SynthesisError::ModelFileMissing(
                    path.display().to_string(),
                ));
            }
        }
        self.advance(stage, Stage::WeightsVerified);

        // WeightsVerified → RoleResolved
        let role = self
            .roles
            .resolve(&self.store, &gpt_path, &sovits_path)
            .ok_or_else(|| {
                SynthesisError::ConfigurationMissing(format!(
                    "no role for weight pair {} / {}",
                    vc.gpt_model, vc.sovits_model
                ))
            })?;
        self.advance(stage, Stage::RoleResolved);

        // RoleResolved → SessionBuilt（失败时构建方负责释放半成品资源）
        let params = assemble_params(request, &vc.voice_params, &role.prompt_text);
        let mut session = self.sessions.build(&gpt_path, &sovits_path, &role)?;
        self.advance(stage, Stage::SessionBuilt);

        // 从这里起，所有出口都必须经过 release
        let result = self.run_session(session.as_mut(), &params, stage);
        session.release();

        result
    }

    fn run_session(
        &self,
        session: &mut dyn InferenceSession,
        params: &InferParams,
        stage: &mut Stage,
    ) -> Result<Vec<u8>, SynthesisError> {
        // SessionBuilt → Inferring
        self.advance(stage, Stage::Inferring);
        let fragments = session
            .run(params)
            .map_err(|e| SynthesisError::Inference(e.to_string()))?;

        // 引擎可能输出多个片段，仅保留第一个
        let first = fragments
            .into_iter()
            .next()
            .ok_or_else(|| SynthesisError::Inference("engine produced no output".to_string()))?;
        if first.samples.is_empty() {
            return Err(SynthesisError::Inference(
                "engine produced empty waveform".to_string(),
            ));
        }
        self.advance(stage, Stage::PostProcessed);

        // PostProcessed → Done
        let bytes = self.audio.finalize(&first, params.speed_factor)?;
        if bytes.is_empty() {
            return Err(SynthesisError::Encoding("empty container".to_string()));
        }
        self.advance(stage, Stage::Done);

        Ok(bytes)
    }

    fn advance(&self, stage: &mut Stage, next: Stage) {
        tracing::debug!(from = %stage, to = %next, "Synthesis stage");
        *stage = next;
    }

    /// 页面配置查询
    pub fn page_config(&self, page: &str) -> Option<crate::domain::PageConfig> {
        self.store.get_page(page).cloned()
    }

    /// 健康状态：按默认页面检查权重文件是否在位
    pub fn health_status(&self) -> HealthStatus {
        let (gpt_exists, sovits_exists) = self
            .store
            .get_page(self.store.default_page())
            .and_then(|p| p.voice_config.as_ref())
            .map(|vc| {
                (
                    self.gpt_weights_dir.join(&vc.gpt_model).exists(),
                    self.sovits_weights_dir.join(&vc.sovits_model).exists(),
                )
            })
            .unwrap_or((false, false));

        HealthStatus {
            device: self.sessions.device(),
            gpt_model_exists: gpt_exists,
            sovits_model_exists: sovits_exists,
            gpt_weights_dir: self.gpt_weights_dir.clone(),
            sovits_weights_dir: self.sovits_weights_dir.clone(),
            config_loaded: self.store.is_loaded(),
        }
    }
}

/// 合并页面默认参数与请求覆盖项
///
/// `parallel_infer` 无条件关闭：并行推理打乱文本片段的输出顺序。
fn assemble_params(
    request: &SynthesisRequest,
    defaults: &VoiceParams,
    prompt_text: &str,
) -> InferParams {
    let o = &request.overrides;
    InferParams {
        text: request.text.clone(),
        text_lang: request.text_lang.clone(),
        prompt_text: prompt_text.to_string(),
        prompt_lang: request.text_lang.clone(),
        top_k: o.top_k.unwrap_or(defaults.top_k),
        top_p: o.top_p.unwrap_or(defaults.top_p),
        temperature: o.temperature.unwrap_or(defaults.temperature),
        text_split_method: defaults.text_split_method.clone(),
        batch_size: defaults.batch_size,
        speed_factor: o.speed.unwrap_or(defaults.speed),
        fragment_interval: defaults.fragment_interval,
        seed: o.seed.unwrap_or(defaults.seed),
        parallel_infer: false,
        repetition_penalty: defaults.repetition_penalty,
    }
}
