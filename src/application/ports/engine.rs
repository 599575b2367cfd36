//! Engine Port - 推理引擎抽象
//!
//! 定义 vendored 推理引擎的边界接口：会话构造入口、会话本身、
//! 以及编排器使用的会话工厂。引擎内部结构（网络拓扑、权重格式）
//! 不在本层关心范围内。

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::application::error::SynthesisError;
use crate::domain::role::RoleRecord;

/// 推理设备
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    Cpu,
    Cuda,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        }
    }

    /// 从配置字符串解析，未知值回退为 cpu
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "cuda" => Device::Cuda,
            _ => Device::Cpu,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 引擎错误
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine construction failed: {0}")]
    Construction(String),

    #[error("Reference audio error: {0}")]
    ReferenceAudio(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Session already released")]
    Released,
}

/// 会话构造参数
///
/// 一个会话绑定且仅绑定一组 (GPT 权重, SoVITS 权重, 设备, 精度)。
/// 预训练辅助模型路径从 vendored 树根目录派生。
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub device: Device,
    /// CUDA 下启用半精度
    pub half_precision: bool,
    pub version: String,
    pub t2s_weights_path: PathBuf,
    pub vits_weights_path: PathBuf,
    pub bert_base_path: PathBuf,
    pub cnhubert_base_path: PathBuf,
}

/// 单次推理调用参数
#[derive(Debug, Clone)]
pub struct InferParams {
    pub text: String,
    pub text_lang: String,
    pub prompt_text: String,
    pub prompt_lang: String,
    pub top_k: u32,
    pub top_p: f32,
    pub temperature: f32,
    pub text_split_method: String,
    pub batch_size: u32,
    pub speed_factor: f32,
    pub fragment_interval: f32,
    pub seed: i64,
    pub parallel_infer: bool,
    pub repetition_penalty: f32,
}

/// 引擎输出片段：采样率 + 浮点波形
#[derive(Debug, Clone)]
pub struct AudioFragment {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

/// 推理会话
///
/// 每次合成请求独占一个会话，用毕必须显式 `release` 释放工作内存。
pub trait InferenceSession: Send {
    /// 绑定参考音频与其转写文本
    fn set_reference(&mut self, audio_path: &Path, prompt_text: &str) -> Result<(), EngineError>;

    /// 执行推理，可能产出多个片段
    fn run(&mut self, params: &InferParams) -> Result<Vec<AudioFragment>, EngineError>;

    /// 释放会话资源，可重复调用
    fn release(&mut self);
}

impl std::fmt::Debug for dyn InferenceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("InferenceSession")
    }
}

/// 引擎构造入口（由组件解析器定位）
pub trait PipelineFactory: Send + Sync {
    fn create(&self, params: &SessionParams) -> Result<Box<dyn InferenceSession>, EngineError>;
}

/// 会话工厂端口 - 编排器对 Inference Session Builder 的依赖
pub trait SessionFactoryPort: Send + Sync {
    /// 构造会话并绑定角色的参考音频
    fn build(
        &self,
        gpt_path: &Path,
        sovits_path: &Path,
        role: &RoleRecord,
    ) -> Result<Box<dyn InferenceSession>, SynthesisError>;

    fn device(&self) -> Device;
}
