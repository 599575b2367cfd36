//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

/// 应用主配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 推理引擎配置
    #[serde(default)]
    pub engine: EngineConfig,

    /// 路径配置
    #[serde(default)]
    pub paths: PathsConfig,

    /// 对话代理配置
    #[serde(default)]
    pub chat: ChatConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            engine: EngineConfig::default(),
            paths: PathsConfig::default(),
            chat: ChatConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 推理引擎配置
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// 推理设备: cpu / cuda
    #[serde(default = "default_device")]
    pub device: String,
}

fn default_device() -> String {
    "cpu".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
        }
    }
}

/// 路径配置
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// 语音配置文件（页面 → 语音配置）
    #[serde(default = "default_voice_config")]
    pub voice_config: PathBuf,

    /// 语音配置兜底文件
    #[serde(default = "default_voice_config_fallback")]
    pub voice_config_fallback: PathBuf,

    /// GPT 权重目录
    #[serde(default = "default_gpt_weights_dir")]
    pub gpt_weights_dir: PathBuf,

    /// SoVITS 权重目录
    #[serde(default = "default_sovits_weights_dir")]
    pub sovits_weights_dir: PathBuf,

    /// 参考音频切片目录
    #[serde(default = "default_slice_dir")]
    pub slice_dir: PathBuf,

    /// vendored 引擎根目录
    #[serde(default = "default_engine_dir")]
    pub engine_dir: PathBuf,
}

fn default_voice_config() -> PathBuf {
    PathBuf::from("data/voice_config.json")
}

fn default_voice_config_fallback() -> PathBuf {
    PathBuf::from("data/voice_config.default.json")
}

fn default_gpt_weights_dir() -> PathBuf {
    PathBuf::from("data/GPT_weights_v2Pro")
}

fn default_sovits_weights_dir() -> PathBuf {
    PathBuf::from("data/SoVITS_weights_v2Pro")
}

fn default_slice_dir() -> PathBuf {
    PathBuf::from("data/slices")
}

fn default_engine_dir() -> PathBuf {
    PathBuf::from("vendor/GPT-SoVITS")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            voice_config: default_voice_config(),
            voice_config_fallback: default_voice_config_fallback(),
            gpt_weights_dir: default_gpt_weights_dir(),
            sovits_weights_dir: default_sovits_weights_dir(),
            slice_dir: default_slice_dir(),
            engine_dir: default_engine_dir(),
        }
    }
}

/// 对话代理配置
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// API Key（DEEPSEEK_API_KEY 环境变量优先）
    #[serde(default)]
    pub api_key: String,

    /// API 基础 URL
    #[serde(default = "default_chat_base_url")]
    pub base_url: String,

    /// 模型名
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,
}

fn default_chat_base_url() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_chat_model() -> String {
    "deepseek-chat".to_string()
}

fn default_chat_timeout() -> u64 {
    30
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_chat_base_url(),
            model: default_chat_model(),
            timeout_secs: default_chat_timeout(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
