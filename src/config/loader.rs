//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `MINZAI_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `MINZAI_SERVER__PORT=8080`
/// - `MINZAI_ENGINE__DEVICE=cuda`
/// - `MINZAI_PATHS__SLICE_DIR=/data/slices`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8000)?
        .set_default("engine.device", "cpu")?
        .set_default("paths.voice_config", "data/voice_config.json")?
        .set_default("paths.voice_config_fallback", "data/voice_config.default.json")?
        .set_default("paths.gpt_weights_dir", "data/GPT_weights_v2Pro")?
        .set_default("paths.sovits_weights_dir", "data/SoVITS_weights_v2Pro")?
        .set_default("paths.slice_dir", "data/slices")?
        .set_default("paths.engine_dir", "vendor/GPT-SoVITS")?
        .set_default("chat.api_key", "")?
        .set_default("chat.base_url", "https://api.deepseek.com/v1")?
        .set_default("chat.model", "deepseek-chat")?
        .set_default("chat.timeout_secs", 30)?
        .set_default("log.level", "info")?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 前缀: MINZAI_，层级分隔符: __ (双下划线)
    builder = builder.add_source(
        Environment::with_prefix("MINZAI")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::ParseError(format!("Failed to deserialize config: {}", e)))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.engine.device != "cpu" && config.engine.device != "cuda" {
        return Err(ConfigError::ValidationError(format!(
            "Unknown engine device: {}",
            config.engine.device
        )));
    }

    if config.chat.base_url.is_empty() {
        return Err(ConfigError::ValidationError(
            "Chat base URL cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("Engine Device: {}", config.engine.device);
    tracing::info!("Engine Dir: {:?}", config.paths.engine_dir);
    tracing::info!("Voice Config: {:?}", config.paths.voice_config);
    tracing::info!("GPT Weights: {:?}", config.paths.gpt_weights_dir);
    tracing::info!("SoVITS Weights: {:?}", config.paths.sovits_weights_dir);
    tracing::info!("Slice Dir: {:?}", config.paths.slice_dir);
    tracing::info!("Chat Base URL: {}", config.chat.base_url);
    tracing::info!(
        "Chat API Key Configured: {}",
        !config.chat.api_key.is_empty() || std::env::var("DEEPSEEK_API_KEY").is_ok()
    );
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_unknown_device() {
        let mut config = AppConfig::default();
        config.engine.device = "tpu".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9001\n\n[engine]\ndevice = \"cuda\"\n",
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.engine.device, "cuda");
        // 未覆盖的项取默认值
        assert_eq!(config.chat.model, "deepseek-chat");
    }
}
