//! Minzai - 闽仔语音合成后端
//!
//! 启动流程：配置 → 日志 → 核心装配（音频处理器、组件注册表、
//! 配置存储、角色解析器、会话构建器、编排器、对话代理）→ HTTP 服务器

use std::sync::Arc;

use minzai::application::ports::Device;
use minzai::application::SynthesisOrchestrator;
use minzai::config::{load_config, print_config};
use minzai::domain::{RoleResolver, VoiceConfigStore};
use minzai::infrastructure::audio::AudioProcessor;
use minzai::infrastructure::chat::{DeepSeekClient, DeepSeekConfig};
use minzai::infrastructure::components::ComponentRegistry;
use minzai::infrastructure::engine::SessionBuilder;
use minzai::infrastructure::http::{AppState, HttpServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!(
        "{},minzai={},tower_http=debug",
        config.log.level, config.log.level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("Minzai - 闽仔语音合成后端");
    print_config(&config);

    // 进程级缓存：重采样变换 + 组件句柄
    let audio = Arc::new(AudioProcessor::new());
    let registry = Arc::new(ComponentRegistry::new(
        &config.paths.engine_dir,
        audio.clone(),
    ));

    // 语音配置：主文件缺失或损坏时回退到兜底文件
    let store = Arc::new(VoiceConfigStore::load(
        &[config.paths.voice_config.clone()],
        Some(config.paths.voice_config_fallback.as_path()),
    ));

    let device = Device::parse(&config.engine.device);
    let roles = RoleResolver::new(&config.paths.slice_dir);
    let sessions = Arc::new(SessionBuilder::new(registry, device));

    let orchestrator = Arc::new(SynthesisOrchestrator::new(
        store.clone(),
        roles,
        sessions,
        audio,
        &config.paths.gpt_weights_dir,
        &config.paths.sovits_weights_dir,
    ));

    // 对话代理
    let chat = Arc::new(DeepSeekClient::new(DeepSeekConfig {
        api_key: config.chat.api_key.clone(),
        base_url: config.chat.base_url.clone(),
        model: config.chat.model.clone(),
        timeout_secs: config.chat.timeout_secs,
    })?);

    // 创建 HTTP 服务器
    let state = AppState::new(orchestrator, chat, store);
    let server = HttpServer::new(&config.server, state);

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for ctrl-c");
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
