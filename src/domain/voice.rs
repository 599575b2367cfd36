//! Voice Configuration Store - 页面语音配置
//!
//! 从候选路径加载 config.json（首个存在且可解析者生效），
//! 失败时退回默认配置文档，再退回内置空配置。进程启动后只读，
//! 不做热更新。加载失败永远不致命。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// 每角色合成参数，与 config.json 中 voice_params 对应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceParams {
    #[serde(default = "default_speed")]
    pub speed: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_text_split_method")]
    pub text_split_method: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    #[serde(default = "default_fragment_interval")]
    pub fragment_interval: f32,

    #[serde(default = "default_seed")]
    pub seed: i64,

    #[serde(default = "default_parallel_infer")]
    pub parallel_infer: bool,

    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,
}

fn default_speed() -> f32 {
    1.0
}

fn default_top_k() -> u32 {
    5
}

fn default_top_p() -> f32 {
    1.0
}

fn default_temperature() -> f32 {
    1.0
}

fn default_text_split_method() -> String {
    "cut5".to_string()
}

fn default_batch_size() -> u32 {
    1
}

fn default_fragment_interval() -> f32 {
    0.3
}

fn default_seed() -> i64 {
    -1
}

fn default_parallel_infer() -> bool {
    true
}

fn default_repetition_penalty() -> f32 {
    1.35
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            temperature: default_temperature(),
            text_split_method: default_text_split_method(),
            batch_size: default_batch_size(),
            fragment_interval: default_fragment_interval(),
            seed: default_seed(),
            parallel_infer: default_parallel_infer(),
            repetition_penalty: default_repetition_penalty(),
        }
    }
}

/// 页面的语音配置：权重文件名 + 参考音频描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub gpt_model: String,
    pub sovits_model: String,

    /// 参考音频路径提示，可能已过期或相对其他布局，仅作候选探测输入
    #[serde(default)]
    pub ref_audio_path: String,

    /// 参考音频的转写文本（prompt）
    #[serde(default)]
    pub ref_audio_text: String,

    #[serde(default)]
    pub voice_params: VoiceParams,
}

/// 单个页面配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// 角色名（同时是参考音频候选文件名之一）
    #[serde(default)]
    pub role: String,

    /// 对话人设文本，注入 chat 系统提示词
    #[serde(default)]
    pub personality: String,

    #[serde(default)]
    pub voice_config: Option<VoiceConfig>,
}

/// config.json 文档结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceConfigDocument {
    #[serde(default)]
    pub pages: HashMap<String, PageConfig>,

    #[serde(default = "default_page_key")]
    pub default_page: String,
}

fn default_page_key() -> String {
    "tts-chat".to_string()
}

/// 语音配置存储
///
/// 进程启动时加载一次，此后只读。
#[derive(Debug)]
pub struct VoiceConfigStore {
    doc: VoiceConfigDocument,
    /// 是否从某个文档成功加载（区分内置空配置）
    loaded: bool,
}

impl VoiceConfigStore {
    /// 按优先级加载配置
    ///
    /// 依次尝试 `candidates` 中首个存在且可解析的文档；全部失败时
    /// 尝试 `fallback`；仍失败则使用内置空配置（pages 为空）。
    pub fn load(candidates: &[PathBuf], fallback: Option<&Path>) -> Self {
        for path in candidates {
            if let Some(doc) = Self::try_read(path) {
                tracing::info!(path = %path.display(), pages = doc.pages.len(), "Loaded voice config");
                return Self { doc, loaded: true };
            }
        }

        if let Some(path) = fallback {
            if let Some(doc) = Self::try_read(path) {
                tracing::info!(path = %path.display(), "Loaded fallback voice config");
                return Self { doc, loaded: true };
            }
        }

        tracing::warn!("No voice config document found, using built-in empty config");
        Self {
            doc: VoiceConfigDocument {
                pages: HashMap::new(),
                default_page: default_page_key(),
            },
            loaded: false,
        }
    }

    /// 从单个文档构造（测试与工具用）
    pub fn from_document(doc: VoiceConfigDocument) -> Self {
        Self { doc, loaded: true }
    }

    fn try_read(path: &Path) -> Option<VoiceConfigDocument> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Voice config candidate does not exist");
            return None;
        }
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read voice config");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Malformed voice config, skipping");
                None
            }
        }
    }

    /// 查询页面配置，缺失返回 None，调用方必须显式处理
    pub fn get_page(&self, key: &str) -> Option<&PageConfig> {
        self.doc.pages.get(key)
    }

    /// 遍历所有页面
    pub fn pages(&self) -> impl Iterator<Item = (&String, &PageConfig)> {
        self.doc.pages.iter()
    }

    pub fn default_page(&self) -> &str {
        &self.doc.default_page
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &Path, name: &str, json: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(json.as_bytes()).unwrap();
        path
    }

    const SAMPLE: &str = r#"{
        "pages": {
            "tts-chat": {
                "role": "minzai",
                "voice_config": {
                    "gpt_model": "minzai-e15.ckpt",
                    "sovits_model": "minzai_e8_s96.pth",
                    "ref_audio_path": "slices/minzai-slicer.wav",
                    "ref_audio_text": "大家好，我是闽仔"
                }
            }
        },
        "default_page": "tts-chat"
    }"#;

    #[test]
    fn test_load_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let good = write_config(dir.path(), "config.json", SAMPLE);

        let store = VoiceConfigStore::load(&[missing, good], None);
        assert!(store.is_loaded());
        assert!(store.get_page("tts-chat").is_some());
        assert_eq!(store.default_page(), "tts-chat");
    }

    #[test]
    fn test_malformed_candidate_degrades_to_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write_config(dir.path(), "config.json", "{not json");
        let fallback = write_config(dir.path(), "config.default.json", SAMPLE);

        let store = VoiceConfigStore::load(&[bad], Some(&fallback));
        assert!(store.is_loaded());
        assert!(store.get_page("tts-chat").is_some());
    }

    #[test]
    fn test_all_missing_degrades_to_builtin_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = VoiceConfigStore::load(&[dir.path().join("a.json")], None);
        assert!(!store.is_loaded());
        assert!(store.get_page("tts-chat").is_none());
        assert_eq!(store.default_page(), "tts-chat");
    }

    #[test]
    fn test_get_page_missing_returns_none() {
        let store = VoiceConfigStore::from_document(
            serde_json::from_str(SAMPLE).unwrap(),
        );
        assert!(store.get_page("unknown-page").is_none());
    }

    #[test]
    fn test_voice_params_defaults() {
        let p = VoiceParams::default();
        assert_eq!(p.speed, 1.0);
        assert_eq!(p.top_k, 5);
        assert_eq!(p.text_split_method, "cut5");
        assert_eq!(p.seed, -1);
        assert!(p.parallel_infer);
    }
}
