//! Component Registry - vendored 模型定义树的按需加载器
//!
//! 模型定义单元以相对路径为 key，首次解析时执行其加载逻辑并缓存
//! 句柄，进程生命周期内不淘汰。单元之间以限定名互相引用，但并不
//! 处于预装的包树中，因此首次解析前要先注册合成命名空间条目。
//! 高层入口单元的内部引用在加载期即被解析，必须先按声明顺序预载
//! 其依赖单元。

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

use crate::application::error::SynthesisError;
use crate::application::ports::PipelineFactory;
use crate::infrastructure::audio::AudioProcessor;
use crate::infrastructure::engine::pipeline::VendoredPipelineFactory;

/// 根命名空间名
const ROOT_NAMESPACE: &str = "gpt_sovits";

/// vendored 树中被视为子包的目录
const KNOWN_SUBPACKAGES: &[&str] = &[
    "AR",
    "BigVGAN",
    "module",
    "tools",
    "TTS_infer_pack",
    "feature_extractor",
    "text",
    "f5_tts",
];

/// 推理管线入口单元
pub const PIPELINE_UNIT: &str = "TTS_infer_pack/TTS.json";

/// 入口单元的预载依赖，顺序即加载顺序
pub const PIPELINE_PRELOAD: &[&str] = &[
    "AR/models/t2s_lightning_module.json",
    "BigVGAN/bigvgan.json",
    "feature_extractor/cnhubert.json",
    "module/mel_processing.json",
    "module/models.json",
    "process_ckpt.json",
    "tools/audio_sr.json",
    "tools/i18n/i18n.json",
    "TTS_infer_pack/text_segmentation_method.json",
    "TTS_infer_pack/TextPreprocessor.json",
    "sv.json",
];

/// 组件加载错误（配置缺陷，调用方不应重试）
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("Component file missing: {0}")]
    Missing(String),

    #[error("Unknown component unit: {0}")]
    Unknown(String),

    #[error("Component load failed: {path}: {reason}")]
    LoadFailed { path: String, reason: String },
}

impl From<ComponentError> for SynthesisError {
    fn from(e: ComponentError) -> Self {
        SynthesisError::ComponentLoad(e.to_string())
    }
}

/// 已加载单元的成员内容
pub enum ComponentKind {
    /// 推理管线构造入口
    PipelineEntry(Arc<dyn PipelineFactory>),
    /// 预载依赖单元，无直接调用面
    Support,
}

impl std::fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentKind::PipelineEntry(_) => f.write_str("PipelineEntry"),
            ComponentKind::Support => f.write_str("Support"),
        }
    }
}

/// 已加载单元
#[derive(Debug)]
pub struct ComponentUnit {
    pub path: String,
    pub kind: ComponentKind,
}

/// 组件句柄：同一相对路径的重复解析返回同一句柄
pub type ComponentHandle = Arc<ComponentUnit>;

struct UnitSpec {
    path: &'static str,
    preload: &'static [&'static str],
    entry: bool,
}

const UNITS: &[UnitSpec] = &[
    UnitSpec { path: "AR/models/t2s_lightning_module.json", preload: &[], entry: false },
    UnitSpec { path: "BigVGAN/bigvgan.json", preload: &[], entry: false },
    UnitSpec { path: "feature_extractor/cnhubert.json", preload: &[], entry: false },
    UnitSpec { path: "module/mel_processing.json", preload: &[], entry: false },
    UnitSpec { path: "module/models.json", preload: &[], entry: false },
    UnitSpec { path: "process_ckpt.json", preload: &[], entry: false },
    UnitSpec { path: "tools/audio_sr.json", preload: &[], entry: false },
    UnitSpec { path: "tools/i18n/i18n.json", preload: &[], entry: false },
    UnitSpec { path: "TTS_infer_pack/text_segmentation_method.json", preload: &[], entry: false },
    UnitSpec { path: "TTS_infer_pack/TextPreprocessor.json", preload: &[], entry: false },
    UnitSpec { path: "sv.json", preload: &[], entry: false },
    UnitSpec { path: PIPELINE_UNIT, preload: PIPELINE_PRELOAD, entry: true },
];

fn unit_spec(path: &str) -> Option<&'static UnitSpec> {
    UNITS.iter().find(|u| u.path == path)
}

/// 组件注册表
///
/// 进程级共享服务。句柄缓存只追加；同 key 并发首用时只有一个
/// 加载方执行加载副作用，后到者复用已插入的句柄。
pub struct ComponentRegistry {
    root: PathBuf,
    audio: Arc<AudioProcessor>,
    units: DashMap<String, ComponentHandle>,
    namespaces: DashMap<String, PathBuf>,
    namespace_init: Once,
    loads: AtomicU64,
}

impl ComponentRegistry {
    pub fn new(root: impl Into<PathBuf>, audio: Arc<AudioProcessor>) -> Self {
        Self {
            root: root.into(),
            audio,
            units: DashMap::new(),
            namespaces: DashMap::new(),
            namespace_init: Once::new(),
            loads: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// 解析一个单元，首用时加载并缓存
    pub fn resolve(&self, path: &str) -> Result<ComponentHandle, ComponentError> {
        if let Some(handle) = self.units.get(path) {
            return Ok(handle.clone());
        }

        self.namespace_init.call_once(|| self.register_namespaces());

        let spec = unit_spec(path).ok_or_else(|| ComponentError::Unknown(path.to_string()))?;

        // 入口单元的内部引用在加载期即被解析，依赖必须先就位
        for dep in spec.preload {
            self.resolve(dep)?;
        }

        match self.units.entry(path.to_string()) {
            Entry::Occupied(e) => Ok(e.get().clone()),
            Entry::Vacant(v) => {
                let kind = self.load_unit(path, spec.entry)?;
                self.loads.fetch_add(1, Ordering::SeqCst);
                tracing::info!(path = %path, "Component loaded");
                let handle = Arc::new(ComponentUnit {
                    path: path.to_string(),
                    kind,
                });
                v.insert(handle.clone());
                Ok(handle)
            }
        }
    }

    /// 解析入口单元并取出管线构造工厂
    pub fn pipeline_factory(&self) -> Result<Arc<dyn PipelineFactory>, ComponentError> {
        let handle = self.resolve(PIPELINE_UNIT)?;
        match &handle.kind {
            ComponentKind::PipelineEntry(factory) => Ok(factory.clone()),
            ComponentKind::Support => Err(ComponentError::LoadFailed {
                path: PIPELINE_UNIT.to_string(),
                reason: "unit has no pipeline member".to_string(),
            }),
        }
    }

    fn load_unit(&self, path: &str, entry: bool) -> Result<ComponentKind, ComponentError> {
        let file = self.root.join(path);
        if !file.exists() {
            return Err(ComponentError::Missing(file.display().to_string()));
        }

        let bytes = std::fs::read(&file).map_err(|e| ComponentError::LoadFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        let manifest: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| ComponentError::LoadFailed {
                path: path.to_string(),
                reason: format!("manifest parse error: {}", e),
            })?;

        if entry {
            let factory = VendoredPipelineFactory::new(self.root.clone(), self.audio.clone(), &manifest);
            Ok(ComponentKind::PipelineEntry(Arc::new(factory)))
        } else {
            Ok(ComponentKind::Support)
        }
    }

    /// 注册合成命名空间：根包 + vendored 树中的已知子包（递归）
    fn register_namespaces(&self) {
        self.namespaces
            .insert(ROOT_NAMESPACE.to_string(), self.root.clone());

        for sub in KNOWN_SUBPACKAGES {
            let dir = self.root.join(sub);
            if dir.is_dir() {
                self.register_subpackages(&format!("{}.{}", ROOT_NAMESPACE, sub), &dir);
            }
        }

        tracing::debug!(count = self.namespaces.len(), "Synthetic namespaces registered");
    }

    fn register_subpackages(&self, qualified: &str, dir: &PathBuf) {
        self.namespaces.insert(qualified.to_string(), dir.clone());

        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                let name = entry.file_name().to_string_lossy().into_owned();
                self.register_subpackages(&format!("{}.{}", qualified, name), &path);
            }
        }
    }

    /// 限定名查找命名空间目录
    pub fn namespace(&self, qualified: &str) -> Option<PathBuf> {
        self.namespaces.get(qualified).map(|v| v.clone())
    }

    /// 加载副作用执行次数（测试与诊断用）
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn make_vendored_tree(root: &Path) {
        for unit in UNITS {
            let file = root.join(unit.path);
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(&file, b"{}").unwrap();
        }
    }

    fn registry(root: &Path) -> ComponentRegistry {
        ComponentRegistry::new(root, Arc::new(AudioProcessor::new()))
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        make_vendored_tree(dir.path());
        let reg = registry(dir.path());

        let a = reg.resolve("module/models.json").unwrap();
        let before = reg.load_count();
        let b = reg.resolve("module/models.json").unwrap();
        let c = reg.resolve("module/models.json").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
        // 加载副作用恰好发生一次
        assert_eq!(before, 1);
        assert_eq!(reg.load_count(), 1);
    }

    #[test]
    fn test_entry_unit_preloads_dependencies_in_order() {
        let dir = tempfile::tempdir().unwrap();
        make_vendored_tree(dir.path());
        let reg = registry(dir.path());

        let handle = reg.resolve(PIPELINE_UNIT).unwrap();
        assert!(matches!(handle.kind, ComponentKind::PipelineEntry(_)));
        // 入口 + 全部预载依赖
        assert_eq!(reg.load_count(), 1 + PIPELINE_PRELOAD.len() as u64);
        for dep in PIPELINE_PRELOAD {
            assert!(reg.units.contains_key(*dep));
        }
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(dir.path());
        let err = reg.resolve("module/models.json").unwrap_err();
        assert!(matches!(err, ComponentError::Missing(_)));
    }

    #[test]
    fn test_malformed_manifest_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        make_vendored_tree(dir.path());
        std::fs::write(dir.path().join("sv.json"), b"{broken").unwrap();
        let reg = registry(dir.path());
        let err = reg.resolve("sv.json").unwrap_err();
        assert!(matches!(err, ComponentError::LoadFailed { .. }));
    }

    #[test]
    fn test_unknown_unit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        make_vendored_tree(dir.path());
        let reg = registry(dir.path());
        let err = reg.resolve("nonexistent/unit.json").unwrap_err();
        assert!(matches!(err, ComponentError::Unknown(_)));
    }

    #[test]
    fn test_namespaces_registered_recursively() {
        let dir = tempfile::tempdir().unwrap();
        make_vendored_tree(dir.path());
        let reg = registry(dir.path());
        reg.resolve("sv.json").unwrap();

        assert_eq!(reg.namespace("gpt_sovits"), Some(dir.path().to_path_buf()));
        assert_eq!(
            reg.namespace("gpt_sovits.AR.models"),
            Some(dir.path().join("AR/models"))
        );
        assert_eq!(
            reg.namespace("gpt_sovits.tools.i18n"),
            Some(dir.path().join("tools/i18n"))
        );
        assert!(reg.namespace("gpt_sovits.unknown").is_none());
    }

    #[test]
    fn test_concurrent_first_use_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        make_vendored_tree(dir.path());
        let reg = Arc::new(registry(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = reg.clone();
                std::thread::spawn(move || reg.resolve("module/mel_processing.json").unwrap())
            })
            .collect();
        let resolved: Vec<ComponentHandle> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(reg.load_count(), 1);
        for pair in resolved.windows(2) {
            assert!(Arc::ptr_eq(&pair[0], &pair[1]));
        }
    }

    #[test]
    fn test_pipeline_factory_accessor() {
        let dir = tempfile::tempdir().unwrap();
        make_vendored_tree(dir.path());
        let reg = registry(dir.path());
        assert!(reg.pipeline_factory().is_ok());
        // 第二次走缓存，加载计数不变
        let count = reg.load_count();
        assert!(reg.pipeline_factory().is_ok());
        assert_eq!(reg.load_count(), count);
    }
}
