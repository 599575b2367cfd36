//! Role Resolver - 角色与参考音频解析
//!
//! 给定一对权重文件路径，反查匹配的页面配置，并在切片音频目录下
//! 按固定顺序探测参考音频的真实位置。配置中的路径提示可能已经
//! 改名或相对其他布局，所以这里是候选列表而不是单一路径。

use std::path::{Path, PathBuf};

use super::voice::{VoiceConfig, VoiceConfigStore};

/// 参考音频文件名中可能携带的切片工具后缀
const SLICER_SUFFIX: &str = "-slicer";

/// 解析结果：角色名 + 参考音频路径 + 转写文本
#[derive(Debug, Clone)]
pub struct RoleRecord {
    pub role: String,
    /// 参考音频路径。候选全部不存在时为尽力而为的首个候选，
    /// 存在性由会话构造阶段强制检查。
    pub ref_audio_path: PathBuf,
    /// 参考音频的转写文本
    pub prompt_text: String,
    /// 参考音频是否已在磁盘上验证存在
    pub verified: bool,
}

/// 角色解析器
#[derive(Debug, Clone)]
pub struct RoleResolver {
    slice_dir: PathBuf,
}

impl RoleResolver {
    pub fn new(slice_dir: impl Into<PathBuf>) -> Self {
        Self {
            slice_dir: slice_dir.into(),
        }
    }

    /// 按权重文件对反查角色
    ///
    /// 仅当没有任何页面的权重文件名与给定路径的 basename 相符时
    /// 返回 None。参考音频候选全部缺失不视为失败（见 RoleRecord）。
    pub fn resolve(
        &self,
        store: &VoiceConfigStore,
        gpt_path: &Path,
        sovits_path: &Path,
    ) -> Option<RoleRecord> {
        let gpt_name = file_name(gpt_path)?;
        let sovits_name = file_name(sovits_path)?;

        // 按页面键序扫描：同一权重对被多个页面引用时取键序最小者，
        // 结果跨进程稳定
        let mut pages: Vec<_> = store.pages().collect();
        pages.sort_by(|a, b| a.0.cmp(b.0));

        for (page_key, page) in pages {
            let Some(vc) = page.voice_config.as_ref() else {
                continue;
            };
            if vc.gpt_model != gpt_name || vc.sovits_model != sovits_name {
                continue;
            }

            let candidates = self.candidate_paths(&page.role, vc, &gpt_name);
            let found = candidates.iter().find(|p| p.exists()).cloned();

            let (ref_audio_path, verified) = match found {
                Some(path) => {
                    tracing::debug!(
                        page = %page_key,
                        path = %path.display(),
                        "Reference audio resolved"
                    );
                    (path, true)
                }
                None => {
                    // 尽力而为：留给会话构造阶段做硬失败
                    tracing::warn!(
                        page = %page_key,
                        hint = %vc.ref_audio_path,
                        first_candidate = %candidates[0].display(),
                        "No reference audio candidate exists on disk"
                    );
                    (candidates[0].clone(), false)
                }
            };

            return Some(RoleRecord {
                role: page.role.clone(),
                ref_audio_path,
                prompt_text: vc.ref_audio_text.clone(),
                verified,
            });
        }

        None
    }

    /// 参考音频候选路径，按探测顺序：
    /// 1. 配置提示路径的 basename
    /// 2. 同名去掉 "-slicer" 后缀
    /// 3. "<role>.wav"
    /// 4. GPT 权重文件名首个 '-' 之前的前缀 + ".wav"
    fn candidate_paths(&self, role: &str, vc: &VoiceConfig, gpt_name: &str) -> Vec<PathBuf> {
        let hint_name = Path::new(&vc.ref_audio_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let stripped = strip_slicer_suffix(&hint_name);
        let gpt_prefix = gpt_name.split('-').next().unwrap_or(gpt_name);

        vec![
            self.slice_dir.join(&hint_name),
            self.slice_dir.join(&stripped),
            self.slice_dir.join(format!("{}.wav", role)),
            self.slice_dir.join(format!("{}.wav", gpt_prefix)),
        ]
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// 去掉文件名主干中的 "-slicer" 后缀，保留扩展名
fn strip_slicer_suffix(name: &str) -> String {
    name.replace(SLICER_SUFFIX, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voice::{PageConfig, VoiceConfigDocument, VoiceParams};
    use std::collections::HashMap;

    fn store_with_page(role: &str, gpt: &str, sovits: &str, hint: &str) -> VoiceConfigStore {
        let mut pages = HashMap::new();
        pages.insert(
            "tts-chat".to_string(),
            PageConfig {
                role: role.to_string(),
                personality: String::new(),
                voice_config: Some(VoiceConfig {
                    gpt_model: gpt.to_string(),
                    sovits_model: sovits.to_string(),
                    ref_audio_path: hint.to_string(),
                    ref_audio_text: "测试转写".to_string(),
                    voice_params: VoiceParams::default(),
                }),
            },
        );
        VoiceConfigStore::from_document(VoiceConfigDocument {
            pages,
            default_page: "tts-chat".to_string(),
        })
    }

    #[test]
    fn test_no_matching_page_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_page("minzai", "a.ckpt", "b.pth", "x.wav");
        let resolver = RoleResolver::new(dir.path());

        let record = resolver.resolve(&store, Path::new("other.ckpt"), Path::new("b.pth"));
        assert!(record.is_none());
    }

    #[test]
    fn test_hint_basename_wins_when_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ref-slicer.wav"), b"x").unwrap();
        let store = store_with_page("minzai", "a.ckpt", "b.pth", "old/layout/ref-slicer.wav");
        let resolver = RoleResolver::new(dir.path());

        let record = resolver
            .resolve(&store, Path::new("/w/a.ckpt"), Path::new("/w/b.pth"))
            .unwrap();
        assert!(record.verified);
        assert_eq!(record.ref_audio_path, dir.path().join("ref-slicer.wav"));
        assert_eq!(record.prompt_text, "测试转写");
    }

    #[test]
    fn test_slicer_suffix_stripped_as_second_candidate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ref.wav"), b"x").unwrap();
        let store = store_with_page("minzai", "a.ckpt", "b.pth", "ref-slicer.wav");
        let resolver = RoleResolver::new(dir.path());

        let record = resolver
            .resolve(&store, Path::new("a.ckpt"), Path::new("b.pth"))
            .unwrap();
        assert!(record.verified);
        assert_eq!(record.ref_audio_path, dir.path().join("ref.wav"));
    }

    #[test]
    fn test_role_name_as_third_candidate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("minzai.wav"), b"x").unwrap();
        let store = store_with_page("minzai", "a.ckpt", "b.pth", "gone.wav");
        let resolver = RoleResolver::new(dir.path());

        let record = resolver
            .resolve(&store, Path::new("a.ckpt"), Path::new("b.pth"))
            .unwrap();
        assert!(record.verified);
        assert_eq!(record.ref_audio_path, dir.path().join("minzai.wav"));
    }

    #[test]
    fn test_gpt_prefix_as_fourth_candidate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("minzai.wav"), b"x").unwrap();
        let store = store_with_page("other_role", "minzai-e15.ckpt", "b.pth", "gone.wav");
        let resolver = RoleResolver::new(dir.path());

        let record = resolver
            .resolve(&store, Path::new("minzai-e15.ckpt"), Path::new("b.pth"))
            .unwrap();
        assert!(record.verified);
        assert_eq!(record.ref_audio_path, dir.path().join("minzai.wav"));
    }

    #[test]
    fn test_shared_weight_pair_resolves_to_first_page_by_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("alpha.wav"), b"x").unwrap();
        std::fs::write(dir.path().join("beta.wav"), b"x").unwrap();

        // 两个页面引用同一权重对，角色不同
        let mut pages = HashMap::new();
        for (key, role) in [("zz-page", "beta"), ("aa-page", "alpha")] {
            pages.insert(
                key.to_string(),
                PageConfig {
                    role: role.to_string(),
                    personality: String::new(),
                    voice_config: Some(VoiceConfig {
                        gpt_model: "shared.ckpt".to_string(),
                        sovits_model: "shared.pth".to_string(),
                        ref_audio_path: "gone.wav".to_string(),
                        ref_audio_text: role.to_string(),
                        voice_params: VoiceParams::default(),
                    }),
                },
            );
        }
        let store = VoiceConfigStore::from_document(VoiceConfigDocument {
            pages,
            default_page: "aa-page".to_string(),
        });
        let resolver = RoleResolver::new(dir.path());

        // 每次解析都落在键序最小的页面上
        for _ in 0..4 {
            let record = resolver
                .resolve(&store, Path::new("shared.ckpt"), Path::new("shared.pth"))
                .unwrap();
            assert_eq!(record.role, "alpha");
            assert_eq!(record.prompt_text, "alpha");
            assert_eq!(record.ref_audio_path, dir.path().join("alpha.wav"));
        }
    }

    #[test]
    fn test_best_effort_record_when_nothing_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_page("minzai", "a.ckpt", "b.pth", "layout/ref.wav");
        let resolver = RoleResolver::new(dir.path());

        let record = resolver
            .resolve(&store, Path::new("a.ckpt"), Path::new("b.pth"))
            .unwrap();
        assert!(!record.verified);
        // 首个候选作为尽力而为的返回值
        assert_eq!(record.ref_audio_path, dir.path().join("ref.wav"));
    }
}
