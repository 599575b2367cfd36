//! Audio Post-Processor - 波形定型
//!
//! 引擎输出 → 定点 PCM → 可选变速 → WAV 容器。
//! 重采样变换按 (源采样率, 目标采样率, 设备) 缓存，进程生命周期内
//! 只追加不淘汰，同 key 并发首用保证至多构建一次。

use std::sync::Arc;

use dashmap::DashMap;

use crate::application::ports::{AudioError, AudioFragment, AudioPostProcessorPort, Device};
use crate::infrastructure::audio::wav;

/// 变速因子的有效区间（与 atempo 滤镜一致）
const SPEED_MIN: f32 = 0.5;
const SPEED_MAX: f32 = 2.0;

/// 重采样缓存 key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResampleKey {
    pub src_rate: u32,
    pub dst_rate: u32,
    pub device: Device,
}

/// 一个 (src, dst) 固定的重采样变换
#[derive(Debug)]
pub struct ResampleTransform {
    src_rate: u32,
    dst_rate: u32,
}

impl ResampleTransform {
    fn new(src_rate: u32, dst_rate: u32) -> Self {
        Self { src_rate, dst_rate }
    }

    /// 线性插值重采样
    pub fn apply(&self, samples: &[f32]) -> Vec<f32> {
        if self.src_rate == self.dst_rate || samples.is_empty() {
            return samples.to_vec();
        }

        let ratio = self.dst_rate as f64 / self.src_rate as f64;
        let out_len = (samples.len() as f64 * ratio) as usize;
        let mut out = Vec::with_capacity(out_len);

        for i in 0..out_len {
            let src_pos = i as f64 / ratio;
            let idx = src_pos as usize;
            let frac = (src_pos - idx as f64) as f32;

            let s0 = samples[idx.min(samples.len() - 1)];
            let s1 = samples[(idx + 1).min(samples.len() - 1)];
            out.push(s0 + (s1 - s0) * frac);
        }

        out
    }
}

/// 音频后处理器
pub struct AudioProcessor {
    transforms: DashMap<ResampleKey, Arc<ResampleTransform>>,
}

impl AudioProcessor {
    pub fn new() -> Self {
        Self {
            transforms: DashMap::new(),
        }
    }

    /// 获取（按需构建并缓存）重采样变换
    pub fn transform(&self, src_rate: u32, dst_rate: u32, device: Device) -> Arc<ResampleTransform> {
        let key = ResampleKey {
            src_rate,
            dst_rate,
            device,
        };
        self.transforms
            .entry(key)
            .or_insert_with(|| {
                tracing::debug!(src = src_rate, dst = dst_rate, device = %device, "Building resample transform");
                Arc::new(ResampleTransform::new(src_rate, dst_rate))
            })
            .clone()
    }

    /// 重采样，同 key 调用复用同一变换实例
    pub fn resample(&self, samples: &[f32], src_rate: u32, dst_rate: u32, device: Device) -> Vec<f32> {
        if src_rate == dst_rate {
            return samples.to_vec();
        }
        self.transform(src_rate, dst_rate, device).apply(samples)
    }

    /// 变速处理：按倍率重定时 16bit 样本，factor 1.0 为 no-op
    ///
    /// 以固定块流式处理，块间保留小数位置，结果与整体处理一致。
    pub fn change_speed(&self, samples: &[i16], factor: f32, sample_rate: u32) -> Vec<i16> {
        if factor == 1.0 || samples.is_empty() {
            return samples.to_vec();
        }

        let factor = factor.clamp(SPEED_MIN, SPEED_MAX);
        let step = factor as f64;
        let mut out = Vec::with_capacity((samples.len() as f64 / step) as usize + 1);

        const BLOCK: usize = 4096;
        let mut pos = 0.0f64;

        while (pos as usize) < samples.len() {
            let block_end = ((pos as usize) + BLOCK).min(samples.len());
            while (pos as usize) < block_end {
                let idx = pos as usize;
                let frac = (pos - idx as f64) as f32;
                let s0 = samples[idx] as f32;
                let s1 = samples[(idx + 1).min(samples.len() - 1)] as f32;
                out.push((s0 + (s1 - s0) * frac) as i16);
                pos += step;
            }
        }

        tracing::debug!(
            factor = factor,
            sample_rate = sample_rate,
            in_len = samples.len(),
            out_len = out.len(),
            "Speed change applied"
        );
        out
    }

    /// 缓存条目数（测试与诊断用）
    pub fn transform_cache_len(&self) -> usize {
        self.transforms.len()
    }
}

impl Default for AudioProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPostProcessorPort for AudioProcessor {
    fn finalize(&self, fragment: &AudioFragment, speed_factor: f32) -> Result<Vec<u8>, AudioError> {
        if fragment.samples.is_empty() {
            return Err(AudioError::EmptyPayload);
        }

        // 浮点波形定点化为 16bit
        let mut pcm: Vec<i16> = fragment
            .samples
            .iter()
            .map(|&s| {
                let clamped = s.clamp(-1.0, 1.0);
                (clamped * 32767.0) as i16
            })
            .collect();

        if speed_factor != 1.0 {
            pcm = self.change_speed(&pcm, speed_factor, fragment.sample_rate);
            if pcm.is_empty() {
                return Err(AudioError::Encoding("speed change emptied payload".to_string()));
            }
        }

        let mut bytes = Vec::with_capacity(pcm.len() * 2);
        for sample in pcm {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }

        Ok(wav::encode(&bytes, fragment.sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_cache_reuses_instance() {
        let processor = AudioProcessor::new();
        let a = processor.transform(32000, 16000, Device::Cpu);
        let b = processor.transform(32000, 16000, Device::Cpu);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(processor.transform_cache_len(), 1);
    }

    #[test]
    fn test_transform_cache_keys_on_all_components() {
        let processor = AudioProcessor::new();
        let a = processor.transform(32000, 16000, Device::Cpu);
        let b = processor.transform(32000, 24000, Device::Cpu);
        let c = processor.transform(32000, 16000, Device::Cuda);
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(processor.transform_cache_len(), 3);
    }

    #[test]
    fn test_resample_halves_length() {
        let processor = AudioProcessor::new();
        let samples = vec![0.5f32; 32000];
        let out = processor.resample(&samples, 32000, 16000, Device::Cpu);
        assert!((out.len() as i64 - 16000).abs() <= 1);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let processor = AudioProcessor::new();
        let samples = vec![0.1f32, 0.2, 0.3];
        assert_eq!(processor.resample(&samples, 16000, 16000, Device::Cpu), samples);
        assert_eq!(processor.transform_cache_len(), 0);
    }

    #[test]
    fn test_change_speed_noop_at_unit_factor() {
        let processor = AudioProcessor::new();
        let samples: Vec<i16> = (0..100).collect();
        assert_eq!(processor.change_speed(&samples, 1.0, 32000), samples);
    }

    #[test]
    fn test_change_speed_shortens_at_double_factor() {
        let processor = AudioProcessor::new();
        let samples = vec![100i16; 8000];
        let out = processor.change_speed(&samples, 2.0, 32000);
        assert!((out.len() as i64 - 4000).abs() <= 1);
    }

    #[test]
    fn test_finalize_produces_valid_container() {
        let processor = AudioProcessor::new();
        let fragment = AudioFragment {
            sample_rate: 32000,
            samples: vec![0.25f32; 320],
        };
        let bytes = processor.finalize(&fragment, 1.0).unwrap();
        let info = wav::decode(&bytes).unwrap();
        assert_eq!(info.sample_rate, 32000);
        assert_eq!(info.channels, 1);
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.data.len(), 640);
    }

    #[test]
    fn test_finalize_rejects_empty_fragment() {
        let processor = AudioProcessor::new();
        let fragment = AudioFragment {
            sample_rate: 32000,
            samples: vec![],
        };
        assert!(matches!(
            processor.finalize(&fragment, 1.0),
            Err(AudioError::EmptyPayload)
        ));
    }

    #[test]
    fn test_finalize_clamps_out_of_range_samples() {
        let processor = AudioProcessor::new();
        let fragment = AudioFragment {
            sample_rate: 16000,
            samples: vec![2.0, -2.0],
        };
        let bytes = processor.finalize(&fragment, 1.0).unwrap();
        let info = wav::decode(&bytes).unwrap();
        let s0 = i16::from_le_bytes([info.data[0], info.data[1]]);
        let s1 = i16::from_le_bytes([info.data[2], info.data[3]]);
        assert_eq!(s0, 32767);
        assert_eq!(s1, -32767);
    }
}
