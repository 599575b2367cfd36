//! WAV Container - 最小 WAV 容器构造与解析
//!
//! 输出固定为单声道、16bit 有符号小端 PCM。头部 44 字节，
//! 所有多字节字段均为小端序，与常见播放器逐字节兼容。

use thiserror::Error;

/// WAV 头固定长度（RIFF + fmt + data 子块头）
const HEADER_LEN: usize = 44;

/// RIFF size 字段中不含 PCM 负载的固定部分
const RIFF_BASE_SIZE: u32 = 36;

const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

/// WAV 解析错误
#[derive(Debug, Error)]
pub enum WavError {
    #[error("WAV data too short: {0} bytes")]
    TooShort(usize),

    #[error("Invalid WAV: {0}")]
    Invalid(&'static str),
}

/// 构造 WAV 容器字节：44 字节头 + PCM 负载
///
/// `pcm` 必须是 16bit 单声道小端 PCM。
pub fn encode(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    let byte_rate = sample_rate * CHANNELS as u32 * (BITS_PER_SAMPLE / 8) as u32;
    let block_align = CHANNELS * (BITS_PER_SAMPLE / 8);
    let data_size = pcm.len() as u32;

    let mut wav = Vec::with_capacity(HEADER_LEN + pcm.len());

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(RIFF_BASE_SIZE + data_size).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());
    wav.extend_from_slice(pcm);

    wav
}

/// 解析后的 WAV 信息
#[derive(Debug, Clone, PartialEq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub data: Vec<u8>,
}

/// 解析 WAV 容器，返回头部字段与 PCM 负载
///
/// 按子块遍历，容忍 fmt 与 data 之间的附加子块（LIST 等）。
pub fn decode(data: &[u8]) -> Result<WavInfo, WavError> {
    if data.len() < HEADER_LEN {
        return Err(WavError::TooShort(data.len()));
    }
    if &data[0..4] != b"RIFF" {
        return Err(WavError::Invalid("missing RIFF header"));
    }
    if &data[8..12] != b"WAVE" {
        return Err(WavError::Invalid("missing WAVE identifier"));
    }

    let mut pos = 12;
    let mut fmt: Option<(u32, u16, u16)> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size =
            u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]])
                as usize;
        let body = pos + 8;

        match chunk_id {
            b"fmt " => {
                if chunk_size < 16 || body + 16 > data.len() {
                    return Err(WavError::Invalid("truncated fmt chunk"));
                }
                let f = &data[body..body + 16];
                let channels = u16::from_le_bytes([f[2], f[3]]);
                let sample_rate = u32::from_le_bytes([f[4], f[5], f[6], f[7]]);
                let bits = u16::from_le_bytes([f[14], f[15]]);
                fmt = Some((sample_rate, channels, bits));
            }
            b"data" => {
                let (sample_rate, channels, bits) =
                    fmt.ok_or(WavError::Invalid("data chunk before fmt chunk"))?;
                if body + chunk_size > data.len() {
                    return Err(WavError::Invalid("truncated data chunk"));
                }
                return Ok(WavInfo {
                    sample_rate,
                    channels,
                    bits_per_sample: bits,
                    data: data[body..body + chunk_size].to_vec(),
                });
            }
            _ => {}
        }

        pos = body + chunk_size;
        // 子块按偶数字节对齐
        if chunk_size % 2 != 0 {
            pos += 1;
        }
    }

    Err(WavError::Invalid("missing data chunk"))
}
