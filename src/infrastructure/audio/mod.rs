//! Audio - 音频后处理与容器构造

pub mod processor;
pub mod wav;

pub use processor::{AudioProcessor, ResampleKey, ResampleTransform};
pub use wav::{WavError, WavInfo};
