//! Engine - vendored 推理引擎适配

pub mod builder;
pub mod pipeline;

pub use builder::SessionBuilder;
pub use pipeline::VendoredPipelineFactory;
