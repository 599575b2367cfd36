//! Components - vendored 模型定义单元解析

pub mod registry;

pub use registry::{
    ComponentError, ComponentHandle, ComponentKind, ComponentRegistry, ComponentUnit,
    PIPELINE_PRELOAD, PIPELINE_UNIT,
};
