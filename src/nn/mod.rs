/*
 * @Author       : 老董
 * @Date         : 2024-01-31 20:23:53
 * @LastEditors  : 老董
 * @LastEditTime : 2026-02-12
 * @Description  : 负责神经网络（neural network）的构建、结构分析、激活捕获与模型文件读写
 */

pub mod analyzer;
pub mod capture;
mod checkpoint;
mod error;
pub mod layer;
pub mod models;
mod network;
mod parameter;
pub mod registry;

pub use analyzer::{LayerDescriptor, ModelSummary, analyze, get_model_summary};
pub use capture::{ActivationProbe, ActivationStats, InferenceResult, Step, run_inference};
pub use checkpoint::Checkpoint;
pub use error::ModelError;
pub use layer::{Layer, LayerOutput, LayerParams, Mode, TraitLayer};
pub use network::{Architecture, Instrumented, NamedLayer, Network, Probe, VisitedLayer};
pub use parameter::{Init, Parameter};
pub use registry::{
    BUILTIN_MODELS, InputSpec, ModelKind, ModelOrigin, NoUploads, ResolvedModel, UploadedModels,
    get_model, resolve,
};

#[cfg(test)]
mod tests;
