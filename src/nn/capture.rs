/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 激活捕获：挂载探针 → 合成输入 → 一次前向传播 → 逐层统计与热力图
 */

use super::layer::LayerOutput;
use super::network::{Network, Probe};
use super::registry::{InputSpec, ModelKind};
use super::ModelError;
use crate::tensor::Tensor;
use crate::vision::{Vision, activation_to_image};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Transformer 类模型合成输入的序列长度与词表上界
pub const TOKEN_SEQ_LEN: usize = 16;
pub const TOKEN_VOCAB: usize = 1000;
/// 热力图边长
pub const FEATURE_MAP_SIZE: u32 = 64;

/// 一个模块的捕获结果
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub input_shape: Vec<usize>,
    pub output: Tensor,
}

/// 按模块名保存输出的探针：张量输出直接保存，元组输出保存第一个元素；
/// 同一模块被多次调用时保留最后一次
#[derive(Debug)]
pub struct ActivationProbe {
    captures: HashMap<String, Capture>,
    attached: bool,
}

impl Default for ActivationProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivationProbe {
    pub fn new() -> Self {
        Self {
            captures: HashMap::new(),
            attached: true,
        }
    }

    /// 取走`name`的捕获结果
    pub fn take(&mut self, name: &str) -> Option<Capture> {
        self.captures.remove(name)
    }
}

impl Probe for ActivationProbe {
    fn observe(&mut self, name: &str, input: &Tensor, output: &LayerOutput) {
        if !self.attached {
            return;
        }
        if let Some(tensor) = output.primary() {
            self.captures.insert(
                name.to_string(),
                Capture {
                    input_shape: input.shape().to_vec(),
                    output: tensor.clone(),
                },
            );
        }
    }

    fn detach(&mut self) {
        self.attached = false;
    }
}

/// 合成的模型输入
#[derive(Debug, Clone)]
pub struct SynthesizedInput {
    pub tensor: Tensor,
    /// 使用了本地图像时，原始文件字节的 base64
    pub image_base64: Option<String>,
}

/// 按模型类别合成输入：
/// - CNN：有可用图像且为3通道时载入图像，否则按`spec`随机正态
/// - Transformer：[1, 16] 的随机 token id，取值[0, 1000)
/// - 其他：按`spec`随机正态
pub fn synthesize_input(
    kind: &ModelKind,
    image_path: Option<&Path>,
    spec: InputSpec,
) -> Result<SynthesizedInput, ModelError> {
    let random = || SynthesizedInput {
        tensor: Tensor::new_normal(0., 1., &spec.shape()),
        image_base64: None,
    };
    match kind {
        ModelKind::Transformer => Ok(SynthesizedInput {
            tensor: Tensor::new_random_int(0, TOKEN_VOCAB, &[1, TOKEN_SEQ_LEN]),
            image_base64: None,
        }),
        ModelKind::Cnn => match image_path {
            Some(path) if path.exists() && spec.channels == 3 => {
                let tensor = Vision::load_image_for_inference(path, spec.height, spec.width)?;
                let bytes = std::fs::read(path)?;
                Ok(SynthesizedInput {
                    tensor,
                    image_base64: Some(STANDARD.encode(bytes)),
                })
            }
            _ => Ok(random()),
        },
        ModelKind::Other(_) => Ok(random()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActivationStats {
    pub mean: f32,
    /// 无偏标准差，元素少于2个时为 NaN（序列化为 null）
    pub std: f32,
    pub min: f32,
    pub max: f32,
}

impl ActivationStats {
    pub fn of(tensor: &Tensor) -> Self {
        Self {
            mean: tensor.mean(),
            std: tensor.std(),
            min: tensor.min(),
            max: tensor.max(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub step_index: usize,
    pub layer_id: String,
    pub layer_name: String,
    pub operation: String,
    pub input_shape: Vec<usize>,
    pub output_shape: Vec<usize>,
    pub activation_stats: ActivationStats,
    pub feature_map_image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceResult {
    pub model_name: String,
    pub input_shape: Vec<usize>,
    pub output_shape: Vec<usize>,
    pub input_image: Option<String>,
    pub steps: Vec<Step>,
}

/// 推理模式下跑一次前向传播，按遍历顺序返回各可见模块的激活
pub fn run_inference(
    network: &mut Network,
    model_name: &str,
    kind: &ModelKind,
    image_path: Option<&Path>,
    spec: InputSpec,
) -> Result<InferenceResult, ModelError> {
    network.eval();
    let input = synthesize_input(kind, image_path, spec)?;

    let mut probe = ActivationProbe::new();
    let output = {
        let mut instrumented = network.attach(&mut probe);
        instrumented.forward(&input.tensor)?
    };

    let mut steps = Vec::new();
    for visited in network.visit_layers() {
        let Some(capture) = probe.take(&visited.name) else {
            continue;
        };
        let operation = if visited.name.contains('.') {
            "SubModule".to_string()
        } else {
            visited.layer.kind().to_string()
        };
        steps.push(Step {
            step_index: steps.len(),
            layer_id: format!("layer_{}", visited.index),
            operation,
            input_shape: capture.input_shape,
            output_shape: capture.output.shape().to_vec(),
            activation_stats: ActivationStats::of(&capture.output),
            feature_map_image: activation_to_image(&capture.output, FEATURE_MAP_SIZE)?,
            layer_name: visited.name,
        });
    }

    Ok(InferenceResult {
        model_name: model_name.to_string(),
        input_shape: input.tensor.shape().to_vec(),
        output_shape: output.shape().to_vec(),
        input_image: input.image_base64,
        steps,
    })
}
