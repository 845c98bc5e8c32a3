/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : Layer 模块 - 封闭的层类型枚举
 *
 * 每种层各自持有参数（及缓冲区），实现推理模式下的前向传播，
 * 并给出类型特定的参数记录（`LayerParams`）。
 * 统一的分派通过 enum_dispatch 完成，无需运行时类型判断。
 */

mod activation;
mod attention;
mod batch_norm;
mod container;
mod conv2d;
mod embedding;
mod layer_norm;
mod linear;
mod pool;
mod transformer;

pub use activation::{Dropout, Flatten, GELU, ReLU};
pub use attention::MultiheadAttention;
pub use batch_norm::BatchNorm2d;
pub use container::{ModuleList, Sequential};
pub use conv2d::Conv2d;
pub use embedding::Embedding;
pub use layer_norm::LayerNorm;
pub use linear::Linear;
pub use pool::{AdaptiveAvgPool2d, AvgPool2d, MaxPool2d};
pub use transformer::{FeedForwardActivation, TransformerEncoder, TransformerEncoderLayer};

use crate::nn::{ModelError, Parameter};
use crate::tensor::Tensor;
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

/// 前向传播模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// 训练模式：Dropout 生效，BatchNorm 使用当前批次统计量
    #[default]
    Train,
    /// 推理模式：Dropout 为恒等映射，BatchNorm 使用滑动统计量
    Eval,
}

/// 层的输出：单个张量，或多个张量组成的元组（如 MultiheadAttention 的 (输出, 注意力权重)）
#[derive(Debug, Clone, PartialEq)]
pub enum LayerOutput {
    Tensor(Tensor),
    Tuple(Vec<Tensor>),
}

impl LayerOutput {
    /// 主输出：张量本身，或元组的第一个元素
    pub fn primary(&self) -> Option<&Tensor> {
        match self {
            Self::Tensor(t) => Some(t),
            Self::Tuple(ts) => ts.first(),
        }
    }

    pub fn into_primary(self) -> Option<Tensor> {
        match self {
            Self::Tensor(t) => Some(t),
            Self::Tuple(ts) => ts.into_iter().next(),
        }
    }
}

impl From<Tensor> for LayerOutput {
    fn from(tensor: Tensor) -> Self {
        Self::Tensor(tensor)
    }
}

/// 各类层的结构参数（序列化为不带标签的JSON对象）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LayerParams {
    Conv2d {
        in_channels: usize,
        out_channels: usize,
        kernel_size: [usize; 2],
        stride: [usize; 2],
        padding: [usize; 2],
    },
    Linear {
        in_features: usize,
        out_features: usize,
    },
    BatchNorm2d {
        num_features: usize,
    },
    Embedding {
        num_embeddings: usize,
        embedding_dim: usize,
    },
    LayerNorm {
        normalized_shape: Vec<usize>,
    },
    TransformerEncoderLayer {
        d_model: usize,
        nhead: usize,
    },
    TransformerEncoder {
        num_layers: usize,
    },
    MultiheadAttention {
        embed_dim: usize,
        num_heads: usize,
    },
    /// MaxPool2d 与 AvgPool2d 共用
    Pool2d {
        kernel_size: usize,
        stride: usize,
    },
    AdaptiveAvgPool2d {
        output_size: [usize; 2],
    },
    /// 未登记参数的层类型，序列化为`{}`
    Unsupported {},
}

/// 所有层的公共接口
#[enum_dispatch]
pub trait TraitLayer {
    /// 层类型标签，如`Conv2d`
    fn kind(&self) -> &'static str;

    /// 类型特定的结构参数
    fn params(&self) -> LayerParams {
        LayerParams::Unsupported {}
    }

    /// 本层直接持有的具名参数（不含子模块）
    fn own_parameters(&self) -> Vec<(&'static str, &Parameter)> {
        Vec::new()
    }

    /// 本层直接持有的缓冲区（不参与参数统计，但会写入 state dict）
    fn buffers(&self) -> Vec<(&'static str, &Tensor)> {
        Vec::new()
    }

    /// 具名子模块（按声明顺序）
    fn children(&self) -> Vec<(String, &dyn TraitLayer)> {
        Vec::new()
    }

    /// 是否为纯容器（Sequential / ModuleList）
    fn is_container(&self) -> bool {
        false
    }

    fn forward(&self, input: &Tensor, mode: Mode) -> Result<LayerOutput, ModelError>;

    /// 本层字段与参数形状是否自洽（不含子模块）
    fn check(&self) -> Result<(), String> {
        Ok(())
    }

    /// 本层及所有后代的结构检查；从文件读入的网络须先通过检查才能前向传播
    fn validate(&self) -> Result<(), ModelError> {
        self.check()
            .map_err(|e| ModelError::Format(format!("{}: {e}", self.kind())))?;
        for (name, child) in self.children() {
            child.validate().map_err(|e| match e {
                ModelError::Format(msg) => ModelError::Format(format!("{name}.{msg}")),
                other => other,
            })?;
        }
        Ok(())
    }

    /// 本层及所有后代的参数
    fn parameters(&self) -> Vec<&Parameter> {
        let mut params: Vec<&Parameter> =
            self.own_parameters().into_iter().map(|(_, p)| p).collect();
        for (_, child) in self.children() {
            params.extend(child.parameters());
        }
        params
    }

    /// 本层及所有后代的参数与缓冲区，键为`child.weight`形式的点分路径
    fn named_tensors(&self) -> Vec<(String, &Tensor)> {
        let mut tensors: Vec<(String, &Tensor)> = self
            .own_parameters()
            .into_iter()
            .map(|(name, p)| (name.to_string(), p.value()))
            .chain(self.buffers().into_iter().map(|(name, t)| (name.to_string(), t)))
            .collect();
        for (child_name, child) in self.children() {
            tensors.extend(
                child
                    .named_tensors()
                    .into_iter()
                    .map(|(name, t)| (format!("{child_name}.{name}"), t)),
            );
        }
        tensors
    }
}

/// 封闭的层类型枚举
#[enum_dispatch(TraitLayer)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Layer {
    Conv2d,
    Linear,
    BatchNorm2d,
    Embedding,
    LayerNorm,
    TransformerEncoderLayer,
    TransformerEncoder,
    MultiheadAttention,
    MaxPool2d,
    AvgPool2d,
    AdaptiveAvgPool2d,
    ReLU,
    GELU,
    Dropout,
    Flatten,
    Sequential,
    ModuleList,
}

/// 把任意形状的输入按最后一维切成二维数组[N, last]，用于逐行运算
pub(crate) fn rows_of(
    input: &Tensor,
    layer: &'static str,
    last_dim: usize,
) -> Result<ndarray::Array2<f32>, ModelError> {
    let shape = input.shape();
    let err = || ModelError::InvalidInput {
        layer,
        expected: format!("[..., {last_dim}]"),
        got: shape.to_vec(),
    };
    if shape.last() != Some(&last_dim) {
        return Err(err());
    }
    let rows = input.size() / last_dim.max(1);
    input
        .reshape(&[rows, last_dim])?
        .into_array()
        .into_dimensionality::<ndarray::Ix2>()
        .map_err(|_| err())
}

/// `rows_of`的逆操作：把[N, out]还原为[..., out]
pub(crate) fn from_rows(
    rows: ndarray::Array2<f32>,
    leading: &[usize],
) -> Result<Tensor, ModelError> {
    let mut shape = leading.to_vec();
    shape.push(rows.ncols());
    Ok(Tensor::from_array(rows.into_dyn()).reshape(&shape)?)
}

/// 要求`tensor`的形状恰为`expected`
pub(crate) fn expect_shape(name: &str, tensor: &Tensor, expected: &[usize]) -> Result<(), String> {
    if tensor.shape() == expected {
        Ok(())
    } else {
        Err(format!(
            "{name} 形状应为 {expected:?}，实际为 {:?}",
            tensor.shape()
        ))
    }
}

/// 要求窗口大小、步长等为正
pub(crate) fn expect_positive(name: &str, value: usize) -> Result<(), String> {
    if value == 0 {
        Err(format!("{name} 必须为正"))
    } else {
        Ok(())
    }
}

/// 要求输入为4D [batch, C, H, W]
pub(crate) fn expect_4d<'a>(
    input: &'a Tensor,
    layer: &'static str,
) -> Result<ndarray::ArrayView4<'a, f32>, ModelError> {
    input
        .view()
        .into_dimensionality::<ndarray::Ix4>()
        .map_err(|_| ModelError::InvalidInput {
            layer,
            expected: "4D [batch, C, H, W]".to_string(),
            got: input.shape().to_vec(),
        })
}
