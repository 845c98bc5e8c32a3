/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : TransformerEncoderLayer / TransformerEncoder（post-norm，batch_first）
 *
 * TransformerEncoderLayer 前向：
 *   x = norm1(x + dropout1(self_attn(x)))
 *   x = norm2(x + dropout2(linear2(dropout(activation(linear1(x))))))
 *
 * 两者都不直接持有参数，全部参数在子模块中。
 */

use super::{
    Dropout, GELU, Layer, LayerNorm, LayerOutput, LayerParams, Linear, Mode, ModuleList,
    MultiheadAttention, TraitLayer,
};
use crate::nn::ModelError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// 前馈网络的激活函数（PyTorch 中以函数形式传入，不是子模块）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedForwardActivation {
    #[default]
    Relu,
    Gelu,
}

impl FeedForwardActivation {
    fn apply(&self, x: &Tensor) -> Tensor {
        match self {
            Self::Relu => x.map(|v| v.max(0.)),
            Self::Gelu => x.map(GELU::apply),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerEncoderLayer {
    d_model: usize,
    nhead: usize,
    activation: FeedForwardActivation,
    self_attn: MultiheadAttention,
    linear1: Linear,
    dropout: Dropout,
    linear2: Linear,
    norm1: LayerNorm,
    norm2: LayerNorm,
    dropout1: Dropout,
    dropout2: Dropout,
}

impl TransformerEncoderLayer {
    pub fn new(
        d_model: usize,
        nhead: usize,
        dim_feedforward: usize,
        dropout: f32,
        activation: FeedForwardActivation,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            d_model,
            nhead,
            activation,
            self_attn: MultiheadAttention::new(d_model, nhead)?,
            linear1: Linear::new(d_model, dim_feedforward, true),
            dropout: Dropout::new(dropout),
            linear2: Linear::new(dim_feedforward, d_model, true),
            norm1: LayerNorm::new(&[d_model]),
            norm2: LayerNorm::new(&[d_model]),
            dropout1: Dropout::new(dropout),
            dropout2: Dropout::new(dropout),
        })
    }

    pub fn d_model(&self) -> usize {
        self.d_model
    }

    pub fn nhead(&self) -> usize {
        self.nhead
    }

    pub fn activation(&self) -> FeedForwardActivation {
        self.activation
    }
}

/// 取单输出层的张量
fn run(layer: &dyn TraitLayer, x: &Tensor, mode: Mode) -> Result<Tensor, ModelError> {
    layer
        .forward(x, mode)?
        .into_primary()
        .ok_or_else(|| ModelError::EmptyOutput(layer.kind().to_string()))
}

impl TraitLayer for TransformerEncoderLayer {
    fn kind(&self) -> &'static str {
        "TransformerEncoderLayer"
    }

    fn params(&self) -> LayerParams {
        LayerParams::TransformerEncoderLayer {
            d_model: self.d_model,
            nhead: self.nhead,
        }
    }

    fn children(&self) -> Vec<(String, &dyn TraitLayer)> {
        vec![
            ("self_attn".to_string(), &self.self_attn as &dyn TraitLayer),
            ("linear1".to_string(), &self.linear1 as &dyn TraitLayer),
            ("dropout".to_string(), &self.dropout as &dyn TraitLayer),
            ("linear2".to_string(), &self.linear2 as &dyn TraitLayer),
            ("norm1".to_string(), &self.norm1 as &dyn TraitLayer),
            ("norm2".to_string(), &self.norm2 as &dyn TraitLayer),
            ("dropout1".to_string(), &self.dropout1 as &dyn TraitLayer),
            ("dropout2".to_string(), &self.dropout2 as &dyn TraitLayer),
        ]
    }

    fn check(&self) -> Result<(), String> {
        let d = self.d_model;
        if self.self_attn.embed_dim() != d || self.self_attn.num_heads() != self.nhead {
            return Err(format!("self_attn 应为 d_model={d}、nhead={}", self.nhead));
        }
        let ff = self.linear1.out_features();
        if self.linear1.in_features() != d
            || self.linear2.in_features() != ff
            || self.linear2.out_features() != d
        {
            return Err(format!("前馈层应为 Linear({d}, {ff}) 与 Linear({ff}, {d})"));
        }
        for norm in [&self.norm1, &self.norm2] {
            if norm.normalized_shape() != [d] {
                return Err(format!("LayerNorm 应作用于 [{d}]"));
            }
        }
        Ok(())
    }

    fn forward(&self, input: &Tensor, mode: Mode) -> Result<LayerOutput, ModelError> {
        let (attn, _) = self.self_attn.attend(input)?;
        let attn = run(&self.dropout1, &attn, mode)?;
        let x = run(&self.norm1, &input.checked_add(&attn)?, mode)?;

        let h = self.activation.apply(&run(&self.linear1, &x, mode)?);
        let h = run(&self.dropout, &h, mode)?;
        let h = run(&self.dropout2, &run(&self.linear2, &h, mode)?, mode)?;
        Ok(run(&self.norm2, &x.checked_add(&h)?, mode)?.into())
    }
}

/// 由若干个结构相同的编码层堆叠而成，可选末尾归一化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerEncoder {
    layers: ModuleList,
    num_layers: usize,
    norm: Option<LayerNorm>,
}

impl TransformerEncoder {
    /// 与 PyTorch 一致：每层都是`encoder_layer`的深拷贝，因此初始权重完全相同
    pub fn new(
        encoder_layer: TransformerEncoderLayer,
        num_layers: usize,
        norm: Option<LayerNorm>,
    ) -> Self {
        let layers = (0..num_layers)
            .map(|_| Layer::from(encoder_layer.clone()))
            .collect();
        Self {
            layers: ModuleList::new(layers),
            num_layers,
            norm,
        }
    }

    pub fn num_layers(&self) -> usize {
        self.num_layers
    }

    pub fn layers(&self) -> &ModuleList {
        &self.layers
    }
}

impl TraitLayer for TransformerEncoder {
    fn kind(&self) -> &'static str {
        "TransformerEncoder"
    }

    fn params(&self) -> LayerParams {
        LayerParams::TransformerEncoder {
            num_layers: self.num_layers,
        }
    }

    fn children(&self) -> Vec<(String, &dyn TraitLayer)> {
        let mut children = vec![("layers".to_string(), &self.layers as &dyn TraitLayer)];
        if let Some(norm) = &self.norm {
            children.push(("norm".to_string(), norm as &dyn TraitLayer));
        }
        children
    }

    fn check(&self) -> Result<(), String> {
        let stacked = self.layers.layers().len();
        if stacked != self.num_layers {
            return Err(format!(
                "num_layers 为 {}，实际堆叠了 {stacked} 层",
                self.num_layers
            ));
        }
        Ok(())
    }

    fn forward(&self, input: &Tensor, mode: Mode) -> Result<LayerOutput, ModelError> {
        let mut x = input.clone();
        for layer in self.layers.layers() {
            x = run(layer, &x, mode)?;
        }
        if let Some(norm) = &self.norm {
            x = run(norm, &x, mode)?;
        }
        Ok(x.into())
    }
}
