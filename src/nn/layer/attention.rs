/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : MultiheadAttention（batch_first，自注意力）
 *
 * 参数布局与 PyTorch 一致：
 * - in_proj_weight [3E, E]、in_proj_bias [3E]：打包的 Q/K/V 投影，由本层直接持有
 * - out_proj：嵌套的 Linear(E, E)
 *
 * 前向输出为元组 (attn_output [B, S, E], 各头平均的注意力权重 [B, S, S])。
 */

use super::{Linear, LayerOutput, LayerParams, Mode, TraitLayer, expect_shape, rows_of};
use crate::nn::{Init, ModelError, Parameter};
use crate::tensor::Tensor;
use ndarray::{Array2, Array3, Axis, Ix1, Ix2, s};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiheadAttention {
    embed_dim: usize,
    num_heads: usize,
    in_proj_weight: Parameter,
    in_proj_bias: Parameter,
    out_proj: Linear,
}

impl MultiheadAttention {
    /// `embed_dim`须能被`num_heads`整除
    pub fn new(embed_dim: usize, num_heads: usize) -> Result<Self, ModelError> {
        if num_heads == 0 || embed_dim % num_heads != 0 {
            return Err(ModelError::Format(format!(
                "embed_dim({embed_dim})必须能被num_heads({num_heads})整除"
            )));
        }
        Ok(Self {
            embed_dim,
            num_heads,
            in_proj_weight: Parameter::init(
                Init::XavierUniform {
                    fan_in: embed_dim,
                    fan_out: 3 * embed_dim,
                },
                &[3 * embed_dim, embed_dim],
            ),
            in_proj_bias: Parameter::init(Init::Zeros, &[3 * embed_dim]),
            out_proj: Linear::new(embed_dim, embed_dim, true).with_zero_bias(),
        })
    }

    pub fn embed_dim(&self) -> usize {
        self.embed_dim
    }

    pub fn num_heads(&self) -> usize {
        self.num_heads
    }

    pub fn out_proj(&self) -> &Linear {
        &self.out_proj
    }

    /// 自注意力：返回 (输出 [B, S, E], 平均注意力权重 [B, S, S])
    pub fn attend(&self, input: &Tensor) -> Result<(Tensor, Tensor), ModelError> {
        let shape = input.shape();
        if shape.len() != 3 || shape[2] != self.embed_dim {
            return Err(ModelError::InvalidInput {
                layer: "MultiheadAttention",
                expected: format!("[batch, seq, {}]", self.embed_dim),
                got: shape.to_vec(),
            });
        }
        let (batch, seq, embed) = (shape[0], shape[1], self.embed_dim);
        let head_dim = embed / self.num_heads;
        let scale = 1. / (head_dim as f32).sqrt();

        let w = self
            .in_proj_weight
            .value()
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| ModelError::Format("in_proj_weight 不是 2D".to_string()))?;
        let b = self
            .in_proj_bias
            .value()
            .view()
            .into_dimensionality::<Ix1>()
            .map_err(|_| ModelError::Format("in_proj_bias 不是 1D".to_string()))?;

        let rows = rows_of(input, "MultiheadAttention", embed)?;
        let mut qkv = rows.dot(&w.t());
        for mut row in qkv.axis_iter_mut(Axis(0)) {
            row += &b;
        }

        let mut concat = Array2::<f32>::zeros((batch * seq, embed));
        let mut weights = Array3::<f32>::zeros((batch, seq, seq));
        for bi in 0..batch {
            let r = bi * seq..(bi + 1) * seq;
            for h in 0..self.num_heads {
                let c = h * head_dim;
                let q = qkv.slice(s![r.clone(), c..c + head_dim]);
                let k = qkv.slice(s![r.clone(), embed + c..embed + c + head_dim]);
                let v = qkv.slice(s![r.clone(), 2 * embed + c..2 * embed + c + head_dim]);

                let mut scores = q.dot(&k.t()) * scale;
                softmax_rows(&mut scores);
                concat
                    .slice_mut(s![r.clone(), c..c + head_dim])
                    .assign(&scores.dot(&v));
                let mut avg = weights.index_axis_mut(Axis(0), bi);
                avg.scaled_add(1. / self.num_heads as f32, &scores);
            }
        }

        let attn = Tensor::from_array(concat.into_dyn()).reshape(&[batch, seq, embed])?;
        let output = self
            .out_proj
            .forward(&attn, Mode::Eval)?
            .into_primary()
            .ok_or_else(|| ModelError::EmptyOutput("out_proj".to_string()))?;
        Ok((output, Tensor::from_array(weights.into_dyn())))
    }
}

/// 按行做数值稳定的 softmax
fn softmax_rows(m: &mut Array2<f32>) {
    for mut row in m.axis_iter_mut(Axis(0)) {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        if sum > 0. {
            row.mapv_inplace(|v| v / sum);
        }
    }
}

impl TraitLayer for MultiheadAttention {
    fn kind(&self) -> &'static str {
        "MultiheadAttention"
    }

    fn params(&self) -> LayerParams {
        LayerParams::MultiheadAttention {
            embed_dim: self.embed_dim,
            num_heads: self.num_heads,
        }
    }

    fn own_parameters(&self) -> Vec<(&'static str, &Parameter)> {
        vec![
            ("in_proj_weight", &self.in_proj_weight),
            ("in_proj_bias", &self.in_proj_bias),
        ]
    }

    fn children(&self) -> Vec<(String, &dyn TraitLayer)> {
        vec![("out_proj".to_string(), &self.out_proj as &dyn TraitLayer)]
    }

    fn check(&self) -> Result<(), String> {
        let embed = self.embed_dim;
        if self.num_heads == 0 || embed % self.num_heads != 0 {
            return Err(format!(
                "embed_dim({embed})必须能被num_heads({})整除",
                self.num_heads
            ));
        }
        expect_shape("in_proj_weight", self.in_proj_weight.value(), &[3 * embed, embed])?;
        expect_shape("in_proj_bias", self.in_proj_bias.value(), &[3 * embed])?;
        if self.out_proj.in_features() != embed || self.out_proj.out_features() != embed {
            return Err(format!("out_proj 应为 Linear({embed}, {embed})"));
        }
        Ok(())
    }

    fn forward(&self, input: &Tensor, _mode: Mode) -> Result<LayerOutput, ModelError> {
        let (output, weights) = self.attend(input)?;
        Ok(LayerOutput::Tuple(vec![output, weights]))
    }
}
