/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : LayerNorm 层：在末尾`normalized_shape`对应的维度上归一化（有偏方差）
 */

use super::{LayerOutput, LayerParams, Mode, TraitLayer, expect_shape, from_rows, rows_of};
use crate::nn::{Init, ModelError, Parameter};
use crate::tensor::Tensor;
use ndarray::Axis;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerNorm {
    normalized_shape: Vec<usize>,
    eps: f32,
    weight: Parameter,
    bias: Parameter,
}

impl LayerNorm {
    pub fn new(normalized_shape: &[usize]) -> Self {
        Self {
            normalized_shape: normalized_shape.to_vec(),
            eps: 1e-5,
            weight: Parameter::init(Init::Ones, normalized_shape),
            bias: Parameter::init(Init::Zeros, normalized_shape),
        }
    }

    pub fn normalized_shape(&self) -> &[usize] {
        &self.normalized_shape
    }

    fn trailing_len(&self) -> usize {
        self.normalized_shape.iter().product()
    }
}

impl TraitLayer for LayerNorm {
    fn kind(&self) -> &'static str {
        "LayerNorm"
    }

    fn params(&self) -> LayerParams {
        LayerParams::LayerNorm {
            normalized_shape: self.normalized_shape.clone(),
        }
    }

    fn own_parameters(&self) -> Vec<(&'static str, &Parameter)> {
        vec![("weight", &self.weight), ("bias", &self.bias)]
    }

    fn check(&self) -> Result<(), String> {
        if self.normalized_shape.is_empty() || self.trailing_len() == 0 {
            return Err(format!("normalized_shape 无效: {:?}", self.normalized_shape));
        }
        if !(self.eps.is_finite() && self.eps > 0.) {
            return Err(format!("eps 必须为正，实际为 {}", self.eps));
        }
        expect_shape("weight", self.weight.value(), &self.normalized_shape)?;
        expect_shape("bias", self.bias.value(), &self.normalized_shape)
    }

    fn forward(&self, input: &Tensor, _mode: Mode) -> Result<LayerOutput, ModelError> {
        let shape = input.shape();
        let k = self.normalized_shape.len();
        if shape.len() < k || shape[shape.len() - k..] != self.normalized_shape[..] {
            return Err(ModelError::InvalidInput {
                layer: "LayerNorm",
                expected: format!("[..., {:?}]", self.normalized_shape),
                got: shape.to_vec(),
            });
        }

        let n = self.trailing_len();
        let flat = input.reshape(&[input.size() / n.max(1), n])?;
        let mut rows = rows_of(&flat, "LayerNorm", n)?;
        let gamma = self.weight.value().to_vec();
        let beta = self.bias.value().to_vec();
        for mut row in rows.axis_iter_mut(Axis(0)) {
            let mean = row.mean().unwrap_or(0.);
            let var = row.mapv(|v| (v - mean).powi(2)).mean().unwrap_or(0.);
            let inv = 1. / (var + self.eps).sqrt();
            for (i, v) in row.iter_mut().enumerate() {
                *v = (*v - mean) * inv * gamma[i] + beta[i];
            }
        }
        let out = from_rows(rows, &[flat.shape()[0]])?;
        Ok(out.reshape(shape)?.into())
    }
}
