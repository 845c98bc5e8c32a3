/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : BatchNorm2d 层
 *
 * y = (x - mean) / √(var + eps) * weight + bias，按通道（第1维）归一化。
 * - 推理模式：使用滑动统计量 running_mean / running_var
 * - 训练模式：使用当前批次在 (N, H, W) 上的统计量（有偏方差）；
 *   本库不训练，因此不回写滑动统计量
 */

use super::{LayerOutput, LayerParams, Mode, TraitLayer, expect_4d, expect_shape};
use crate::nn::{Init, ModelError, Parameter};
use crate::tensor::Tensor;
use ndarray::{Axis, s};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchNorm2d {
    num_features: usize,
    eps: f32,
    /// γ [num_features]
    weight: Parameter,
    /// β [num_features]
    bias: Parameter,
    running_mean: Tensor,
    running_var: Tensor,
}

impl BatchNorm2d {
    pub fn new(num_features: usize) -> Self {
        Self {
            num_features,
            eps: 1e-5,
            weight: Parameter::init(Init::Ones, &[num_features]),
            bias: Parameter::init(Init::Zeros, &[num_features]),
            running_mean: Tensor::zeros(&[num_features]),
            running_var: Tensor::ones(&[num_features]),
        }
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn eps(&self) -> f32 {
        self.eps
    }

    pub fn running_mean(&self) -> &Tensor {
        &self.running_mean
    }

    pub fn running_var(&self) -> &Tensor {
        &self.running_var
    }

    /// 替换滑动统计量（用于载入外部统计结果）
    pub fn set_running_stats(&mut self, mean: Tensor, var: Tensor) -> Result<(), ModelError> {
        for t in [&mean, &var] {
            if t.shape() != [self.num_features] {
                return Err(ModelError::InvalidInput {
                    layer: "BatchNorm2d",
                    expected: format!("[{}]", self.num_features),
                    got: t.shape().to_vec(),
                });
            }
        }
        self.running_mean = mean;
        self.running_var = var;
        Ok(())
    }
}

impl TraitLayer for BatchNorm2d {
    fn kind(&self) -> &'static str {
        "BatchNorm2d"
    }

    fn params(&self) -> LayerParams {
        LayerParams::BatchNorm2d {
            num_features: self.num_features,
        }
    }

    fn own_parameters(&self) -> Vec<(&'static str, &Parameter)> {
        vec![("weight", &self.weight), ("bias", &self.bias)]
    }

    fn buffers(&self) -> Vec<(&'static str, &Tensor)> {
        vec![
            ("running_mean", &self.running_mean),
            ("running_var", &self.running_var),
        ]
    }

    fn check(&self) -> Result<(), String> {
        if !(self.eps.is_finite() && self.eps > 0.) {
            return Err(format!("eps 必须为正，实际为 {}", self.eps));
        }
        let expected = [self.num_features];
        expect_shape("weight", self.weight.value(), &expected)?;
        expect_shape("bias", self.bias.value(), &expected)?;
        expect_shape("running_mean", &self.running_mean, &expected)?;
        expect_shape("running_var", &self.running_var, &expected)
    }

    fn forward(&self, input: &Tensor, mode: Mode) -> Result<LayerOutput, ModelError> {
        let x = expect_4d(input, "BatchNorm2d")?;
        if x.dim().1 != self.num_features {
            return Err(ModelError::InvalidInput {
                layer: "BatchNorm2d",
                expected: format!("通道数为 {}", self.num_features),
                got: input.shape().to_vec(),
            });
        }

        let gamma = self.weight.value().to_vec();
        let beta = self.bias.value().to_vec();
        let (mean, var) = match mode {
            Mode::Eval => (self.running_mean.to_vec(), self.running_var.to_vec()),
            Mode::Train => (0..self.num_features)
                .map(|c| {
                    let channel = x.slice(s![.., c, .., ..]);
                    let mean = channel.mean().unwrap_or(0.);
                    let var = channel.mapv(|v| (v - mean).powi(2)).mean().unwrap_or(0.);
                    (mean, var)
                })
                .unzip(),
        };

        let mut out = x.to_owned();
        for (c, mut channel) in out.axis_iter_mut(Axis(1)).enumerate() {
            let scale = gamma[c] / (var[c] + self.eps).sqrt();
            let shift = beta[c] - mean[c] * scale;
            channel.mapv_inplace(|v| v * scale + shift);
        }
        Ok(Tensor::from_array(out.into_dyn()).into())
    }
}
