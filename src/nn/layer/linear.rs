/*
 * @Author       : 老董
 * @Date         : 2026-01-17
 * @LastEditTime : 2026-02-11
 * @Description  : Linear (全连接) 层
 *
 * PyTorch 风格：`output = x @ Wᵀ + b`，作用在输入的最后一维上，
 * 因此 [batch, in] 与 [batch, seq, in] 的输入都可直接使用。
 */

use super::{LayerOutput, LayerParams, Mode, TraitLayer, expect_shape, from_rows, rows_of};
use crate::nn::{Init, ModelError, Parameter};
use crate::tensor::Tensor;
use ndarray::{Axis, Ix1, Ix2};
use serde::{Deserialize, Serialize};

/// Linear (全连接) 层
///
/// # 输入/输出形状
/// - 输入：[..., in_features]
/// - 输出：[..., out_features]
///
/// # 使用示例
/// ```ignore
/// let fc = Linear::new(64, 10, true);
/// let logits = fc.forward(&h, Mode::Eval)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    /// 权重参数 [out_features, in_features]
    weight: Parameter,
    /// 偏置参数 [out_features]（可选）
    bias: Option<Parameter>,
    in_features: usize,
    out_features: usize,
}

impl Linear {
    pub fn new(in_features: usize, out_features: usize, use_bias: bool) -> Self {
        let init = Init::KaimingUniform {
            fan_in: in_features,
        };
        Self {
            weight: Parameter::init(init, &[out_features, in_features]),
            bias: use_bias.then(|| Parameter::init(init, &[out_features])),
            in_features,
            out_features,
        }
    }

    /// 把偏置清零（MultiheadAttention 的输出投影按此初始化）
    pub(crate) fn with_zero_bias(mut self) -> Self {
        if let Some(bias) = self.bias.as_mut() {
            bias.set_value(Tensor::zeros(&[self.out_features]));
        }
        self
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn weight(&self) -> &Parameter {
        &self.weight
    }

    pub fn bias(&self) -> Option<&Parameter> {
        self.bias.as_ref()
    }

    pub fn weight_mut(&mut self) -> &mut Parameter {
        &mut self.weight
    }

    pub fn bias_mut(&mut self) -> Option<&mut Parameter> {
        self.bias.as_mut()
    }
}

impl TraitLayer for Linear {
    fn kind(&self) -> &'static str {
        "Linear"
    }

    fn params(&self) -> LayerParams {
        LayerParams::Linear {
            in_features: self.in_features,
            out_features: self.out_features,
        }
    }

    fn own_parameters(&self) -> Vec<(&'static str, &Parameter)> {
        let mut params = vec![("weight", &self.weight)];
        if let Some(ref bias) = self.bias {
            params.push(("bias", bias));
        }
        params
    }

    fn check(&self) -> Result<(), String> {
        expect_shape(
            "weight",
            self.weight.value(),
            &[self.out_features, self.in_features],
        )?;
        match &self.bias {
            Some(bias) => expect_shape("bias", bias.value(), &[self.out_features]),
            None => Ok(()),
        }
    }

    fn forward(&self, input: &Tensor, _mode: Mode) -> Result<LayerOutput, ModelError> {
        let rows = rows_of(input, "Linear", self.in_features)?;
        let weight = self
            .weight
            .value()
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| ModelError::Format("Linear 权重不是 2D".to_string()))?;

        let mut out = rows.dot(&weight.t());
        if let Some(bias) = &self.bias {
            let bias = bias
                .value()
                .view()
                .into_dimensionality::<Ix1>()
                .map_err(|_| ModelError::Format("Linear 偏置不是 1D".to_string()))?;
            for mut row in out.axis_iter_mut(Axis(0)) {
                row += &bias;
            }
        }

        let shape = input.shape();
        Ok(from_rows(out, &shape[..shape.len() - 1])?.into())
    }
}
