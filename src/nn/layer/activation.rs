/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 无参数的逐元素层：ReLU、GELU、Dropout，以及形状层 Flatten
 */

use super::{LayerOutput, Mode, TraitLayer};
use crate::nn::ModelError;
use crate::tensor::Tensor;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReLU;

impl TraitLayer for ReLU {
    fn kind(&self) -> &'static str {
        "ReLU"
    }

    fn forward(&self, input: &Tensor, _mode: Mode) -> Result<LayerOutput, ModelError> {
        Ok(input.map(|x| x.max(0.)).into())
    }
}

/// GELU，使用精确的 erf 形式：`x * Φ(x) = 0.5x(1 + erf(x/√2))`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GELU;

impl GELU {
    pub fn apply(x: f32) -> f32 {
        0.5 * x * (1. + erf(x / std::f32::consts::SQRT_2))
    }
}

impl TraitLayer for GELU {
    fn kind(&self) -> &'static str {
        "GELU"
    }

    fn forward(&self, input: &Tensor, _mode: Mode) -> Result<LayerOutput, ModelError> {
        Ok(input.map(Self::apply).into())
    }
}

/// erf 的 Abramowitz–Stegun 7.1.26 近似，最大误差约 1.5e-7
pub(crate) fn erf(x: f32) -> f32 {
    const P: f64 = 0.327_591_1;
    const A: [f64; 5] = [
        0.254_829_592,
        -0.284_496_736,
        1.421_413_741,
        -1.453_152_027,
        1.061_405_429,
    ];
    let sign = if x < 0. { -1. } else { 1. };
    let x = (x as f64).abs();
    let t = 1. / (1. + P * x);
    let poly = A.iter().rev().fold(0., |acc, a| acc * t + a) * t;
    (sign * (1. - poly * (-x * x).exp())) as f32
}

/// Dropout：训练模式下以概率 `p` 置零并按 `1/(1-p)` 缩放，推理模式下为恒等映射
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dropout {
    p: f32,
}

impl Dropout {
    pub fn new(p: f32) -> Self {
        Self { p: p.clamp(0., 1.) }
    }

    pub fn p(&self) -> f32 {
        self.p
    }
}

impl Default for Dropout {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl TraitLayer for Dropout {
    fn kind(&self) -> &'static str {
        "Dropout"
    }

    fn check(&self) -> Result<(), String> {
        if (0. ..=1.).contains(&self.p) {
            Ok(())
        } else {
            Err(format!("p 应在 [0, 1] 内，实际为 {}", self.p))
        }
    }

    fn forward(&self, input: &Tensor, mode: Mode) -> Result<LayerOutput, ModelError> {
        if mode == Mode::Eval || self.p == 0. {
            return Ok(input.clone().into());
        }
        if self.p >= 1. {
            return Ok(Tensor::zeros(input.shape()).into());
        }
        let keep = 1. - self.p;
        let mut rng = rand::thread_rng();
        Ok(input
            .map(|x| if rng.gen_range(0.0..1.0) < keep { x / keep } else { 0. })
            .into())
    }
}

/// Flatten：把`start_dim`及之后的维度展平为一维
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Flatten {
    start_dim: usize,
}

impl Flatten {
    pub fn new(start_dim: usize) -> Self {
        Self { start_dim }
    }
}

impl Default for Flatten {
    fn default() -> Self {
        Self::new(1)
    }
}

impl TraitLayer for Flatten {
    fn kind(&self) -> &'static str {
        "Flatten"
    }

    fn forward(&self, input: &Tensor, _mode: Mode) -> Result<LayerOutput, ModelError> {
        Ok(input.flatten_from(self.start_dim)?.into())
    }
}
