/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 可学习参数与初始化策略
 *
 * 初始化与 PyTorch 各层的默认行为保持一致：
 * - Conv2d / Linear：kaiming_uniform(a=√5)，即 U(-1/√fan_in, 1/√fan_in)；偏置同界
 * - MultiheadAttention 输入投影：xavier_uniform
 * - Embedding：N(0, 1)
 * - 归一化层：weight=1，bias=0
 */

use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// 参数初始化方式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Init {
    /// 全零
    Zeros,
    /// 全一
    Ones,
    /// 正态分布
    Normal { mean: f32, std: f32 },
    /// U(-1/√fan_in, 1/√fan_in)
    KaimingUniform { fan_in: usize },
    /// U(-√(6/(fan_in+fan_out)), √(6/(fan_in+fan_out)))
    XavierUniform { fan_in: usize, fan_out: usize },
}

impl Init {
    /// 生成初始化后的 Tensor
    pub fn generate(&self, shape: &[usize]) -> Tensor {
        match *self {
            Self::Zeros => Tensor::zeros(shape),
            Self::Ones => Tensor::ones(shape),
            Self::Normal { mean, std } => Tensor::new_normal(mean, std, shape),
            Self::KaimingUniform { fan_in } => {
                let bound = 1.0 / (fan_in.max(1) as f32).sqrt();
                Tensor::new_random(-bound, bound, shape)
            }
            Self::XavierUniform { fan_in, fan_out } => {
                let bound = (6.0 / (fan_in + fan_out).max(1) as f32).sqrt();
                Tensor::new_random(-bound, bound, shape)
            }
        }
    }
}

/// 可学习参数：值 + 是否参与训练
///
/// 本库只做推理，`requires_grad`仅用于统计可训练参数量
/// （上传的模型可能冻结了部分参数）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    value: Tensor,
    requires_grad: bool,
}

impl Parameter {
    pub fn new(value: Tensor) -> Self {
        Self {
            value,
            requires_grad: true,
        }
    }

    pub fn init(init: Init, shape: &[usize]) -> Self {
        Self::new(init.generate(shape))
    }

    pub fn value(&self) -> &Tensor {
        &self.value
    }

    pub fn set_value(&mut self, value: Tensor) {
        self.value = value;
    }

    /// 元素个数（对应PyTorch的`numel()`）
    pub fn numel(&self) -> usize {
        self.value.size()
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    pub fn set_requires_grad(&mut self, requires_grad: bool) {
        self.requires_grad = requires_grad;
    }
}
