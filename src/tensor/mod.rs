/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 张量（Tensor）：基于ndarray的动态维度f32数组，供网络层、激活捕获与热力图渲染使用
 */

use ndarray::{Array, ArrayD, IxDyn};
use rand::Rng;
use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::errors::{ComparisonOperator, TensorError};

mod ops {
    pub mod add;
    pub mod others;
}

mod property;
mod shape;
mod stats;

#[cfg(test)]
mod tests;

/// 定义张量的结构体。其可以是标量、向量、矩阵或更高维度的数组。
/// 注：只要通Tensor初始化的都是张量（即使标量也是张量）；
/// 而通常意义上的数字（类型为usize、i32、f64等）就只是纯数（number），在这里不被认为是张量。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    data: ArrayD<f32>,
}

impl Tensor {
    /// 创建一个张量，若为标量，`shape`可以是[]、[1]、[1,1]...
    /// 注：`data`的长度必须和`shape`中所有元素的乘积相等，否则会panic。
    /// 需要处理外部输入（如上传文件）时请使用`try_new`。
    pub fn new(data: &[f32], shape: &[usize]) -> Tensor {
        match Self::try_new(data.to_vec(), shape) {
            Ok(tensor) => tensor,
            Err(e) => panic!("{}", e),
        }
    }

    /// `new`的非panic版本
    pub fn try_new(data: Vec<f32>, shape: &[usize]) -> Result<Tensor, TensorError> {
        let data_len = data.len();
        Array::from_shape_vec(IxDyn(shape), data)
            .map(|data| Tensor { data })
            .map_err(|_| TensorError::DataShapeMismatch {
                data_len,
                shape: shape.to_vec(),
            })
    }

    /// 创建一个所有元素均为`value`的张量
    pub fn full(value: f32, shape: &[usize]) -> Tensor {
        Tensor {
            data: Array::from_elem(IxDyn(shape), value),
        }
    }

    pub fn zeros(shape: &[usize]) -> Tensor {
        Self::full(0., shape)
    }

    pub fn ones(shape: &[usize]) -> Tensor {
        Self::full(1., shape)
    }

    /// 创建一个随机张量，其值在[min, max]的闭区间
    pub fn new_random(min: f32, max: f32, shape: &[usize]) -> Tensor {
        let mut rng = rand::thread_rng();
        let uniform = Uniform::from(min..=max);
        let data = (0..shape.iter().product::<usize>())
            .map(|_| uniform.sample(&mut rng))
            .collect::<Vec<_>>();
        Tensor::new(&data, shape)
    }

    /// 创建一个服从正态分布的随机张量（Box-Muller变换）
    pub fn new_normal(mean: f32, std_dev: f32, shape: &[usize]) -> Tensor {
        let mut rng = rand::thread_rng();
        let unit = Uniform::new(0.0f32, 1.0);
        let data_len = shape.iter().product::<usize>();
        let mut data = Vec::with_capacity(data_len);

        while data.len() < data_len {
            let u1 = unit.sample(&mut rng);
            let u2 = unit.sample(&mut rng);
            let r = (-2.0 * u1.ln()).sqrt();
            let theta = 2.0 * std::f32::consts::PI * u2;
            let z0 = mean + std_dev * r * theta.cos();
            let z1 = mean + std_dev * r * theta.sin();

            if z0.is_finite() {
                data.push(z0);
            }
            if data.len() < data_len && z1.is_finite() {
                data.push(z1);
            }
        }

        Tensor::new(&data, shape)
    }

    /// 创建一个元素为[low, high)区间内随机整数的张量（以f32存储），常用于token序列
    pub fn new_random_int(low: usize, high: usize, shape: &[usize]) -> Tensor {
        assert!(
            high > low,
            "{}",
            TensorError::ValueMustSatisfyComparison {
                value_name: "high".to_string(),
                operator: ComparisonOperator::GreaterThan,
                threshold: low,
            }
        );
        let mut rng = rand::thread_rng();
        let data = (0..shape.iter().product::<usize>())
            .map(|_| rng.gen_range(low..high) as f32)
            .collect::<Vec<_>>();
        Tensor::new(&data, shape)
    }

    /// 创建形状为[n]的张量：0, 1, ..., n-1
    pub fn arange(n: usize) -> Tensor {
        let data = (0..n).map(|i| i as f32).collect::<Vec<_>>();
        Tensor::new(&data, &[n])
    }

    pub(crate) fn from_array(data: ArrayD<f32>) -> Tensor {
        Tensor { data }
    }

    pub(crate) fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    pub(crate) fn into_array(self) -> ArrayD<f32> {
        self.data
    }
}
