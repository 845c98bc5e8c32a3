/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 2D 池化层：MaxPool2d、AvgPool2d、AdaptiveAvgPool2d
 *
 * 输入/输出形状：[batch, C, H, W] → [batch, C, H', W']
 * 定长池化：H' = (H - kernel) / stride + 1（无填充，向下取整）
 * 自适应池化：第 i 个输出窗口为 [⌊i·H/out⌋, ⌈(i+1)·H/out⌉)
 */

use super::{LayerOutput, LayerParams, Mode, TraitLayer, expect_4d, expect_positive};
use crate::nn::ModelError;
use crate::tensor::Tensor;
use ndarray::{Array4, ArrayView4, s};
use serde::{Deserialize, Serialize};

/// 对每个窗口执行`reduce`的通用定长池化
fn pool_fixed<F>(
    x: ArrayView4<'_, f32>,
    layer: &'static str,
    kernel: usize,
    stride: usize,
    reduce: F,
) -> Result<Tensor, ModelError>
where
    F: Fn(ndarray::ArrayView2<'_, f32>) -> f32,
{
    let (n, c, h, w) = x.dim();
    if h < kernel || w < kernel {
        return Err(ModelError::InvalidInput {
            layer,
            expected: format!("空间尺寸不小于池化窗口 {kernel}x{kernel}"),
            got: vec![n, c, h, w],
        });
    }
    let out_h = (h - kernel) / stride + 1;
    let out_w = (w - kernel) / stride + 1;
    let mut out = Array4::<f32>::zeros((n, c, out_h, out_w));
    for bi in 0..n {
        for ci in 0..c {
            for oy in 0..out_h {
                for ox in 0..out_w {
                    let (y0, x0) = (oy * stride, ox * stride);
                    let window = x.slice(s![bi, ci, y0..y0 + kernel, x0..x0 + kernel]);
                    out[[bi, ci, oy, ox]] = reduce(window);
                }
            }
        }
    }
    Ok(Tensor::from_array(out.into_dyn()))
}

/// MaxPool2d（正方形窗口，`stride`默认等于`kernel_size`）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaxPool2d {
    kernel_size: usize,
    stride: usize,
}

impl MaxPool2d {
    pub fn new(kernel_size: usize, stride: Option<usize>) -> Self {
        Self {
            kernel_size,
            stride: stride.unwrap_or(kernel_size).max(1),
        }
    }
}

impl TraitLayer for MaxPool2d {
    fn kind(&self) -> &'static str {
        "MaxPool2d"
    }

    fn params(&self) -> LayerParams {
        LayerParams::Pool2d {
            kernel_size: self.kernel_size,
            stride: self.stride,
        }
    }

    fn check(&self) -> Result<(), String> {
        expect_positive("kernel_size", self.kernel_size)?;
        expect_positive("stride", self.stride)
    }

    fn forward(&self, input: &Tensor, _mode: Mode) -> Result<LayerOutput, ModelError> {
        let x = expect_4d(input, "MaxPool2d")?;
        let out = pool_fixed(x, "MaxPool2d", self.kernel_size, self.stride, |w| {
            w.iter().copied().fold(f32::NEG_INFINITY, f32::max)
        })?;
        Ok(out.into())
    }
}

/// AvgPool2d（正方形窗口，无填充）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvgPool2d {
    kernel_size: usize,
    stride: usize,
}

impl AvgPool2d {
    pub fn new(kernel_size: usize, stride: Option<usize>) -> Self {
        Self {
            kernel_size,
            stride: stride.unwrap_or(kernel_size).max(1),
        }
    }
}

impl TraitLayer for AvgPool2d {
    fn kind(&self) -> &'static str {
        "AvgPool2d"
    }

    fn params(&self) -> LayerParams {
        LayerParams::Pool2d {
            kernel_size: self.kernel_size,
            stride: self.stride,
        }
    }

    fn check(&self) -> Result<(), String> {
        expect_positive("kernel_size", self.kernel_size)?;
        expect_positive("stride", self.stride)
    }

    fn forward(&self, input: &Tensor, _mode: Mode) -> Result<LayerOutput, ModelError> {
        let x = expect_4d(input, "AvgPool2d")?;
        let out = pool_fixed(x, "AvgPool2d", self.kernel_size, self.stride, |w| {
            w.mean().unwrap_or(0.)
        })?;
        Ok(out.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveAvgPool2d {
    output_size: (usize, usize),
}

impl AdaptiveAvgPool2d {
    pub fn new(output_size: (usize, usize)) -> Self {
        Self {
            output_size: (output_size.0.max(1), output_size.1.max(1)),
        }
    }

    pub fn output_size(&self) -> (usize, usize) {
        self.output_size
    }
}

/// 第`i`个自适应窗口在长度为`len`的维度上的范围
fn adaptive_range(i: usize, len: usize, out: usize) -> std::ops::Range<usize> {
    let start = i * len / out;
    let end = ((i + 1) * len).div_ceil(out);
    start..end
}

impl TraitLayer for AdaptiveAvgPool2d {
    fn kind(&self) -> &'static str {
        "AdaptiveAvgPool2d"
    }

    fn params(&self) -> LayerParams {
        LayerParams::AdaptiveAvgPool2d {
            output_size: [self.output_size.0, self.output_size.1],
        }
    }

    fn check(&self) -> Result<(), String> {
        expect_positive("output_size", self.output_size.0.min(self.output_size.1))
    }

    fn forward(&self, input: &Tensor, _mode: Mode) -> Result<LayerOutput, ModelError> {
        let x = expect_4d(input, "AdaptiveAvgPool2d")?;
        let (n, c, h, w) = x.dim();
        if h == 0 || w == 0 {
            return Err(ModelError::InvalidInput {
                layer: "AdaptiveAvgPool2d",
                expected: "非空的空间维度".to_string(),
                got: input.shape().to_vec(),
            });
        }
        let (out_h, out_w) = self.output_size;
        let mut out = Array4::<f32>::zeros((n, c, out_h, out_w));
        for bi in 0..n {
            for ci in 0..c {
                for oy in 0..out_h {
                    let ys = adaptive_range(oy, h, out_h);
                    for ox in 0..out_w {
                        let xs = adaptive_range(ox, w, out_w);
                        let window = x.slice(s![bi, ci, ys.clone(), xs]);
                        out[[bi, ci, oy, ox]] = window.mean().unwrap_or(0.);
                    }
                }
            }
        }
        Ok(Tensor::from_array(out.into_dyn()).into())
    }
}
