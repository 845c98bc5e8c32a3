/*
 * @Author       : 老董
 * @Date         : 2025-12-22
 * @LastEditTime : 2026-02-11
 * @Description  : Conv2d (2D 卷积) 层 - PyTorch 风格
 *
 * 输入/输出形状：
 * - 输入：[batch_size, in_channels, H, W]
 * - 输出：[batch_size, out_channels, H', W']
 *
 * 输出尺寸计算：
 * H' = (H + 2*padding_h - kernel_h) / stride_h + 1
 * W' = (W + 2*padding_w - kernel_w) / stride_w + 1
 *
 * 计算：output = conv2d(x, K) + b
 */

use super::{
    LayerOutput, LayerParams, Mode, TraitLayer, expect_4d, expect_positive, expect_shape,
};
use crate::nn::{Init, ModelError, Parameter};
use crate::tensor::Tensor;
use ndarray::{Array4, Ix4};
use serde::{Deserialize, Serialize};

/// Conv2d (2D 卷积) 层
///
/// # 使用示例
/// ```ignore
/// let conv = Conv2d::new(3, 16, (3, 3), (1, 1), (1, 1), true);
/// let h = conv.forward(&x, Mode::Eval)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conv2d {
    /// 卷积核参数 [out_channels, in_channels, kernel_h, kernel_w]
    weight: Parameter,
    /// 偏置参数 [out_channels]（可选）
    bias: Option<Parameter>,
    in_channels: usize,
    out_channels: usize,
    /// 卷积核大小 (kernel_h, kernel_w)
    kernel_size: (usize, usize),
    /// 步长 (stride_h, stride_w)
    stride: (usize, usize),
    /// 填充 (padding_h, padding_w)
    padding: (usize, usize),
}

impl Conv2d {
    /// 创建新的 Conv2d 层，参数按 PyTorch 默认方式初始化
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
        use_bias: bool,
    ) -> Self {
        let (k_h, k_w) = kernel_size;
        let fan_in = in_channels * k_h * k_w;
        let weight = Parameter::init(
            Init::KaimingUniform { fan_in },
            &[out_channels, in_channels, k_h, k_w],
        );
        let bias = use_bias.then(|| Parameter::init(Init::KaimingUniform { fan_in }, &[out_channels]));

        Self {
            weight,
            bias,
            in_channels,
            out_channels,
            kernel_size,
            stride: (stride.0.max(1), stride.1.max(1)),
            padding,
        }
    }

    /// 用给定的卷积核与偏置创建 Conv2d 层
    pub fn from_weights(
        weight: Tensor,
        bias: Option<Tensor>,
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Result<Self, ModelError> {
        let shape = weight.shape().to_vec();
        if shape.len() != 4 {
            return Err(ModelError::InvalidInput {
                layer: "Conv2d",
                expected: "卷积核形状为 4D [C_out, C_in, kH, kW]".to_string(),
                got: shape,
            });
        }
        if let Some(b) = &bias {
            if b.shape() != [shape[0]] {
                return Err(ModelError::InvalidInput {
                    layer: "Conv2d",
                    expected: format!("偏置形状为 [{}]", shape[0]),
                    got: b.shape().to_vec(),
                });
            }
        }
        Ok(Self {
            in_channels: shape[1],
            out_channels: shape[0],
            kernel_size: (shape[2], shape[3]),
            weight: Parameter::new(weight),
            bias: bias.map(Parameter::new),
            stride: (stride.0.max(1), stride.1.max(1)),
            padding,
        })
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn kernel_size(&self) -> (usize, usize) {
        self.kernel_size
    }

    pub fn stride(&self) -> (usize, usize) {
        self.stride
    }

    pub fn padding(&self) -> (usize, usize) {
        self.padding
    }

    pub fn weight(&self) -> &Parameter {
        &self.weight
    }

    pub fn bias(&self) -> Option<&Parameter> {
        self.bias.as_ref()
    }
}

impl TraitLayer for Conv2d {
    fn kind(&self) -> &'static str {
        "Conv2d"
    }

    fn params(&self) -> LayerParams {
        LayerParams::Conv2d {
            in_channels: self.in_channels,
            out_channels: self.out_channels,
            kernel_size: [self.kernel_size.0, self.kernel_size.1],
            stride: [self.stride.0, self.stride.1],
            padding: [self.padding.0, self.padding.1],
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
        let (k_h, k_w) = self.kernel_size;
        expect_positive("kernel_size", k_h.min(k_w))?;
        expect_positive("stride", self.stride.0.min(self.stride.1))?;
        expect_shape(
            "weight",
            self.weight.value(),
            &[self.out_channels, self.in_channels, k_h, k_w],
        )?;
        match &self.bias {
            Some(bias) => expect_shape("bias", bias.value(), &[self.out_channels]),
            None => Ok(()),
        }
    }

    fn forward(&self, input: &Tensor, _mode: Mode) -> Result<LayerOutput, ModelError> {
        let x = expect_4d(input, "Conv2d")?;
        let (batch_size, input_c, input_h, input_w) = x.dim();
        if input_c != self.in_channels {
            return Err(ModelError::InvalidInput {
                layer: "Conv2d",
                expected: format!("输入通道数为 {}", self.in_channels),
                got: input.shape().to_vec(),
            });
        }

        let (kernel_h, kernel_w) = self.kernel_size;
        let (stride_h, stride_w) = self.stride;
        let (pad_h, pad_w) = self.padding;
        if input_h + 2 * pad_h < kernel_h || input_w + 2 * pad_w < kernel_w {
            return Err(ModelError::InvalidInput {
                layer: "Conv2d",
                expected: format!("填充后的空间尺寸不小于卷积核 {kernel_h}x{kernel_w}"),
                got: input.shape().to_vec(),
            });
        }
        let output_h = (input_h + 2 * pad_h - kernel_h) / stride_h + 1;
        let output_w = (input_w + 2 * pad_w - kernel_w) / stride_w + 1;

        let kernel = self
            .weight
            .value()
            .view()
            .into_dimensionality::<Ix4>()
            .map_err(|_| ModelError::Format("Conv2d 卷积核不是 4D".to_string()))?;
        let bias = self.bias.as_ref().map(|b| b.value().to_vec());

        let mut output = Array4::<f32>::zeros((batch_size, self.out_channels, output_h, output_w));
        for bi in 0..batch_size {
            for oc in 0..self.out_channels {
                let b = bias.as_ref().map_or(0., |b| b[oc]);
                for oy in 0..output_h {
                    for ox in 0..output_w {
                        let mut acc = b;
                        for ic in 0..input_c {
                            for ky in 0..kernel_h {
                                // 零填充：落在填充区的位置直接跳过
                                let iy = (oy * stride_h + ky) as isize - pad_h as isize;
                                if iy < 0 || iy >= input_h as isize {
                                    continue;
                                }
                                for kx in 0..kernel_w {
                                    let ix = (ox * stride_w + kx) as isize - pad_w as isize;
                                    if ix < 0 || ix >= input_w as isize {
                                        continue;
                                    }
                                    acc += x[[bi, ic, iy as usize, ix as usize]]
                                        * kernel[[oc, ic, ky, kx]];
                                }
                            }
                        }
                        output[[bi, oc, oy, ox]] = acc;
                    }
                }
            }
        }

        Ok(Tensor::from_array(output.into_dyn()).into())
    }
}
