/*
 * @Author       : 老董
 * @Date         : 2025-12-22
 * @LastEditTime : 2026-02-12
 * @Description  : Conv2d layer 单元测试（Batch-First 设计，含 PyTorch 数值对照）
 */

use crate::nn::layer::Conv2d;
use crate::nn::{LayerParams, Mode, ModelError, TraitLayer};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;

// ==================== PyTorch 参考常量 ====================

// 简单前向传播 (batch=1, C_in=1, H=4, W=4, C_out=2, kernel=2x2)
#[rustfmt::skip]
const PYTORCH_FWD_X: &[f32] = &[
    1.0, 2.0, 3.0, 4.0,
    5.0, 6.0, 7.0, 8.0,
    9.0, 10.0, 11.0, 12.0,
    13.0, 14.0, 15.0, 16.0,
];
#[rustfmt::skip]
const PYTORCH_FWD_KERNEL: &[f32] = &[
    1.0, 0.0, 0.0, 1.0,  // filter 0: 对角线
    0.0, 1.0, 1.0, 0.0,  // filter 1: 反对角线
];
const PYTORCH_FWD_BIAS: &[f32] = &[0.5, -0.5];
#[rustfmt::skip]
const PYTORCH_FWD_OUTPUT: &[f32] = &[
    7.5, 9.5, 11.5,
    15.5, 17.5, 19.5,
    23.5, 25.5, 27.5,
    6.5, 8.5, 10.5,
    14.5, 16.5, 18.5,
    22.5, 24.5, 26.5,
];

fn forward(conv: &Conv2d, x: &Tensor) -> Tensor {
    conv.forward(x, Mode::Eval).unwrap().into_primary().unwrap()
}

#[test]
fn test_conv2d_forward_matches_pytorch() {
    let conv = Conv2d::from_weights(
        Tensor::new(PYTORCH_FWD_KERNEL, &[2, 1, 2, 2]),
        Some(Tensor::new(PYTORCH_FWD_BIAS, &[2])),
        (1, 1),
        (0, 0),
    )
    .unwrap();
    let y = forward(&conv, &Tensor::new(PYTORCH_FWD_X, &[1, 1, 4, 4]));

    assert_eq!(y.shape(), &[1, 2, 3, 3]);
    for (a, b) in y.to_vec().iter().zip(PYTORCH_FWD_OUTPUT) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-5);
    }
}

#[test]
fn test_conv2d_zero_padding() {
    // 全1输入、全1卷积核、padding=1：角落覆盖4个像素，边缘6个，中心9个
    let conv = Conv2d::from_weights(Tensor::ones(&[1, 1, 3, 3]), None, (1, 1), (1, 1)).unwrap();
    let y = forward(&conv, &Tensor::ones(&[1, 1, 3, 3]));

    assert_eq!(y.shape(), &[1, 1, 3, 3]);
    assert_eq!(y.to_vec(), vec![4., 6., 4., 6., 9., 6., 4., 6., 4.]);
}

#[test]
fn test_conv2d_output_size_with_stride() {
    let conv = Conv2d::new(3, 8, (3, 3), (2, 2), (1, 1), true);
    let y = forward(&conv, &Tensor::new_normal(0., 1., &[2, 3, 32, 32]));
    // (32 + 2 - 3) / 2 + 1 = 16
    assert_eq!(y.shape(), &[2, 8, 16, 16]);
}

#[test]
fn test_conv2d_parameters_and_init() {
    let conv = Conv2d::new(3, 16, (3, 3), (1, 1), (1, 1), true);
    let numel: usize = conv.parameters().iter().map(|p| p.numel()).sum();
    assert_eq!(numel, 3 * 16 * 9 + 16);

    // kaiming_uniform(a=√5)：U(-1/√27, 1/√27)
    let bound = 1. / 27f32.sqrt();
    assert!(conv.weight().value().to_vec().iter().all(|v| v.abs() <= bound));

    let no_bias = Conv2d::new(3, 16, (1, 1), (1, 1), (0, 0), false);
    assert!(no_bias.bias().is_none());
    assert_eq!(no_bias.own_parameters().len(), 1);
}

#[test]
fn test_conv2d_params_record() {
    let conv = Conv2d::new(16, 32, (1, 1), (1, 1), (0, 0), true);
    assert_eq!(
        conv.params(),
        LayerParams::Conv2d {
            in_channels: 16,
            out_channels: 32,
            kernel_size: [1, 1],
            stride: [1, 1],
            padding: [0, 0],
        }
    );
    assert_eq!(
        serde_json::to_value(conv.params()).unwrap(),
        serde_json::json!({
            "in_channels": 16,
            "out_channels": 32,
            "kernel_size": [1, 1],
            "stride": [1, 1],
            "padding": [0, 0],
        })
    );
}

#[test]
fn test_conv2d_rejects_bad_input() {
    let conv = Conv2d::new(3, 4, (3, 3), (1, 1), (0, 0), true);
    let err = conv.forward(&Tensor::zeros(&[1, 2, 8, 8]), Mode::Eval).unwrap_err();
    assert!(matches!(err, ModelError::InvalidInput { layer: "Conv2d", .. }));

    let err = conv.forward(&Tensor::zeros(&[3, 8, 8]), Mode::Eval).unwrap_err();
    assert!(matches!(err, ModelError::InvalidInput { .. }));

    // 空间尺寸小于卷积核
    assert!(conv.forward(&Tensor::zeros(&[1, 3, 2, 2]), Mode::Eval).is_err());
}

#[test]
fn test_conv2d_from_weights_validates_shapes() {
    assert!(Conv2d::from_weights(Tensor::ones(&[2, 2]), None, (1, 1), (0, 0)).is_err());
    assert!(
        Conv2d::from_weights(
            Tensor::ones(&[2, 1, 3, 3]),
            Some(Tensor::zeros(&[3])),
            (1, 1),
            (0, 0)
        )
        .is_err()
    );
}
