/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 内置的两个示例网络（超参数固定）
 */

use super::layer::{
    AdaptiveAvgPool2d, BatchNorm2d, Conv2d, Embedding, FeedForwardActivation, Layer, LayerNorm,
    Linear, MaxPool2d, ReLU, TransformerEncoder, TransformerEncoderLayer,
};
use super::network::{Architecture, NamedLayer, Network};
use super::ModelError;

fn named(name: &str, layer: impl Into<Layer>) -> NamedLayer {
    NamedLayer {
        name: name.to_string(),
        layer: layer.into(),
    }
}

fn conv(in_channels: usize, out_channels: usize, kernel: usize, padding: usize) -> Conv2d {
    Conv2d::new(
        in_channels,
        out_channels,
        (kernel, kernel),
        (1, 1),
        (padding, padding),
        true,
    )
}

/// 带两个残差块的小型 CNN，输入 [batch, 3, 32, 32]，输出 [batch, num_classes]
pub fn tiny_resnet(num_classes: usize) -> Network {
    let children = vec![
        // 初始卷积
        named("conv1", conv(3, 16, 3, 1)),
        named("bn1", BatchNorm2d::new(16)),
        named("relu", ReLU),
        named("pool1", MaxPool2d::new(2, Some(2))),
        // 残差块 1
        named("conv2", conv(16, 32, 3, 1)),
        named("bn2", BatchNorm2d::new(32)),
        named("conv3", conv(32, 32, 3, 1)),
        named("bn3", BatchNorm2d::new(32)),
        named("downsample1", conv(16, 32, 1, 0)),
        named("pool2", MaxPool2d::new(2, Some(2))),
        // 残差块 2
        named("conv4", conv(32, 64, 3, 1)),
        named("bn4", BatchNorm2d::new(64)),
        named("conv5", conv(64, 64, 3, 1)),
        named("bn5", BatchNorm2d::new(64)),
        named("downsample2", conv(32, 64, 1, 0)),
        // 全局平均池化 + 分类
        named("avgpool", AdaptiveAvgPool2d::new((1, 1))),
        named("fc", Linear::new(64, num_classes, true)),
    ];
    Network::new("TinyResNet", Architecture::TinyResNet, children)
}

/// MiniTransformer 的超参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MiniTransformerConfig {
    pub vocab_size: usize,
    pub d_model: usize,
    pub nhead: usize,
    pub num_layers: usize,
    pub num_classes: usize,
    pub max_seq_len: usize,
}

impl Default for MiniTransformerConfig {
    fn default() -> Self {
        Self {
            vocab_size: 1000,
            d_model: 64,
            nhead: 4,
            num_layers: 2,
            num_classes: 10,
            max_seq_len: 32,
        }
    }
}

/// 小型 Transformer 分类器，输入 [batch, seq] 的 token id（seq ≤ max_seq_len）
pub fn mini_transformer(config: MiniTransformerConfig) -> Result<Network, ModelError> {
    let encoder_layer = TransformerEncoderLayer::new(
        config.d_model,
        config.nhead,
        config.d_model * 4,
        0.1,
        FeedForwardActivation::Gelu,
    )?;
    let children = vec![
        named("embedding", Embedding::new(config.vocab_size, config.d_model)),
        named("pos_embedding", Embedding::new(config.max_seq_len, config.d_model)),
        named(
            "transformer",
            TransformerEncoder::new(encoder_layer, config.num_layers, None),
        ),
        named("layer_norm", LayerNorm::new(&[config.d_model])),
        named("fc", Linear::new(config.d_model, config.num_classes, true)),
    ];
    Ok(Network::new(
        "MiniTransformer",
        Architecture::MiniTransformer,
        children,
    ))
}
