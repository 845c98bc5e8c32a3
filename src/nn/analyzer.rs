/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 结构分析：网络 → 模型摘要（逐层描述 + 参数总量）
 */

use super::layer::LayerParams;
use super::Network;
use serde::Serialize;

/// 一个可见模块的描述
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerDescriptor {
    /// `layer_{n}`，n 为本次分析中的遍历序号
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub layer_type: String,
    pub params: LayerParams,
    /// 仅统计本模块直接持有的参数
    pub total_params: usize,
    pub trainable_params: usize,
    /// 本模块整棵子树的参数量
    pub nested_params: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub model_name: String,
    pub total_params: usize,
    pub trainable_params: usize,
    pub layers: Vec<LayerDescriptor>,
}

/// 逐层描述
pub fn analyze(network: &Network) -> Vec<LayerDescriptor> {
    network
        .visit_layers()
        .into_iter()
        .map(|visited| {
            let own = visited.layer.own_parameters();
            LayerDescriptor {
                id: format!("layer_{}", visited.index),
                name: visited.name,
                layer_type: visited.layer.kind().to_string(),
                params: visited.layer.params(),
                total_params: own.iter().map(|(_, p)| p.numel()).sum(),
                trainable_params: own
                    .iter()
                    .filter(|(_, p)| p.requires_grad())
                    .map(|(_, p)| p.numel())
                    .sum(),
                nested_params: visited.layer.parameters().iter().map(|p| p.numel()).sum(),
            }
        })
        .collect()
}

pub fn get_model_summary(network: &Network) -> ModelSummary {
    ModelSummary {
        model_name: network.class_name().to_string(),
        total_params: network.total_params(),
        trainable_params: network.trainable_params(),
        layers: analyze(network),
    }
}
