/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 网络（Network）：具名直接子模块 + 架构特定的前向传播
 *
 * 子模块按声明顺序保存，供结构分析与激活捕获共用同一遍历顺序：
 * 直接子模块依次访问；Sequential / ModuleList 容器被其子模块替换，
 * 名称为`parent.child`；更深的嵌套不再展开。
 *
 * 激活捕获通过`Network::attach`得到的`Instrumented`句柄完成：
 * 句柄在存活期间独占探针，drop 时自动解除挂载。
 */

use super::layer::{Layer, LayerOutput, Mode, TraitLayer};
use super::{ModelError, Parameter};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// 前向传播的编排方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Architecture {
    /// 带两个残差块的小型 CNN
    TinyResNet,
    /// 词嵌入 + 位置嵌入 + TransformerEncoder 的小型分类器
    MiniTransformer,
    /// 依次调用所有直接子模块（上传模型的通用结构）
    Sequential,
}

/// 具名的直接子模块
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLayer {
    pub name: String,
    pub layer: Layer,
}

/// 遍历得到的一个可见模块
pub struct VisitedLayer<'a> {
    /// 从1开始的遍历序号
    pub index: usize,
    /// `child`或`parent.child`
    pub name: String,
    pub layer: &'a dyn TraitLayer,
}

/// 前向传播中观察可见模块输入输出的探针
pub trait Probe {
    fn observe(&mut self, name: &str, input: &Tensor, output: &LayerOutput);

    /// 解除挂载时调用
    fn detach(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    class_name: String,
    architecture: Architecture,
    children: Vec<NamedLayer>,
    #[serde(default)]
    mode: Mode,
}

impl Network {
    pub fn new(
        class_name: impl Into<String>,
        architecture: Architecture,
        children: Vec<NamedLayer>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            architecture,
            children,
            mode: Mode::Train,
        }
    }

    /// 仅由顺序子模块组成的网络
    pub fn sequential(class_name: impl Into<String>, layers: Vec<(String, Layer)>) -> Self {
        let children = layers
            .into_iter()
            .map(|(name, layer)| NamedLayer { name, layer })
            .collect();
        Self::new(class_name, Architecture::Sequential, children)
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn children(&self) -> &[NamedLayer] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [NamedLayer] {
        &mut self.children
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn eval(&mut self) {
        self.mode = Mode::Eval;
    }

    pub fn train(&mut self) {
        self.mode = Mode::Train;
    }

    pub fn child(&self, name: &str) -> Result<&Layer, ModelError> {
        self.children
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.layer)
            .ok_or_else(|| ModelError::MissingLayer(name.to_string()))
    }

    /// 逐个检查子模块的字段与参数形状
    pub fn validate(&self) -> Result<(), ModelError> {
        for child in &self.children {
            child.layer.validate().map_err(|e| match e {
                ModelError::Format(msg) => ModelError::Format(format!("{}.{msg}", child.name)),
                other => other,
            })?;
        }
        Ok(())
    }

    /// 按结构分析的规则遍历可见模块
    pub fn visit_layers(&self) -> Vec<VisitedLayer<'_>> {
        let mut visited = Vec::new();
        for child in &self.children {
            if child.layer.is_container() {
                for (sub_name, sub) in child.layer.children() {
                    visited.push(VisitedLayer {
                        index: visited.len() + 1,
                        name: format!("{}.{}", child.name, sub_name),
                        layer: sub,
                    });
                }
            } else {
                visited.push(VisitedLayer {
                    index: visited.len() + 1,
                    name: child.name.clone(),
                    layer: &child.layer,
                });
            }
        }
        visited
    }

    /// 全部参数（含嵌套子模块）
    pub fn parameters(&self) -> Vec<&Parameter> {
        self.children
            .iter()
            .flat_map(|c| c.layer.parameters())
            .collect()
    }

    pub fn total_params(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }

    pub fn trainable_params(&self) -> usize {
        self.parameters()
            .iter()
            .filter(|p| p.requires_grad())
            .map(|p| p.numel())
            .sum()
    }

    /// 全部参数与缓冲区，键为点分路径（如`conv1.weight`、`bn1.running_mean`）
    pub fn named_tensors(&self) -> Vec<(String, &Tensor)> {
        self.children
            .iter()
            .flat_map(|c| {
                c.layer
                    .named_tensors()
                    .into_iter()
                    .map(move |(name, t)| (format!("{}.{}", c.name, name), t))
            })
            .collect()
    }

    /// 不带探针的前向传播
    pub fn forward(&self, input: &Tensor) -> Result<Tensor, ModelError> {
        Pass {
            network: self,
            probe: None,
        }
        .run(input)
    }

    /// 挂载探针，返回在存活期间独占探针的句柄
    pub fn attach<'a>(&'a self, probe: &'a mut dyn Probe) -> Instrumented<'a> {
        Instrumented {
            network: self,
            probe,
        }
    }
}

/// 挂载了探针的网络；drop 时解除挂载
pub struct Instrumented<'a> {
    network: &'a Network,
    probe: &'a mut dyn Probe,
}

impl Instrumented<'_> {
    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor, ModelError> {
        Pass {
            network: self.network,
            probe: Some(&mut *self.probe),
        }
        .run(input)
    }
}

impl Drop for Instrumented<'_> {
    fn drop(&mut self) {
        self.probe.detach();
    }
}

/// 单次前向传播
struct Pass<'n, 'p> {
    network: &'n Network,
    probe: Option<&'p mut dyn Probe>,
}

impl Pass<'_, '_> {
    fn run(&mut self, input: &Tensor) -> Result<Tensor, ModelError> {
        match self.network.architecture {
            Architecture::TinyResNet => self.tiny_resnet(input),
            Architecture::MiniTransformer => self.mini_transformer(input),
            Architecture::Sequential => {
                let network = self.network;
                let mut x = input.clone();
                for child in &network.children {
                    x = self.call(&child.name, &child.layer, &x)?;
                }
                Ok(x)
            }
        }
    }

    /// 按名称调用直接子模块
    fn named(&mut self, name: &str, x: &Tensor) -> Result<Tensor, ModelError> {
        let network = self.network;
        self.call(name, network.child(name)?, x)
    }

    /// 调用一个直接子模块：Sequential 容器逐个调用其子模块并以点分名称通知探针
    fn call(&mut self, name: &str, layer: &Layer, x: &Tensor) -> Result<Tensor, ModelError> {
        match layer {
            Layer::Sequential(seq) => {
                let mut h = x.clone();
                for (i, sub) in seq.layers().iter().enumerate() {
                    h = self.observed(&format!("{name}.{i}"), sub, &h)?;
                }
                Ok(h)
            }
            _ => self.observed(name, layer, x),
        }
    }

    fn observed(&mut self, name: &str, layer: &Layer, x: &Tensor) -> Result<Tensor, ModelError> {
        let output = layer.forward(x, self.network.mode)?;
        if let Some(probe) = self.probe.as_deref_mut() {
            probe.observe(name, x, &output);
        }
        output
            .into_primary()
            .ok_or_else(|| ModelError::EmptyOutput(name.to_string()))
    }

    fn chain(&mut self, names: &[&str], x: &Tensor) -> Result<Tensor, ModelError> {
        let mut x = x.clone();
        for name in names {
            x = self.named(name, &x)?;
        }
        Ok(x)
    }

    fn tiny_resnet(&mut self, input: &Tensor) -> Result<Tensor, ModelError> {
        let x = self.chain(&["conv1", "bn1", "relu", "pool1"], input)?;

        let identity = self.named("downsample1", &x)?;
        let x = self.chain(&["conv2", "bn2", "relu", "conv3", "bn3"], &x)?;
        let x = self.named("relu", &x.checked_add(&identity)?)?;
        let x = self.named("pool2", &x)?;

        let identity = self.named("downsample2", &x)?;
        let x = self.chain(&["conv4", "bn4", "relu", "conv5", "bn5"], &x)?;
        let x = self.named("relu", &x.checked_add(&identity)?)?;

        let x = self.named("avgpool", &x)?.flatten_from(1)?;
        self.named("fc", &x)
    }

    fn mini_transformer(&mut self, input: &Tensor) -> Result<Tensor, ModelError> {
        let shape = input.shape();
        if shape.len() != 2 {
            return Err(ModelError::InvalidInput {
                layer: "MiniTransformer",
                expected: "[batch, seq] 的 token id".to_string(),
                got: shape.to_vec(),
            });
        }
        let positions = Tensor::arange(shape[1]).unsqueeze(0)?;

        let tokens = self.named("embedding", input)?;
        let pos = self.named("pos_embedding", &positions)?;
        let x = tokens.broadcast_add(&pos)?;
        let x = self.chain(&["transformer", "layer_norm"], &x)?;
        let x = x.mean_axis(1)?;
        self.named("fc", &x)
    }
}
