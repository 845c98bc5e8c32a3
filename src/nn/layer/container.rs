/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 容器层：Sequential（顺序调用）与 ModuleList（仅持有，不可直接调用）
 *
 * 子模块按插入顺序以"0"、"1"……命名，与 PyTorch 的命名方式一致。
 */

use super::{Layer, LayerOutput, Mode, TraitLayer};
use crate::nn::ModelError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    pub fn push(&mut self, layer: impl Into<Layer>) {
        self.layers.push(layer.into());
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl TraitLayer for Sequential {
    fn kind(&self) -> &'static str {
        "Sequential"
    }

    fn children(&self) -> Vec<(String, &dyn TraitLayer)> {
        self.layers
            .iter()
            .enumerate()
            .map(|(i, l)| (i.to_string(), l as &dyn TraitLayer))
            .collect()
    }

    fn is_container(&self) -> bool {
        true
    }

    fn forward(&self, input: &Tensor, mode: Mode) -> Result<LayerOutput, ModelError> {
        let mut x = input.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer
                .forward(&x, mode)?
                .into_primary()
                .ok_or_else(|| ModelError::EmptyOutput(i.to_string()))?;
        }
        Ok(x.into())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleList {
    layers: Vec<Layer>,
}

impl ModuleList {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl TraitLayer for ModuleList {
    fn kind(&self) -> &'static str {
        "ModuleList"
    }

    fn children(&self) -> Vec<(String, &dyn TraitLayer)> {
        self.layers
            .iter()
            .enumerate()
            .map(|(i, l)| (i.to_string(), l as &dyn TraitLayer))
            .collect()
    }

    fn is_container(&self) -> bool {
        true
    }

    fn forward(&self, _input: &Tensor, _mode: Mode) -> Result<LayerOutput, ModelError> {
        Err(ModelError::NotCallable("ModuleList"))
    }
}
