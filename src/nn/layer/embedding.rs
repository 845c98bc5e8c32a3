/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : Embedding 层：整数 id → 向量查表
 */

use super::{LayerOutput, LayerParams, Mode, TraitLayer, expect_shape};
use crate::nn::{Init, ModelError, Parameter};
use crate::tensor::Tensor;
use ndarray::Ix2;
use serde::{Deserialize, Serialize};

/// # 输入/输出形状
/// - 输入：任意形状的 id 张量（元素须为非负整数的 f32）
/// - 输出：[..., embedding_dim]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    num_embeddings: usize,
    embedding_dim: usize,
    /// [num_embeddings, embedding_dim]，按 N(0, 1) 初始化
    weight: Parameter,
}

impl Embedding {
    pub fn new(num_embeddings: usize, embedding_dim: usize) -> Self {
        Self {
            num_embeddings,
            embedding_dim,
            weight: Parameter::init(
                Init::Normal { mean: 0., std: 1. },
                &[num_embeddings, embedding_dim],
            ),
        }
    }

    pub fn num_embeddings(&self) -> usize {
        self.num_embeddings
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    pub fn weight(&self) -> &Parameter {
        &self.weight
    }
}

impl TraitLayer for Embedding {
    fn kind(&self) -> &'static str {
        "Embedding"
    }

    fn params(&self) -> LayerParams {
        LayerParams::Embedding {
            num_embeddings: self.num_embeddings,
            embedding_dim: self.embedding_dim,
        }
    }

    fn own_parameters(&self) -> Vec<(&'static str, &Parameter)> {
        vec![("weight", &self.weight)]
    }

    fn check(&self) -> Result<(), String> {
        expect_shape(
            "weight",
            self.weight.value(),
            &[self.num_embeddings, self.embedding_dim],
        )
    }

    fn forward(&self, input: &Tensor, _mode: Mode) -> Result<LayerOutput, ModelError> {
        let invalid = || ModelError::InvalidToken {
            num_embeddings: self.num_embeddings,
        };
        if !input.is_index_tensor() {
            return Err(invalid());
        }
        let table = self
            .weight
            .value()
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| ModelError::Format("Embedding 权重不是 2D".to_string()))?;

        let mut data = Vec::with_capacity(input.size() * self.embedding_dim);
        for id in input.view().iter() {
            let id = *id as usize;
            if id >= self.num_embeddings {
                return Err(invalid());
            }
            data.extend(table.row(id).iter());
        }

        let mut shape = input.shape().to_vec();
        shape.push(self.embedding_dim);
        Ok(Tensor::try_new(data, &shape)?.into())
    }
}
