//! 网络构建、前向传播与模型文件读写相关的错误类型

use crate::errors::TensorError;
use crate::vision::RenderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// 既不是内置模型也不是已上传模型
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("张量运算失败: {0}")]
    Tensor(#[from] TensorError),

    #[error("{layer} 输入形状无效：期望{expected}，实际为{got:?}")]
    InvalidInput {
        layer: &'static str,
        expected: String,
        got: Vec<usize>,
    },

    #[error("token id 越界或不是非负整数：词表大小为{num_embeddings}")]
    InvalidToken { num_embeddings: usize },

    #[error("网络缺少子模块 `{0}`")]
    MissingLayer(String),

    #[error("{0} 是容器模块，不能直接调用 forward")]
    NotCallable(&'static str),

    #[error("{0} 没有输出张量")]
    EmptyOutput(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("模型文件格式错误: {0}")]
    Format(String),

    /// 文件只含参数字典，没有网络结构
    #[error("不支持 state_dict，请上传用 Network::save 保存的完整模型文件")]
    StateDict,

    #[error("图像处理失败: {0}")]
    Image(#[from] image::ImageError),

    #[error("{0}")]
    Render(#[from] RenderError),
}
