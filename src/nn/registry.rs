/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 模型注册表：模型标识 → 网络实例
 *
 * 内置标识每次都构造新实例；已上传的标识交给`UploadedModels`，
 * 每次调用都重新读取并反序列化模型文件（不做缓存）。
 */

use super::models::{self, MiniTransformerConfig};
use super::{ModelError, Network};
use serde::{Deserialize, Serialize};

/// 模型类别：决定输入的合成方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    Cnn,
    Transformer,
    Other(String),
}

impl ModelKind {
    /// 由类别标签解析（不区分大小写），未知标签原样保留
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "cnn" => Self::Cnn,
            "transformer" => Self::Transformer,
            _ => Self::Other(tag.to_string()),
        }
    }
}

/// 模型声明的图像输入尺寸，合成输入为 [1, channels, height, width]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl Default for InputSpec {
    fn default() -> Self {
        Self {
            channels: 3,
            height: 32,
            width: 32,
        }
    }
}

impl InputSpec {
    pub fn shape(&self) -> [usize; 4] {
        [1, self.channels, self.height, self.width]
    }
}

/// 内置模型条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinModel {
    pub id: &'static str,
    pub name: &'static str,
    pub type_tag: &'static str,
}

pub const BUILTIN_MODELS: [BuiltinModel; 2] = [
    BuiltinModel {
        id: "tiny_resnet",
        name: "Tiny ResNet",
        type_tag: "CNN",
    },
    BuiltinModel {
        id: "mini_transformer",
        name: "Mini Transformer",
        type_tag: "Transformer",
    },
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_MODELS.iter().any(|m| m.id == name)
}

/// 构造内置模型的新实例
pub fn get_model(name: &str) -> Result<Network, ModelError> {
    match name {
        "tiny_resnet" => Ok(models::tiny_resnet(10)),
        "mini_transformer" => models::mini_transformer(MiniTransformerConfig::default()),
        _ => Err(ModelError::UnknownModel(name.to_string())),
    }
}

/// 模型来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelOrigin {
    Builtin,
    Uploaded,
}

/// 解析后的模型：网络实例与推理所需的元信息
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub network: Network,
    pub kind: ModelKind,
    pub input: InputSpec,
    pub origin: ModelOrigin,
}

/// 已上传模型的查找接口
pub trait UploadedModels {
    /// 未找到时返回`Ok(None)`
    fn lookup(&self, id: &str) -> Result<Option<ResolvedModel>, ModelError>;
}

/// 没有任何已上传模型
pub struct NoUploads;

impl UploadedModels for NoUploads {
    fn lookup(&self, _id: &str) -> Result<Option<ResolvedModel>, ModelError> {
        Ok(None)
    }
}

/// 先查内置模型，再查已上传模型
pub fn resolve(name: &str, uploads: &dyn UploadedModels) -> Result<ResolvedModel, ModelError> {
    if is_builtin(name) {
        let kind = match name {
            "mini_transformer" => ModelKind::Transformer,
            _ => ModelKind::Cnn,
        };
        return Ok(ResolvedModel {
            network: get_model(name)?,
            kind,
            input: InputSpec::default(),
            origin: ModelOrigin::Builtin,
        });
    }
    uploads
        .lookup(name)?
        .ok_or_else(|| ModelError::UnknownModel(name.to_string()))
}
