/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 模型文件（.pt / .pth）的读写
 *
 * 文件布局：
 * - 4 字节魔数 `AVCK`
 * - u32 小端格式版本
 * - bincode 编码的 `Checkpoint`
 *
 * `Checkpoint::Module` 保存完整网络（架构、类名、具名子模块及其参数与缓冲区）；
 * `Checkpoint::StateDict` 只有 名称 → 张量 的映射，读入后无法重建网络。
 */

use super::{ModelError, Network};
use bincode::Options;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Checkpoint {
    Module(Network),
    StateDict(BTreeMap<String, Tensor>),
}

impl Checkpoint {
    /// 模型文件魔数
    pub const MAGIC: &'static [u8; 4] = b"AVCK";
    /// 模型文件版本
    pub const VERSION: u32 = 1;

    /// 反序列化时允许的最大字节数，防止损坏的长度前缀触发超大分配
    const BODY_LIMIT: u64 = 1 << 30;

    fn codec() -> impl Options {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_limit(Self::BODY_LIMIT)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), ModelError> {
        writer.write_all(Self::MAGIC)?;
        writer.write_all(&Self::VERSION.to_le_bytes())?;
        Self::codec()
            .serialize_into(&mut *writer, self)
            .map_err(|e| ModelError::Format(format!("序列化失败: {e}")))?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, ModelError> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|e| ModelError::Format(format!("读取魔数失败: {e}")))?;
        if &magic != Self::MAGIC {
            return Err(ModelError::Format(
                "无效的模型文件：缺少 AVCK 魔数".to_string(),
            ));
        }

        let mut version_bytes = [0u8; 4];
        reader
            .read_exact(&mut version_bytes)
            .map_err(|e| ModelError::Format(format!("读取版本失败: {e}")))?;
        let version = u32::from_le_bytes(version_bytes);
        if version != Self::VERSION {
            return Err(ModelError::Format(format!(
                "不支持的模型文件版本: {version}"
            )));
        }

        Self::codec()
            .deserialize_from(reader)
            .map_err(|e| ModelError::Format(format!("反序列化失败: {e}")))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_to(&mut writer)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let mut reader = BufReader::new(File::open(path.as_ref())?);
        Self::read_from(&mut reader)
    }

    /// 取出完整网络并检查其结构；参数字典返回`ModelError::StateDict`
    pub fn into_network(self) -> Result<Network, ModelError> {
        match self {
            Self::Module(network) => {
                network.validate()?;
                Ok(network)
            }
            Self::StateDict(_) => Err(ModelError::StateDict),
        }
    }
}

impl Network {
    /// 保存完整网络
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        Checkpoint::Module(self.clone()).save(path)
    }

    /// 读取完整网络
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        Checkpoint::load(path)?.into_network()
    }

    /// 参数与缓冲区的字典（键如`conv1.weight`）
    pub fn state_dict(&self) -> BTreeMap<String, Tensor> {
        self.named_tensors()
            .into_iter()
            .map(|(name, t)| (name, t.clone()))
            .collect()
    }

    /// 只保存参数字典（此类文件无法作为模型上传）
    pub fn save_state_dict<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        Checkpoint::StateDict(self.state_dict()).save(path)
    }
}
