/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : 已上传模型的索引表
 *
 * 只记录元信息，文件存放在上传目录下的`<id>.pt`。
 * 查找在读锁下重新读取文件；登记与删除（先删文件再删条目）在写锁下进行。
 * 索引只存在于内存，进程重启后清空。
 */

use crate::nn::{
    InputSpec, ModelError, ModelKind, ModelOrigin, Network, ResolvedModel, UploadedModels,
};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// 一条上传记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedModel {
    pub id: String,
    pub name: String,
    pub file_path: PathBuf,
    /// 上传时填写的类别标签，原样保留
    pub model_type: String,
    pub input_shape: [usize; 4],
}

impl UploadedModel {
    pub fn input_spec(&self) -> InputSpec {
        let [_, channels, height, width] = self.input_shape;
        InputSpec {
            channels,
            height,
            width,
        }
    }
}

#[derive(Debug)]
pub struct ModelStore {
    dir: PathBuf,
    entries: RwLock<Vec<UploadedModel>>,
}

impl ModelStore {
    /// 上传目录不存在时创建
    pub fn open<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            entries: RwLock::new(Vec::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `custom_` + 8位十六进制
    pub fn new_id() -> String {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        format!("custom_{}", &hex[..8])
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.pt"))
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<UploadedModel>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<UploadedModel>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 按上传顺序
    pub fn list(&self) -> Vec<UploadedModel> {
        self.read().clone()
    }

    /// 同id的旧记录会被替换
    pub fn insert(&self, model: UploadedModel) {
        let mut entries = self.write();
        entries.retain(|m| m.id != model.id);
        entries.push(model);
    }

    /// 删除文件与记录；id不存在时返回`Ok(false)`
    pub fn remove(&self, id: &str) -> io::Result<bool> {
        let mut entries = self.write();
        let Some(pos) = entries.iter().position(|m| m.id == id) else {
            return Ok(false);
        };
        match std::fs::remove_file(&entries[pos].file_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        entries.remove(pos);
        Ok(true)
    }
}

impl UploadedModels for ModelStore {
    fn lookup(&self, id: &str) -> Result<Option<ResolvedModel>, ModelError> {
        let entries = self.read();
        let Some(entry) = entries.iter().find(|m| m.id == id) else {
            return Ok(None);
        };
        let network = Network::load(&entry.file_path)?;
        Ok(Some(ResolvedModel {
            network,
            kind: ModelKind::from_tag(&entry.model_type),
            input: entry.input_spec(),
            origin: ModelOrigin::Uploaded,
        }))
    }
}
