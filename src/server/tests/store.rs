use super::small_cnn;
use crate::nn::{InputSpec, ModelError, ModelKind, ModelOrigin, UploadedModels, resolve};
use crate::server::{ModelStore, UploadedModel};
use std::path::Path;

fn entry(store: &ModelStore, id: &str, model_type: &str) -> UploadedModel {
    UploadedModel {
        id: id.to_string(),
        name: format!("{id} model"),
        file_path: store.path_for(id),
        model_type: model_type.to_string(),
        input_shape: [1, 1, 4, 4],
    }
}

#[test]
fn test_new_id_format() {
    let a = ModelStore::new_id();
    let b = ModelStore::new_id();
    assert_ne!(a, b);
    let hex = a.strip_prefix("custom_").unwrap();
    assert_eq!(hex.len(), 8);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_open_creates_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("a/b/uploads");
    let store = ModelStore::open(&dir).unwrap();
    assert!(dir.is_dir());
    assert_eq!(store.path_for("custom_00ff00ff"), dir.join("custom_00ff00ff.pt"));
}

#[test]
fn test_insert_list_remove() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ModelStore::open(tmp.path()).unwrap();
    let first = entry(&store, "custom_00000001", "cnn");
    let second = entry(&store, "custom_00000002", "transformer");
    std::fs::write(&first.file_path, b"x").unwrap();
    store.insert(first.clone());
    store.insert(second.clone());
    assert_eq!(store.list(), vec![first.clone(), second.clone()]);

    // 同id重复登记只保留最新一条
    let mut renamed = first.clone();
    renamed.name = "renamed".to_string();
    store.insert(renamed.clone());
    assert_eq!(store.list(), vec![second.clone(), renamed]);

    assert!(store.remove(&first.id).unwrap());
    assert!(!first.file_path.exists());
    assert_eq!(store.list(), vec![second.clone()]);
    // 文件已不存在的记录也能删除
    assert!(store.remove(&second.id).unwrap());
    assert!(!store.remove(&second.id).unwrap());
    assert!(store.list().is_empty());
}

#[test]
fn test_lookup_reads_file_each_time() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ModelStore::open(tmp.path()).unwrap();
    let model = entry(&store, "custom_0000abcd", "Transformer");
    small_cnn().save(&model.file_path).unwrap();
    store.insert(model.clone());

    let resolved = store.lookup(&model.id).unwrap().unwrap();
    assert_eq!(resolved.network.class_name(), "SmallCnn");
    assert_eq!(resolved.kind, ModelKind::Transformer);
    assert_eq!(resolved.origin, ModelOrigin::Uploaded);
    assert_eq!(
        resolved.input,
        InputSpec {
            channels: 1,
            height: 4,
            width: 4
        }
    );

    // 文件被破坏后，下一次查找随之失败
    std::fs::write(&model.file_path, b"garbage").unwrap();
    assert!(store.lookup(&model.id).is_err());
}

#[test]
fn test_unknown_id() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ModelStore::open(Path::new(tmp.path())).unwrap();
    assert!(store.lookup("custom_deadbeef").unwrap().is_none());
    let err = resolve("custom_deadbeef", &store).unwrap_err();
    assert!(matches!(err, ModelError::UnknownModel(ref id) if id == "custom_deadbeef"));
    // 内置模型不经过上传表
    assert!(resolve("tiny_resnet", &store).is_ok());
}
