mod store;

use crate::config::ServerConfig;
use crate::nn::layer::{Conv2d, Flatten, Linear, ReLU};
use crate::nn::{Checkpoint, Layer, Network};
use crate::server::{AppState, ModelStore};
use std::path::Path;

const BOUNDARY: &str = "ai-viewer-test-boundary";

/// 1×4×4 输入、3 类输出的小 CNN，共 119 个参数
fn small_cnn() -> Network {
    Network::sequential(
        "SmallCnn",
        vec![
            (
                "conv".to_string(),
                Layer::from(Conv2d::new(1, 2, (3, 3), (1, 1), (1, 1), true)),
            ),
            ("relu".to_string(), Layer::from(ReLU)),
            ("flatten".to_string(), Layer::from(Flatten::default())),
            ("fc".to_string(), Layer::from(Linear::new(2 * 4 * 4, 3, true))),
        ],
    )
}

fn checkpoint_bytes(checkpoint: &Checkpoint) -> Vec<u8> {
    let mut bytes = Vec::new();
    checkpoint.write_to(&mut bytes).unwrap();
    bytes
}

/// 返回 (content-type, body)
fn multipart(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((filename, data)) = file {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// 上传目录为`dir/uploads`，示例图片不存在
fn test_state(dir: &Path) -> AppState {
    let settings = ServerConfig {
        upload_dir: dir.join("uploads"),
        image_path: dir.join("missing.png"),
        ..Default::default()
    };
    let store = ModelStore::open(&settings.upload_dir).unwrap();
    AppState::new(store, &settings).unwrap()
}

fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
