/*
 * @Author       : 老董
 * @Date         : 2026-02-16
 * @Description  : 示例图片存在时的推理：tiny_resnet 与上传的3通道模型使用图片，mini_transformer 不使用
 */
use ai_viewer::config::ServerConfig;
use ai_viewer::nn::layer::{AdaptiveAvgPool2d, Conv2d, Flatten, Linear};
use ai_viewer::nn::{Layer, Network};
use ai_viewer::server::{AppState, ModelStore, UploadedModel, routes};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{Rgb, RgbImage};
use serde_json::Value;
use std::path::Path;
use warp::http::StatusCode;

fn write_image(path: &Path) {
    let img = RgbImage::from_fn(40, 30, |x, y| Rgb([(x * 6) as u8, (y * 8) as u8, 128]));
    img.save(path).unwrap();
}

fn rgb_cnn() -> Network {
    Network::sequential(
        "RgbCnn",
        vec![
            (
                "conv".to_string(),
                Layer::from(Conv2d::new(3, 4, (3, 3), (1, 1), (1, 1), true)),
            ),
            ("pool".to_string(), Layer::from(AdaptiveAvgPool2d::new((1, 1)))),
            ("flatten".to_string(), Layer::from(Flatten::default())),
            ("fc".to_string(), Layer::from(Linear::new(4, 2, true))),
        ],
    )
}

#[tokio::test]
async fn test_image_selection() {
    let tmp = tempfile::tempdir().unwrap();
    let image_path = tmp.path().join("image.png");
    write_image(&image_path);
    let encoded = STANDARD.encode(std::fs::read(&image_path).unwrap());

    let settings = ServerConfig {
        upload_dir: tmp.path().join("uploads"),
        image_path: image_path.clone(),
        ..Default::default()
    };
    let store = ModelStore::open(&settings.upload_dir).unwrap();
    let file_path = store.path_for("custom_0bb00001");
    rgb_cnn().save(&file_path).unwrap();
    store.insert(UploadedModel {
        id: "custom_0bb00001".to_string(),
        name: "rgb".to_string(),
        file_path,
        model_type: "cnn".to_string(),
        input_shape: [1, 3, 24, 24],
    });
    let routes = routes(AppState::new(store, &settings).unwrap());

    let resp = warp::test::request()
        .method("POST")
        .path("/inference/tiny_resnet")
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["input_image"], encoded.as_str());
    assert_eq!(body["input_shape"], serde_json::json!([1, 3, 32, 32]));

    // 上传模型按声明的尺寸缩放图片
    let resp = warp::test::request()
        .method("POST")
        .path("/inference/custom_0bb00001")
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["input_image"], encoded.as_str());
    assert_eq!(body["input_shape"], serde_json::json!([1, 3, 24, 24]));
    assert_eq!(body["output_shape"], serde_json::json!([1, 2]));

    let resp = warp::test::request()
        .method("POST")
        .path("/inference/mini_transformer")
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert!(body["input_image"].is_null());
}
