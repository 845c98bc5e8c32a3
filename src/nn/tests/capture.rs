use crate::nn::capture::{FEATURE_MAP_SIZE, synthesize_input};
use crate::nn::layer::{Conv2d, Flatten, Linear, ReLU, Sequential};
use crate::nn::models::{MiniTransformerConfig, mini_transformer, tiny_resnet};
use crate::nn::{
    ActivationProbe, InputSpec, Layer, LayerOutput, Mode, ModelKind, Network, Probe,
    run_inference,
};
use crate::tensor::Tensor;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

#[test]
fn test_probe_keeps_first_tuple_element_and_last_call() {
    let mut probe = ActivationProbe::new();
    let input = Tensor::zeros(&[1, 2]);
    probe.observe("a", &input, &LayerOutput::Tuple(vec![Tensor::ones(&[3]), Tensor::zeros(&[9])]));
    probe.observe("b", &input, &LayerOutput::Tuple(Vec::new()));
    probe.observe("c", &input, &LayerOutput::from(Tensor::ones(&[1])));
    probe.observe("c", &Tensor::zeros(&[5]), &LayerOutput::from(Tensor::ones(&[2])));

    assert_eq!(probe.take("a").unwrap().output.shape(), &[3]);
    assert!(probe.take("b").is_none());
    let c = probe.take("c").unwrap();
    assert_eq!(c.output.shape(), &[2]);
    assert_eq!(c.input_shape, vec![5]);
    // 已取走
    assert!(probe.take("c").is_none());

    probe.detach();
    probe.observe("d", &input, &LayerOutput::from(Tensor::ones(&[1])));
    assert!(probe.take("d").is_none());
}

#[test]
fn test_synthesize_input_by_kind() {
    let spec = InputSpec::default();
    let tokens = synthesize_input(&ModelKind::Transformer, None, spec).unwrap();
    assert_eq!(tokens.tensor.shape(), &[1, 16]);
    assert!(tokens.tensor.is_index_tensor());
    assert!(tokens.tensor.to_vec().iter().all(|&t| t < 1000.));
    assert!(tokens.image_base64.is_none());

    let cnn = synthesize_input(&ModelKind::Cnn, None, spec).unwrap();
    assert_eq!(cnn.tensor.shape(), &[1, 3, 32, 32]);
    assert!(cnn.image_base64.is_none());

    let other = synthesize_input(
        &ModelKind::Other("rnn".to_string()),
        None,
        InputSpec {
            channels: 1,
            height: 28,
            width: 28,
        },
    )
    .unwrap();
    assert_eq!(other.tensor.shape(), &[1, 1, 28, 28]);
}

#[test]
fn test_synthesize_input_missing_image_falls_back_to_random() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.png");
    let input = synthesize_input(&ModelKind::Cnn, Some(&missing), InputSpec::default()).unwrap();
    assert_eq!(input.tensor.shape(), &[1, 3, 32, 32]);
    assert!(input.image_base64.is_none());
}

#[test]
fn test_synthesize_input_from_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.png");
    image::RgbImage::from_pixel(48, 48, image::Rgb([0, 128, 255]))
        .save(&path)
        .unwrap();

    let input = synthesize_input(&ModelKind::Cnn, Some(&path), InputSpec::default()).unwrap();
    assert_eq!(input.tensor.shape(), &[1, 3, 32, 32]);
    let raw = std::fs::read(&path).unwrap();
    assert_eq!(input.image_base64, Some(STANDARD.encode(raw)));

    // 非3通道的声明输入不使用图像
    let spec = InputSpec {
        channels: 1,
        height: 32,
        width: 32,
    };
    let gray = synthesize_input(&ModelKind::Cnn, Some(&path), spec).unwrap();
    assert_eq!(gray.tensor.shape(), &[1, 1, 32, 32]);
    assert!(gray.image_base64.is_none());
}

#[test]
fn test_run_inference_tiny_resnet_without_image() {
    let mut net = tiny_resnet(10);
    let result =
        run_inference(&mut net, "tiny_resnet", &ModelKind::Cnn, None, InputSpec::default())
            .unwrap();
    assert_eq!(net.mode(), Mode::Eval);

    assert_eq!(result.model_name, "tiny_resnet");
    assert_eq!(result.input_shape, vec![1, 3, 32, 32]);
    assert_eq!(result.output_shape, vec![1, 10]);
    assert!(result.input_image.is_none());
    assert_eq!(result.steps.len(), 17);

    for (i, step) in result.steps.iter().enumerate() {
        assert_eq!(step.step_index, i);
        assert_eq!(step.layer_id, format!("layer_{}", i + 1));
        assert!(!step.feature_map_image.is_empty());
    }

    let relu = &result.steps[2];
    assert_eq!(relu.layer_name, "relu");
    assert_eq!(relu.operation, "ReLU");
    // 最后一次调用生效
    assert_eq!(relu.input_shape, vec![1, 64, 8, 8]);
    assert_eq!(relu.output_shape, vec![1, 64, 8, 8]);
    assert!(relu.activation_stats.min >= 0.);

    let downsample = &result.steps[8];
    assert_eq!(downsample.layer_name, "downsample1");
    assert_eq!(downsample.input_shape, vec![1, 16, 16, 16]);
    assert_eq!(downsample.output_shape, vec![1, 32, 16, 16]);

    let fc = result.steps.last().unwrap();
    assert_eq!(fc.operation, "Linear");
    assert_eq!(fc.input_shape, vec![1, 64]);
    assert_eq!(fc.output_shape, vec![1, 10]);
}

#[test]
fn test_run_inference_feature_map_is_png() {
    let mut net = tiny_resnet(10);
    let result =
        run_inference(&mut net, "tiny_resnet", &ModelKind::Cnn, None, InputSpec::default())
            .unwrap();
    let bytes = STANDARD.decode(&result.steps[0].feature_map_image).unwrap();
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!(img.width(), FEATURE_MAP_SIZE);
    assert_eq!(img.height(), FEATURE_MAP_SIZE);
}

#[test]
fn test_run_inference_mini_transformer() {
    let mut net = mini_transformer(MiniTransformerConfig::default()).unwrap();
    let result = run_inference(
        &mut net,
        "mini_transformer",
        &ModelKind::Transformer,
        None,
        InputSpec::default(),
    )
    .unwrap();
    assert_eq!(result.input_shape, vec![1, 16]);
    assert_eq!(result.output_shape, vec![1, 10]);

    let names = result
        .steps
        .iter()
        .map(|s| s.layer_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec!["embedding", "pos_embedding", "transformer", "layer_norm", "fc"]
    );
    assert_eq!(result.steps[1].input_shape, vec![1, 16]);
    assert_eq!(result.steps[2].output_shape, vec![1, 16, 64]);
    assert_eq!(result.steps[2].operation, "TransformerEncoder");
}

#[test]
fn test_run_inference_sub_modules_and_stats_json() {
    let features = Sequential::new(vec![
        Layer::from(Conv2d::new(1, 2, (3, 3), (1, 1), (1, 1), true)),
        Layer::from(ReLU),
    ]);
    let mut net = Network::sequential(
        "Custom",
        vec![
            ("features".to_string(), Layer::from(features)),
            ("flatten".to_string(), Layer::from(Flatten::default())),
            ("fc".to_string(), Layer::from(Linear::new(2 * 28 * 28, 1, true))),
        ],
    );
    let spec = InputSpec {
        channels: 1,
        height: 28,
        width: 28,
    };
    let result = run_inference(&mut net, "custom_x", &ModelKind::Cnn, None, spec).unwrap();
    assert_eq!(result.input_shape, vec![1, 1, 28, 28]);
    assert_eq!(result.output_shape, vec![1, 1]);

    let ops = result
        .steps
        .iter()
        .map(|s| (s.layer_name.as_str(), s.operation.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        ops,
        vec![
            ("features.0", "SubModule"),
            ("features.1", "SubModule"),
            ("flatten", "Flatten"),
            ("fc", "Linear"),
        ]
    );

    // 单元素输出：无偏标准差为 NaN，序列化为 null
    let json = serde_json::to_value(&result.steps[3]).unwrap();
    assert!(json["activation_stats"]["std"].is_null());
    assert!(json["activation_stats"]["mean"].is_number());
}
