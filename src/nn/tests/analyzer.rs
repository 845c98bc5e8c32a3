use crate::nn::layer::{Conv2d, Linear, ReLU, Sequential};
use crate::nn::models::{MiniTransformerConfig, mini_transformer, tiny_resnet};
use crate::nn::{Layer, Network, analyze, get_model_summary};
use serde_json::json;

#[test]
fn test_tiny_resnet_summary() {
    let summary = get_model_summary(&tiny_resnet(10));
    assert_eq!(summary.model_name, "TinyResNet");
    assert_eq!(summary.total_params, 73_482);
    assert_eq!(summary.trainable_params, 73_482);
    assert_eq!(summary.layers.len(), 17);

    let first = &summary.layers[0];
    assert_eq!(first.id, "layer_1");
    assert_eq!(first.name, "conv1");
    assert_eq!(first.layer_type, "Conv2d");
    assert_eq!(first.total_params, 448);
    assert_eq!(
        serde_json::to_value(first).unwrap(),
        json!({
            "id": "layer_1",
            "name": "conv1",
            "type": "Conv2d",
            "params": {
                "in_channels": 3,
                "out_channels": 16,
                "kernel_size": [3, 3],
                "stride": [1, 1],
                "padding": [1, 1],
            },
            "total_params": 448,
            "trainable_params": 448,
            "nested_params": 448,
        })
    );

    let relu = &summary.layers[2];
    assert_eq!(relu.name, "relu");
    assert_eq!(serde_json::to_value(&relu.params).unwrap(), json!({}));

    let ids = summary.layers.iter().map(|l| l.id.clone()).collect::<Vec<_>>();
    let expected = (1..=17).map(|i| format!("layer_{i}")).collect::<Vec<_>>();
    assert_eq!(ids, expected);
}

#[test]
fn test_per_layer_counts_are_own_only() {
    let summary = get_model_summary(&mini_transformer(MiniTransformerConfig::default()).unwrap());
    assert_eq!(summary.model_name, "MiniTransformer");
    assert_eq!(summary.total_params, 166_794);
    assert_eq!(summary.layers.len(), 5);

    let transformer = &summary.layers[2];
    assert_eq!(transformer.name, "transformer");
    assert_eq!(transformer.layer_type, "TransformerEncoder");
    assert_eq!(transformer.total_params, 0);
    assert_eq!(transformer.nested_params, 99_968);
    assert_eq!(serde_json::to_value(&transformer.params).unwrap(), json!({"num_layers": 2}));

    // 逐层统计之和不等于总量
    let own_sum: usize = summary.layers.iter().map(|l| l.total_params).sum();
    assert_eq!(own_sum, 166_794 - 99_968);
    let nested_sum: usize = summary.layers.iter().map(|l| l.nested_params).sum();
    assert_eq!(nested_sum, summary.total_params);
}

#[test]
fn test_nested_container_names() {
    let features = Sequential::new(vec![
        Layer::from(Conv2d::new(1, 2, (3, 3), (1, 1), (0, 0), true)),
        Layer::from(ReLU),
    ]);
    let net = Network::sequential(
        "Custom",
        vec![
            ("features".to_string(), Layer::from(features)),
            ("fc".to_string(), Layer::from(Linear::new(8, 2, true))),
        ],
    );
    let layers = analyze(&net);
    let names = layers
        .iter()
        .map(|l| (l.id.as_str(), l.name.as_str(), l.layer_type.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            ("layer_1", "features.0", "Conv2d"),
            ("layer_2", "features.1", "ReLU"),
            ("layer_3", "fc", "Linear"),
        ]
    );
}

#[test]
fn test_frozen_parameters_are_not_trainable() {
    let mut net = tiny_resnet(10);
    for child in net.children_mut() {
        if child.name == "fc" {
            let Layer::Linear(fc) = &mut child.layer else {
                panic!("fc 应为 Linear");
            };
            fc.weight_mut().set_requires_grad(false);
        }
    }
    let summary = get_model_summary(&net);
    assert_eq!(summary.total_params, 73_482);
    assert_eq!(summary.trainable_params, 73_482 - 640);
    let fc = summary.layers.last().unwrap();
    assert_eq!(fc.total_params, 650);
    assert_eq!(fc.trainable_params, 10);
}
