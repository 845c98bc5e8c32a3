use crate::nn::registry::{InputSpec, ModelKind, ModelOrigin, NoUploads, ResolvedModel};
use crate::nn::{BUILTIN_MODELS, ModelError, UploadedModels, get_model, resolve};

struct OneUpload;

impl UploadedModels for OneUpload {
    fn lookup(&self, id: &str) -> Result<Option<ResolvedModel>, ModelError> {
        if id != "custom_0000abcd" {
            return Ok(None);
        }
        Ok(Some(ResolvedModel {
            network: get_model("tiny_resnet")?,
            kind: ModelKind::from_tag("cnn"),
            input: InputSpec::default(),
            origin: ModelOrigin::Uploaded,
        }))
    }
}

#[test]
fn test_builtin_models() {
    let ids = BUILTIN_MODELS.iter().map(|m| m.id).collect::<Vec<_>>();
    assert_eq!(ids, vec!["tiny_resnet", "mini_transformer"]);
    assert_eq!(get_model("tiny_resnet").unwrap().class_name(), "TinyResNet");
    assert_eq!(
        get_model("mini_transformer").unwrap().class_name(),
        "MiniTransformer"
    );
}

#[test]
fn test_unknown_model() {
    let err = get_model("vgg").unwrap_err();
    assert!(matches!(err, ModelError::UnknownModel(_)));
    assert_eq!(err.to_string(), "Unknown model: vgg");

    let err = resolve("custom_ffffffff", &OneUpload).unwrap_err();
    assert_eq!(err.to_string(), "Unknown model: custom_ffffffff");
}

#[test]
fn test_resolve() {
    let builtin = resolve("mini_transformer", &NoUploads).unwrap();
    assert_eq!(builtin.kind, ModelKind::Transformer);
    assert_eq!(builtin.origin, ModelOrigin::Builtin);

    let builtin = resolve("tiny_resnet", &NoUploads).unwrap();
    assert_eq!(builtin.kind, ModelKind::Cnn);

    let uploaded = resolve("custom_0000abcd", &OneUpload).unwrap();
    assert_eq!(uploaded.origin, ModelOrigin::Uploaded);
}

#[test]
fn test_model_kind_tags() {
    assert_eq!(ModelKind::from_tag("CNN"), ModelKind::Cnn);
    assert_eq!(ModelKind::from_tag("transformer"), ModelKind::Transformer);
    assert_eq!(ModelKind::from_tag("rnn"), ModelKind::Other("rnn".to_string()));
    assert_eq!(InputSpec::default().shape(), [1, 3, 32, 32]);
}
