use crate::nn::layer::{Dropout, Flatten, GELU, ReLU};
use crate::nn::{LayerParams, Mode, TraitLayer};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;

fn run(layer: &dyn TraitLayer, x: &Tensor, mode: Mode) -> Tensor {
    layer.forward(x, mode).unwrap().into_primary().unwrap()
}

#[test]
fn test_relu() {
    let x = Tensor::new(&[-2., -0.5, 0., 0.5, 2.], &[5]);
    assert_eq!(run(&ReLU, &x, Mode::Eval).to_vec(), vec![0., 0., 0., 0.5, 2.]);
    assert_eq!(ReLU.params(), LayerParams::Unsupported {});
    assert_eq!(serde_json::to_string(&ReLU.params()).unwrap(), "{}");
}

#[test]
fn test_gelu_exact_erf_form() {
    // torch.nn.functional.gelu(approximate='none')
    let x = Tensor::new(&[-3., -1., 0., 0.5, 1., 2.], &[6]);
    let expected = [-0.004_049_7, -0.158_655_3, 0., 0.345_731_2, 0.841_344_7, 1.954_499_7];
    for (a, b) in run(&GELU, &x, Mode::Eval).to_vec().iter().zip(expected.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-5);
    }
}

#[test]
fn test_dropout_is_identity_in_eval() {
    let x = Tensor::new_normal(0., 1., &[4, 8]);
    assert_eq!(run(&Dropout::new(0.5), &x, Mode::Eval), x);
}

#[test]
fn test_dropout_in_train() {
    let x = Tensor::ones(&[1000]);
    assert_eq!(run(&Dropout::new(1.), &x, Mode::Train).to_vec().iter().sum::<f32>(), 0.);
    assert_eq!(run(&Dropout::new(0.), &x, Mode::Train), x);

    // 保留的元素按 1/(1-p) 放大
    let y = run(&Dropout::new(0.5), &x, Mode::Train);
    assert!(y.to_vec().iter().all(|&v| v == 0. || v == 2.));
}

#[test]
fn test_flatten() {
    let x = Tensor::zeros(&[2, 64, 1, 1]);
    assert_eq!(run(&Flatten::default(), &x, Mode::Eval).shape(), &[2, 64]);
    assert!(Flatten::new(4).forward(&x, Mode::Eval).is_err());
}
