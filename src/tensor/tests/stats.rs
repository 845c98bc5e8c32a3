use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;

#[test]
fn test_mean_std_min_max() {
    let tensor = Tensor::new(&[1., 2., 3., 4.], &[2, 2]);
    assert_abs_diff_eq!(tensor.mean(), 2.5);
    // 无偏标准差：sqrt(5/3)
    assert_abs_diff_eq!(tensor.std(), 1.2909944, epsilon = 1e-6);
    assert_eq!(tensor.min(), 1.);
    assert_eq!(tensor.max(), 4.);
}

#[test]
fn test_stats_of_constant_tensor() {
    let tensor = Tensor::full(0.7, &[1, 10]);
    assert_abs_diff_eq!(tensor.mean(), 0.7, epsilon = 1e-6);
    assert_abs_diff_eq!(tensor.std(), 0.);
    assert_eq!(tensor.min(), tensor.max());
}

#[test]
fn test_stats_of_degenerate_tensor() {
    let single = Tensor::new(&[5.], &[1]);
    assert_eq!(single.mean(), 5.);
    assert!(single.std().is_nan());

    let empty = Tensor::zeros(&[0]);
    assert!(empty.mean().is_nan());
    assert!(empty.min().is_nan());
    assert!(empty.max().is_nan());
}
