use crate::errors::TensorError;
use crate::tensor::Tensor;

#[test]
fn test_reshape() {
    let tensor = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[2, 3]);
    let reshaped = tensor.reshape(&[3, 2]).unwrap();
    assert_eq!(reshaped.shape(), &[3, 2]);
    assert_eq!(reshaped.to_vec(), tensor.to_vec());

    assert_eq!(
        tensor.reshape(&[4, 2]),
        Err(TensorError::IncompatibleShape {
            from: vec![2, 3],
            to: vec![4, 2],
        })
    );
}

#[test]
fn test_flatten_from() {
    let tensor = Tensor::zeros(&[1, 64, 1, 1]);
    assert_eq!(tensor.flatten_from(1).unwrap().shape(), &[1, 64]);
    assert!(tensor.flatten_from(4).is_err());
}

#[test]
fn test_unsqueeze() {
    let tensor = Tensor::zeros(&[3, 32, 32]);
    assert_eq!(tensor.unsqueeze(0).unwrap().shape(), &[1, 3, 32, 32]);
    assert_eq!(tensor.unsqueeze(3).unwrap().shape(), &[3, 32, 32, 1]);
    assert!(tensor.unsqueeze(4).is_err());
}
