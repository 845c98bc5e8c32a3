use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use std::ops::Add;

impl Tensor {
    /// 逐元素相加，两个张量形状须严格一致（残差连接、位置编码相加都属此类）
    pub fn checked_add(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        if !self.is_same_shape(other) {
            return Err(TensorError::OperatorError {
                operator: Operator::Add,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            });
        }
        Ok(Tensor::from_array(&self.data + &other.data))
    }

    /// 把`other`广播到`self`的形状后相加（如[batch, seq, d]加上[1, seq, d]的位置编码）
    pub fn broadcast_add(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        let rhs = other
            .data
            .broadcast(self.data.raw_dim())
            .ok_or_else(|| TensorError::OperatorError {
                operator: Operator::Add,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            })?;
        Ok(Tensor::from_array(&self.data + &rhs))
    }
}

impl<'a> Add<&'a Tensor> for &'a Tensor {
    type Output = Tensor;

    fn add(self, other: &'a Tensor) -> Tensor {
        match self.checked_add(other) {
            Ok(t) => t,
            Err(e) => panic!("{}", e),
        }
    }
}

impl Add for Tensor {
    type Output = Tensor;

    fn add(self, other: Tensor) -> Tensor {
        &self + &other
    }
}
