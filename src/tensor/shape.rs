use super::Tensor;
use crate::errors::TensorError;
use ndarray::{Axis, IxDyn};

impl Tensor {
    /// 变形。元素总数须保持不变
    pub fn reshape(&self, shape: &[usize]) -> Result<Self, TensorError> {
        let new_total_elements: usize = shape.iter().product();
        if self.size() != new_total_elements {
            return Err(TensorError::IncompatibleShape {
                from: self.shape().to_vec(),
                to: shape.to_vec(),
            });
        }
        let data = self
            .data
            .as_standard_layout()
            .to_owned()
            .into_shape(IxDyn(shape))
            .map_err(|_| TensorError::IncompatibleShape {
                from: self.shape().to_vec(),
                to: shape.to_vec(),
            })?;
        Ok(Self { data })
    }

    /// 从`start_dim`开始把后续所有维度展平成一维（同PyTorch的`torch.flatten(x, start_dim)`）
    pub fn flatten_from(&self, start_dim: usize) -> Result<Self, TensorError> {
        let shape = self.shape();
        if start_dim >= shape.len() {
            return Err(TensorError::AxisOutOfRange {
                axis: start_dim,
                shape: shape.to_vec(),
            });
        }
        let mut new_shape = shape[..start_dim].to_vec();
        new_shape.push(shape[start_dim..].iter().product());
        self.reshape(&new_shape)
    }

    /// 在`axis`处插入一个长度为1的维度
    pub fn unsqueeze(&self, axis: usize) -> Result<Self, TensorError> {
        if axis > self.dimension() {
            return Err(TensorError::AxisOutOfRange {
                axis,
                shape: self.shape().to_vec(),
            });
        }
        Ok(Self {
            data: self.data.clone().insert_axis(Axis(axis)),
        })
    }
}
