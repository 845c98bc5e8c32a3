use crate::errors::TensorError;
use crate::tensor::Tensor;
use ndarray::Axis;

impl Tensor {
    /// 对每个元素应用`f`
    pub fn map<F: FnMut(f32) -> f32>(&self, f: F) -> Tensor {
        Tensor::from_array(self.data.mapv(f))
    }

    /// 沿`axis`求均值，该维度会被去掉（如Transformer中对序列维做全局平均）
    pub fn mean_axis(&self, axis: usize) -> Result<Tensor, TensorError> {
        if axis >= self.dimension() || self.shape()[axis] == 0 {
            return Err(TensorError::AxisOutOfRange {
                axis,
                shape: self.shape().to_vec(),
            });
        }
        self.data
            .mean_axis(Axis(axis))
            .map(Tensor::from_array)
            .ok_or_else(|| TensorError::AxisOutOfRange {
                axis,
                shape: self.shape().to_vec(),
            })
    }
}
