use thiserror::Error;
mod ops;
pub use self::ops::*;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
    // 构造
    #[error("数据长度{data_len}与形状{shape:?}的元素个数不一致")]
    DataShapeMismatch { data_len: usize, shape: Vec<usize> },
    // 数字比较用
    #[error("{value_name}须{operator}{threshold}")]
    ValueMustSatisfyComparison {
        value_name: String,
        operator: ComparisonOperator,
        threshold: usize,
    },
    // 张量二元运算
    #[error(
        "形状不一致，故无法{operator}：第一个张量的形状为{tensor1_shape:?}，第二个张量的形状为{tensor2_shape:?}"
    )]
    OperatorError {
        operator: Operator,
        tensor1_shape: Vec<usize>,
        tensor2_shape: Vec<usize>,
    },
    #[error("张量维数须为{expected}，实际形状为{got:?}")]
    DimensionMismatch { expected: usize, got: Vec<usize> },
    #[error("轴{axis}超出了形状{shape:?}的范围")]
    AxisOutOfRange { axis: usize, shape: Vec<usize> },
    #[error("张量形状不兼容：无法从{from:?}变形为{to:?}")]
    IncompatibleShape { from: Vec<usize>, to: Vec<usize> },
}
