use crate::error::RevgradError;
use crate::ops::reduction;
use crate::tensor::Tensor;

impl Tensor {
    /// Sums every element into a 0-d tensor.
    pub fn sum(&self) -> Result<Tensor, RevgradError> {
        reduction::sum_op(self, None, false)
    }

    /// Sums over `axes`. Delegates to `ops::reduction::sum::sum_op`.
    pub fn sum_axes(&self, axes: &[usize], keep_dims: bool) -> Result<Tensor, RevgradError> {
        reduction::sum_op(self, Some(axes), keep_dims)
    }

    /// Mean of every element as a 0-d tensor.
    pub fn mean(&self) -> Result<Tensor, RevgradError> {
        reduction::mean_op(self, None, false)
    }

    /// Mean over `axes`. Delegates to `ops::reduction::mean::mean_op`.
    pub fn mean_axes(&self, axes: &[usize], keep_dims: bool) -> Result<Tensor, RevgradError> {
        reduction::mean_op(self, Some(axes), keep_dims)
    }
}
