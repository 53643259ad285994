use crate::error::RevgradError;
use crate::ops::view::reshape_op;
use crate::tensor::Tensor;

impl Tensor {
    /// Returns a tensor with the same values and `new_shape`, sharing this
    /// tensor's buffer.
    ///
    /// # Errors
    /// `InvalidReshape` if the number of elements differs.
    pub fn reshape(&self, new_shape: Vec<usize>) -> Result<Tensor, RevgradError> {
        reshape_op(self, new_shape)
    }
}
