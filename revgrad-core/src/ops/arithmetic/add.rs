use crate::autograd::backward_op::{grad_if, BackwardRule};
use crate::autograd::graph::record_operation;
use crate::error::RevgradError;
use crate::ops::binary_kernel;
use crate::tensor::Tensor;

/// Performs element-wise addition `a + b` with broadcasting.
///
/// # Errors
/// `BroadcastError` if the shapes are incompatible.
pub fn add_op(a: &Tensor, b: &Tensor) -> Result<Tensor, RevgradError> {
    let output = binary_kernel(a, b, |x, y| x + y)?;
    Ok(record_operation(&[a, b], output, || BackwardRule::Add))
}

/// `d(a+b)/da = 1`, `d(a+b)/db = 1`: both inputs receive the output gradient
/// unchanged (the engine reduces broadcast dimensions).
pub(crate) fn add_backward(
    grad_output: &Tensor,
    needs_input_grad: &[bool],
) -> Result<Vec<Option<Tensor>>, RevgradError> {
    Ok(vec![
        grad_if(needs_input_grad, 0, || Ok(grad_output.clone()))?,
        grad_if(needs_input_grad, 1, || Ok(grad_output.clone()))?,
    ])
}

#[cfg(test)]
#[path = "add_test.rs"]
mod tests;
