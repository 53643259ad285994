use crate::autograd::backward_op::BackwardRule;
use crate::autograd::graph::record_operation;
use crate::error::RevgradError;
use crate::ops::{binary_kernel, unary_kernel};
use crate::tensor::Tensor;

/// Computes the square root element-wise.
pub fn sqrt_op(a: &Tensor) -> Result<Tensor, RevgradError> {
    let output = unary_kernel(a, f64::sqrt)?;
    let captured = output.detach();
    Ok(record_operation(&[a], output, || BackwardRule::Sqrt { output: captured }))
}

/// `d(√x)/dx = 1/(2√x)`, computed from the saved output.
pub(crate) fn sqrt_backward(output: &Tensor, grad_output: &Tensor) -> Result<Vec<Option<Tensor>>, RevgradError> {
    Ok(vec![Some(binary_kernel(grad_output, output, |g, y| g / (2.0 * y))?)])
}

#[cfg(test)]
#[path = "sqrt_test.rs"]
mod tests;
