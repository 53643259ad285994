use crate::autograd::backward_op::BackwardRule;
use crate::autograd::graph::record_operation;
use crate::error::RevgradError;
use crate::ops::{binary_kernel, unary_kernel};
use crate::tensor::Tensor;

/// Computes the natural logarithm element-wise. Non-positive inputs give
/// `-inf` or NaN as in IEEE 754.
pub fn ln_op(a: &Tensor) -> Result<Tensor, RevgradError> {
    let output = unary_kernel(a, f64::ln)?;
    Ok(record_operation(&[a], output, || BackwardRule::Ln { input: a.detach() }))
}

/// `d(ln x)/dx = 1/x`.
pub(crate) fn ln_backward(input: &Tensor, grad_output: &Tensor) -> Result<Vec<Option<Tensor>>, RevgradError> {
    Ok(vec![Some(binary_kernel(grad_output, input, |g, x| g / x)?)])
}

#[cfg(test)]
#[path = "ln_test.rs"]
mod tests;
