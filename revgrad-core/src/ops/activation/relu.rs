use crate::autograd::backward_op::BackwardRule;
use crate::autograd::graph::record_operation;
use crate::error::RevgradError;
use crate::ops::{binary_kernel, unary_kernel};
use crate::tensor::Tensor;

/// Rectified linear unit, `max(x, 0)`.
pub fn relu_op(a: &Tensor) -> Result<Tensor, RevgradError> {
    let output = unary_kernel(a, |x| if x > 0.0 { x } else { 0.0 })?;
    Ok(record_operation(&[a], output, || BackwardRule::Relu { input: a.detach() }))
}

/// The gradient passes where the input was strictly positive. At `x = 0` the
/// subgradient 0 is used.
pub(crate) fn relu_backward(input: &Tensor, grad_output: &Tensor) -> Result<Vec<Option<Tensor>>, RevgradError> {
    let grad = binary_kernel(grad_output, input, |g, x| if x > 0.0 { g } else { 0.0 })?;
    Ok(vec![Some(grad)])
}

#[cfg(test)]
#[path = "relu_test.rs"]
mod tests;
