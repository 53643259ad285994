use crate::autograd::backward_op::BackwardRule;
use crate::autograd::graph::record_operation;
use crate::error::RevgradError;
use crate::ops::{binary_kernel, unary_kernel};
use crate::tensor::Tensor;

/// Computes `eˣ` element-wise. The output itself is kept for the backward
/// pass, since it equals the derivative.
pub fn exp_op(a: &Tensor) -> Result<Tensor, RevgradError> {
    let output = unary_kernel(a, f64::exp)?;
    let captured = output.detach();
    Ok(record_operation(&[a], output, || BackwardRule::Exp { output: captured }))
}

pub(crate) fn exp_backward(output: &Tensor, grad_output: &Tensor) -> Result<Vec<Option<Tensor>>, RevgradError> {
    Ok(vec![Some(binary_kernel(grad_output, output, |g, y| g * y)?)])
}

#[cfg(test)]
#[path = "exp_test.rs"]
mod tests;
