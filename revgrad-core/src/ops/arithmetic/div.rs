use crate::autograd::backward_op::{grad_if, BackwardRule};
use crate::autograd::graph::record_operation;
use crate::error::RevgradError;
use crate::ops::binary_kernel;
use crate::tensor::Tensor;

/// Performs element-wise division `a / b` with broadcasting. Division by zero
/// follows IEEE 754.
pub fn div_op(a: &Tensor, b: &Tensor) -> Result<Tensor, RevgradError> {
    let output = binary_kernel(a, b, |x, y| x / y)?;
    Ok(record_operation(&[a, b], output, || BackwardRule::Div {
        lhs: a.detach(),
        rhs: b.detach(),
    }))
}

/// `d(a/b)/da = 1/b`, `d(a/b)/db = -a/b²`.
pub(crate) fn div_backward(
    lhs: &Tensor,
    rhs: &Tensor,
    grad_output: &Tensor,
    needs_input_grad: &[bool],
) -> Result<Vec<Option<Tensor>>, RevgradError> {
    Ok(vec![
        grad_if(needs_input_grad, 0, || div_op(grad_output, rhs))?,
        grad_if(needs_input_grad, 1, || {
            let quotient = binary_kernel(lhs, rhs, |a, b| -a / (b * b))?;
            binary_kernel(grad_output, &quotient, |g, q| g * q)
        })?,
    ])
}

#[cfg(test)]
#[path = "div_test.rs"]
mod tests;
