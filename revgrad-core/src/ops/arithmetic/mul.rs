use crate::autograd::backward_op::{grad_if, BackwardRule};
use crate::autograd::graph::record_operation;
use crate::error::RevgradError;
use crate::ops::binary_kernel;
use crate::tensor::Tensor;

/// Performs element-wise multiplication `a * b` with broadcasting.
///
/// When tracked, detached handles to both operands are kept for the
/// backward pass.
pub fn mul_op(a: &Tensor, b: &Tensor) -> Result<Tensor, RevgradError> {
    let output = binary_kernel(a, b, |x, y| x * y)?;
    Ok(record_operation(&[a, b], output, || BackwardRule::Mul {
        lhs: a.detach(),
        rhs: b.detach(),
    }))
}

/// `d(a*b)/da = b`, `d(a*b)/db = a`.
pub(crate) fn mul_backward(
    lhs: &Tensor,
    rhs: &Tensor,
    grad_output: &Tensor,
    needs_input_grad: &[bool],
) -> Result<Vec<Option<Tensor>>, RevgradError> {
    Ok(vec![
        grad_if(needs_input_grad, 0, || mul_op(grad_output, rhs))?,
        grad_if(needs_input_grad, 1, || mul_op(grad_output, lhs))?,
    ])
}

#[cfg(test)]
#[path = "mul_test.rs"]
mod tests;
