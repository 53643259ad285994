use crate::autograd::backward_op::{grad_if, BackwardRule};
use crate::autograd::graph::record_operation;
use crate::error::RevgradError;
use crate::ops::arithmetic::neg::neg_op;
use crate::ops::binary_kernel;
use crate::tensor::Tensor;

/// Performs element-wise subtraction `a - b` with broadcasting.
pub fn sub_op(a: &Tensor, b: &Tensor) -> Result<Tensor, RevgradError> {
    let output = binary_kernel(a, b, |x, y| x - y)?;
    Ok(record_operation(&[a, b], output, || BackwardRule::Sub))
}

pub(crate) fn sub_backward(
    grad_output: &Tensor,
    needs_input_grad: &[bool],
) -> Result<Vec<Option<Tensor>>, RevgradError> {
    Ok(vec![
        grad_if(needs_input_grad, 0, || Ok(grad_output.clone()))?,
        grad_if(needs_input_grad, 1, || neg_op(grad_output))?,
    ])
}

#[cfg(test)]
#[path = "sub_test.rs"]
mod tests;
