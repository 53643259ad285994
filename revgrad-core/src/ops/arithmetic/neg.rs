use crate::autograd::backward_op::BackwardRule;
use crate::autograd::graph::record_operation;
use crate::error::RevgradError;
use crate::ops::unary_kernel;
use crate::tensor::Tensor;

/// Performs element-wise negation `-a`.
pub fn neg_op(a: &Tensor) -> Result<Tensor, RevgradError> {
    let output = unary_kernel(a, |x| -x)?;
    Ok(record_operation(&[a], output, || BackwardRule::Neg))
}

pub(crate) fn neg_backward(grad_output: &Tensor) -> Result<Vec<Option<Tensor>>, RevgradError> {
    Ok(vec![Some(neg_op(grad_output)?)])
}

#[cfg(test)]
#[path = "neg_test.rs"]
mod tests;
