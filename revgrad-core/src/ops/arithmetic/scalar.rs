use crate::autograd::backward_op::BackwardRule;
use crate::autograd::graph::record_operation;
use crate::error::RevgradError;
use crate::ops::unary_kernel;
use crate::tensor::Tensor;

/// Adds the constant `scalar` to every element.
pub fn add_scalar_op(a: &Tensor, scalar: f64) -> Result<Tensor, RevgradError> {
    let output = unary_kernel(a, |x| x + scalar)?;
    Ok(record_operation(&[a], output, || BackwardRule::AddScalar))
}

/// Multiplies every element by the constant `factor`.
pub fn mul_scalar_op(a: &Tensor, factor: f64) -> Result<Tensor, RevgradError> {
    let output = unary_kernel(a, |x| x * factor)?;
    Ok(record_operation(&[a], output, || BackwardRule::MulScalar { factor }))
}

pub(crate) fn add_scalar_backward(grad_output: &Tensor) -> Result<Vec<Option<Tensor>>, RevgradError> {
    Ok(vec![Some(grad_output.clone())])
}

pub(crate) fn mul_scalar_backward(
    factor: f64,
    grad_output: &Tensor,
) -> Result<Vec<Option<Tensor>>, RevgradError> {
    Ok(vec![Some(mul_scalar_op(grad_output, factor)?)])
}

#[cfg(test)]
#[path = "scalar_test.rs"]
mod tests;
