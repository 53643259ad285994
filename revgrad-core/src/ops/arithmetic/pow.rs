use crate::autograd::backward_op::BackwardRule;
use crate::autograd::graph::record_operation;
use crate::error::RevgradError;
use crate::ops::{binary_kernel, unary_kernel};
use crate::tensor::Tensor;

/// Raises every element to the constant power `exponent`.
pub fn pow_scalar_op(base: &Tensor, exponent: f64) -> Result<Tensor, RevgradError> {
    let output = unary_kernel(base, |x| x.powf(exponent))?;
    Ok(record_operation(&[base], output, || BackwardRule::PowScalar {
        base: base.detach(),
        exponent,
    }))
}

/// `d(xⁿ)/dx = n·xⁿ⁻¹`. A zero exponent has a zero derivative everywhere,
/// including at `x = 0`.
pub(crate) fn pow_scalar_backward(
    base: &Tensor,
    exponent: f64,
    grad_output: &Tensor,
) -> Result<Vec<Option<Tensor>>, RevgradError> {
    let grad = binary_kernel(grad_output, base, |g, x| {
        if exponent == 0.0 {
            0.0
        } else {
            g * exponent * x.powf(exponent - 1.0)
        }
    })?;
    Ok(vec![Some(grad)])
}

#[cfg(test)]
#[path = "pow_test.rs"]
mod tests;
