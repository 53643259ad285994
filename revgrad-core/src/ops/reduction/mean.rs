use crate::autograd::backward_op::BackwardRule;
use crate::autograd::graph::record_operation;
use crate::error::RevgradError;
use crate::ops::reduction::sum::{broadcast_reduced_grad, sum_op};
use crate::ops::reduction::utils::{process_reduction_axes, reduction_count};
use crate::ops::unary_kernel;
use crate::tensor::Tensor;

/// Arithmetic mean of `input` over `axes` (every axis when `None`).
///
/// Averaging over an empty axis gives NaN.
pub fn mean_op(input: &Tensor, axes: Option<&[usize]>, keep_dims: bool) -> Result<Tensor, RevgradError> {
    let input_shape = input.shape();
    let axes = process_reduction_axes(&input_shape, axes)?;
    let count = reduction_count(&input_shape, &axes) as f64;

    let summed = sum_op(&input.detach(), Some(&axes), keep_dims)?;
    let output = unary_kernel(&summed, |v| v / count)?;

    Ok(record_operation(&[input], output, || BackwardRule::Mean {
        input_shape,
        axes,
        keep_dims,
    }))
}

/// The sum gradient scaled by `1/n`, `n` being the number of elements
/// averaged into each output.
pub(crate) fn mean_backward(
    input_shape: &[usize],
    axes: &[usize],
    _keep_dims: bool,
    grad_output: &Tensor,
) -> Result<Vec<Option<Tensor>>, RevgradError> {
    let count = reduction_count(input_shape, axes) as f64;
    let grad = broadcast_reduced_grad(input_shape, axes, grad_output)?;
    Ok(vec![Some(unary_kernel(&grad, |g| g / count)?)])
}

#[cfg(test)]
#[path = "mean_test.rs"]
mod tests;
