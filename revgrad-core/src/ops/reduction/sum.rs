use crate::autograd::backward_op::BackwardRule;
use crate::autograd::graph::record_operation;
use crate::error::RevgradError;
use crate::ops::reduction::utils::{
    calculate_grad_broadcast_shape, calculate_reduction_output_shape, process_reduction_axes,
    sum_axes_kernel,
};
use crate::tensor::Tensor;

/// Sums the elements of `input` over `axes` (every axis when `None`).
///
/// With `keep_dims` the reduced dimensions remain with size 1.
///
/// # Errors
/// `IndexOutOfBounds` if an axis is not smaller than the rank.
pub fn sum_op(input: &Tensor, axes: Option<&[usize]>, keep_dims: bool) -> Result<Tensor, RevgradError> {
    let (buffer, input_shape) = {
        let guard = input.read_data();
        (guard.buffer().clone(), guard.shape.clone())
    };
    let axes = process_reduction_axes(&input_shape, axes)?;
    let output_shape = calculate_reduction_output_shape(&input_shape, &axes, keep_dims);
    let output = Tensor::new(sum_axes_kernel(buffer.as_slice(), &input_shape, &axes), output_shape)?;

    Ok(record_operation(&[input], output, || BackwardRule::Sum {
        input_shape,
        axes,
        keep_dims,
    }))
}

/// Every input element contributed once to its output element, so the output
/// gradient is broadcast back over the reduced axes.
pub(crate) fn sum_backward(
    input_shape: &[usize],
    axes: &[usize],
    _keep_dims: bool,
    grad_output: &Tensor,
) -> Result<Vec<Option<Tensor>>, RevgradError> {
    Ok(vec![Some(broadcast_reduced_grad(input_shape, axes, grad_output)?)])
}

/// Reinstates the reduced axes of `grad_output` and expands it to `input_shape`.
pub(crate) fn broadcast_reduced_grad(
    input_shape: &[usize],
    axes: &[usize],
    grad_output: &Tensor,
) -> Result<Tensor, RevgradError> {
    let kept_shape = calculate_grad_broadcast_shape(input_shape, axes);
    let grad = if grad_output.shape() == kept_shape {
        grad_output.clone()
    } else {
        grad_output.reshape(kept_shape)?
    };
    grad.expand_to_shape(input_shape)
}

#[cfg(test)]
#[path = "sum_test.rs"]
mod tests;
