//! Utility functions for reduction operations.

use crate::error::RevgradError;
use crate::tensor::utils::{calculate_strides, index_to_coord};
use num_traits::Zero;
use std::ops::AddAssign;

/// Processes the axes provided for a reduction operation.
///
/// - If `axes` is `None` or an empty slice, returns all axes `0..rank`.
/// - Otherwise validates each axis against the rank and removes duplicates.
///
/// # Returns
/// A sorted `Vec<usize>` of unique axes, or `IndexOutOfBounds` if an axis
/// is out of range for `shape`.
pub(crate) fn process_reduction_axes(
    shape: &[usize],
    axes: Option<&[usize]>,
) -> Result<Vec<usize>, RevgradError> {
    let rank = shape.len();
    let mut processed_axes: Vec<usize> = match axes {
        None => return Ok((0..rank).collect()),
        Some(ax) if ax.is_empty() => return Ok((0..rank).collect()),
        Some(ax) => ax.to_vec(),
    };
    if let Some(&axis) = processed_axes.iter().find(|&&axis| axis >= rank) {
        return Err(RevgradError::IndexOutOfBounds {
            index: vec![axis],
            shape: shape.to_vec(),
        });
    }
    processed_axes.sort_unstable();
    processed_axes.dedup();
    Ok(processed_axes)
}

/// Calculates the output shape after a reduction operation.
///
/// With `keep_dims` the reduced dimensions stay with size 1; otherwise they
/// are removed, and reducing every axis yields the scalar shape `[]`.
pub(crate) fn calculate_reduction_output_shape(
    input_shape: &[usize],
    axes: &[usize],
    keep_dims: bool,
) -> Vec<usize> {
    input_shape
        .iter()
        .enumerate()
        .filter_map(|(i, &dim)| match (axes.contains(&i), keep_dims) {
            (false, _) => Some(dim),
            (true, true) => Some(1),
            (true, false) => None,
        })
        .collect()
}

/// The shape of the output gradient with the reduced axes reinstated as
/// size-1 dimensions, so it broadcasts back to `input_shape`.
pub(crate) fn calculate_grad_broadcast_shape(input_shape: &[usize], axes: &[usize]) -> Vec<usize> {
    calculate_reduction_output_shape(input_shape, axes, true)
}

/// Number of input elements folded into each output element.
pub(crate) fn reduction_count(input_shape: &[usize], axes: &[usize]) -> usize {
    axes.iter().map(|&axis| input_shape[axis]).product()
}

/// Sums `data` (row-major, of `shape`) over `axes`, returning the values of
/// the `keep_dims` result in row-major order. `axes` must be valid for `shape`.
pub(crate) fn sum_axes_kernel<T>(data: &[T], shape: &[usize], axes: &[usize]) -> Vec<T>
where
    T: Zero + Copy + AddAssign,
{
    let output_shape = calculate_reduction_output_shape(shape, axes, true);
    let output_strides = calculate_strides(&output_shape);
    let input_strides = calculate_strides(shape);
    let output_numel: usize = output_shape.iter().product();

    let mut output = vec![T::zero(); output_numel];
    for (i, &value) in data.iter().enumerate() {
        let coord = index_to_coord(i, &input_strides, shape);
        let output_index: usize = coord
            .iter()
            .enumerate()
            .map(|(dim, &c)| if axes.contains(&dim) { 0 } else { c * output_strides[dim] })
            .sum();
        output[output_index] += value;
    }
    output
}
