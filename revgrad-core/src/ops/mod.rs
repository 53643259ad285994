//! # Tensor Operations Module (`ops`)
//!
//! Operations are grouped by kind into submodules. Each one has an `xxx_op`
//! function that runs the forward kernel and records the operation through
//! [`record_operation`](crate::autograd::graph::record_operation), plus an
//! `xxx_backward` function that the matching
//! [`BackwardRule`](crate::autograd::BackwardRule) variant dispatches to.
//! The same functions are exposed as methods on [`Tensor`].
//!
//! Backward functions build their results with the forward ops themselves.
//! They run under a no-grad scope, so nothing they compute is recorded.
//!
//! ## Submodules:
//!
//! - [`arithmetic`]: element-wise arithmetic with broadcasting, scalar variants and `pow_scalar`.
//! - [`math_elem`]: element-wise `exp`, `ln`, `sqrt`.
//! - [`activation`]: `relu`.
//! - [`reduction`]: `sum` and `mean` over axes.
//! - [`view`]: `reshape`.
//! - [`linalg`]: 2-D `matmul`.

pub mod activation;
pub mod arithmetic;
pub mod linalg;
pub mod math_elem;
pub mod reduction;
pub mod view;

use crate::error::RevgradError;
use crate::tensor::utils::{broadcast_shapes, calculate_strides, coord_to_index_broadcasted, index_to_coord};
use crate::tensor::Tensor;

/// Applies `op` to every element of `a`. The result is untracked.
pub(crate) fn unary_kernel<F>(a: &Tensor, op: F) -> Result<Tensor, RevgradError>
where
    F: Fn(f64) -> f64,
{
    let (buffer, shape) = {
        let guard = a.read_data();
        (guard.buffer().clone(), guard.shape.clone())
    };
    let output_data: Vec<f64> = buffer.iter().map(|&v| op(v)).collect();
    Tensor::new(output_data, shape)
}

/// Applies `op` element-wise to `a` and `b`, broadcasting them to a common
/// shape. The result is untracked.
///
/// # Errors
/// `BroadcastError` if the shapes are incompatible.
pub(crate) fn binary_kernel<F>(a: &Tensor, b: &Tensor, op: F) -> Result<Tensor, RevgradError>
where
    F: Fn(f64, f64) -> f64,
{
    let (a_buffer, a_shape) = {
        let guard = a.read_data();
        (guard.buffer().clone(), guard.shape.clone())
    };
    let (b_buffer, b_shape) = {
        let guard = b.read_data();
        (guard.buffer().clone(), guard.shape.clone())
    };

    if a_shape == b_shape {
        let output_data: Vec<f64> = a_buffer
            .iter()
            .zip(b_buffer.iter())
            .map(|(&x, &y)| op(x, y))
            .collect();
        return Tensor::new(output_data, a_shape);
    }

    let output_shape = broadcast_shapes(&a_shape, &b_shape)?;
    let output_strides = calculate_strides(&output_shape);
    let a_strides = calculate_strides(&a_shape);
    let b_strides = calculate_strides(&b_shape);
    let numel: usize = output_shape.iter().product();

    let mut output_data = Vec::with_capacity(numel);
    for i in 0..numel {
        let coord = index_to_coord(i, &output_strides, &output_shape);
        let x = a_buffer[coord_to_index_broadcasted(&coord, &a_shape, &a_strides)];
        let y = b_buffer[coord_to_index_broadcasted(&coord, &b_shape, &b_strides)];
        output_data.push(op(x, y));
    }
    Tensor::new(output_data, output_shape)
}
