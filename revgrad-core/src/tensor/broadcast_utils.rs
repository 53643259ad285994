use crate::error::RevgradError;
use crate::ops::reduction::utils::sum_axes_kernel;
use crate::tensor::utils::{
    broadcast_shapes, calculate_strides, coord_to_index_broadcasted, index_to_coord,
};
use crate::tensor::Tensor;

impl Tensor {
    /// Reduces the tensor (a gradient) to `target_shape` by summing along the
    /// dimensions that broadcasting expanded.
    ///
    /// Leading dimensions absent from `target_shape` are summed away, as are
    /// dimensions where the target has size 1 and the gradient does not.
    /// The result is an untracked tensor.
    ///
    /// # Errors
    /// `ShapeMismatch` if `target_shape` could not have been broadcast to the
    /// current shape.
    pub fn reduce_to_shape(&self, target_shape: &[usize]) -> Result<Tensor, RevgradError> {
        let current_shape = self.shape();
        if current_shape == target_shape {
            return Ok(self.clone());
        }
        let mismatch = || RevgradError::ShapeMismatch {
            expected: target_shape.to_vec(),
            actual: current_shape.clone(),
            operation: "reduce_to_shape".to_string(),
        };

        let current_rank = current_shape.len();
        let target_rank = target_shape.len();
        if current_rank < target_rank {
            return Err(mismatch());
        }

        let rank_diff = current_rank - target_rank;
        let mut axes_to_reduce: Vec<usize> = (0..rank_diff).collect();
        for (i, &target_dim) in target_shape.iter().enumerate() {
            let current_dim = current_shape[rank_diff + i];
            if current_dim != target_dim {
                if target_dim == 1 {
                    axes_to_reduce.push(rank_diff + i);
                } else {
                    return Err(mismatch());
                }
            }
        }

        let reduced = sum_axes_kernel(self.buffer().as_slice(), &current_shape, &axes_to_reduce);
        Tensor::new(reduced, target_shape.to_vec())
    }

    /// Broadcasts the tensor's values to `target_shape`, materialising the
    /// repeated elements. The counterpart of [`Tensor::reduce_to_shape`], used by
    /// reduction backward rules. The result is an untracked tensor.
    pub fn expand_to_shape(&self, target_shape: &[usize]) -> Result<Tensor, RevgradError> {
        let current_shape = self.shape();
        if current_shape == target_shape {
            return Ok(self.clone());
        }
        if broadcast_shapes(&current_shape, target_shape)? != target_shape {
            return Err(RevgradError::BroadcastError {
                shape1: current_shape,
                shape2: target_shape.to_vec(),
            });
        }
        let expanded = expand_kernel(&self.buffer(), &current_shape, target_shape);
        Tensor::new(expanded, target_shape.to_vec())
    }
}

/// Materialises `source` (of `source_shape`) broadcast to `target_shape`.
/// Shapes must already be broadcast-compatible.
pub(crate) fn expand_kernel(source: &[f64], source_shape: &[usize], target_shape: &[usize]) -> Vec<f64> {
    let target_numel: usize = target_shape.iter().product();
    let target_strides = calculate_strides(target_shape);
    let source_strides = calculate_strides(source_shape);
    (0..target_numel)
        .map(|i| {
            let coord = index_to_coord(i, &target_strides, target_shape);
            source[coord_to_index_broadcasted(&coord, source_shape, &source_strides)]
        })
        .collect()
}
