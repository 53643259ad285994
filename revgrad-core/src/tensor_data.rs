// src/tensor_data.rs
use std::sync::Arc;

use crate::autograd::node::Node;
use crate::error::RevgradError;
use crate::tensor::Tensor;

/// Internal storage and metadata for a Tensor.
///
/// This struct holds the data buffer, the shape, and the autograd-related
/// information. It is wrapped in `Arc<RwLock<TensorData>>` by the `Tensor`
/// struct to allow shared ownership and interior mutability.
#[derive(Debug)]
pub struct TensorData {
    /// Dense row-major values. Buffers are never mutated once built, so the
    /// `Arc` can be shared freely between a tensor, its detached copies and the
    /// values captured by backward rules.
    pub(crate) buffer: Arc<Vec<f64>>,
    /// The shape (dimensions) of the tensor. `[]` denotes a 0-d scalar.
    pub(crate) shape: Vec<usize>,

    // --- Autograd Metadata ---
    /// If true, operations involving this tensor are tracked in the computation graph.
    pub(crate) requires_grad: bool,
    /// Accumulated gradient, same shape as this tensor. Populated by the backward pass.
    pub(crate) grad: Option<Tensor>,
    /// The operation node that produced this tensor. Leaf tensors have `grad_fn = None`.
    pub(crate) grad_fn: Option<Arc<Node>>,
}

impl TensorData {
    /// Creates a new leaf `TensorData` from row-major data.
    ///
    /// # Errors
    /// Returns `RevgradError::TensorCreationError` if the length of `data_vec`
    /// does not match the number of elements of `shape`.
    pub fn new(data_vec: Vec<f64>, shape: Vec<usize>) -> Result<Self, RevgradError> {
        let numel: usize = shape.iter().product();
        let data_len = data_vec.len();
        if data_len != numel {
            return Err(RevgradError::TensorCreationError { data_len, shape });
        }
        Ok(Self::from_buffer(Arc::new(data_vec), shape))
    }

    /// Wraps an existing buffer. Used for detached copies and reshapes, which
    /// share storage instead of copying it.
    pub(crate) fn from_buffer(buffer: Arc<Vec<f64>>, shape: Vec<usize>) -> Self {
        TensorData {
            buffer,
            shape,
            requires_grad: false,
            grad: None,
            grad_fn: None,
        }
    }

    /// Provides immutable access to the underlying shared buffer.
    pub fn buffer(&self) -> &Arc<Vec<f64>> {
        &self.buffer
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_leaf(&self) -> bool {
        self.grad_fn.is_none()
    }
}
