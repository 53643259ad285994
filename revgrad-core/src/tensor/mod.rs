// src/tensor/mod.rs

use crate::error::RevgradError;
use crate::tensor_data::TensorData;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

mod arithmetic_methods;
pub(crate) mod autograd_methods;
pub mod broadcast_utils;
pub mod create;
mod reduction_methods;
mod traits;
pub mod utils;
mod view_methods;

pub use create::{full, ones, ones_like, zeros, zeros_like};

/// Represents a multi-dimensional array of `f64` values that can take part in
/// automatic differentiation.
///
/// `Tensor` uses `Arc<RwLock<TensorData>>` internally to allow for:
/// 1.  **Shared Ownership:** clones are cheap handles to the same tensor, which
///     is how a leaf handed to several operations still receives every
///     gradient contribution in its single `grad` slot.
/// 2.  **Interior Mutability:** `requires_grad` and `grad` can be updated
///     through a shared reference; the backward pass relies on this.
pub struct Tensor {
    /// Arc for shared ownership, RwLock for interior mutability of TensorData.
    pub(crate) data: Arc<RwLock<TensorData>>,
}

impl Tensor {
    /// Creates a new leaf tensor from row-major data and a shape.
    ///
    /// Gradient tracking is disabled by default; see [`Tensor::set_requires_grad`].
    pub fn new(data_vec: Vec<f64>, shape: Vec<usize>) -> Result<Self, RevgradError> {
        let tensor_data = TensorData::new(data_vec, shape)?;
        Ok(Tensor::from_tensor_data(tensor_data))
    }

    pub(crate) fn from_tensor_data(tensor_data: TensorData) -> Self {
        Tensor {
            data: Arc::new(RwLock::new(tensor_data)),
        }
    }

    /// Returns a clone of the tensor's shape.
    pub fn shape(&self) -> Vec<usize> {
        self.read_data().shape.clone()
    }

    /// Returns the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.read_data().shape.len()
    }

    /// Returns the number of elements in the tensor.
    pub fn numel(&self) -> usize {
        self.read_data().numel()
    }

    /// Copies the values out in row-major order.
    pub fn to_vec(&self) -> Vec<f64> {
        self.read_data().buffer.as_ref().clone()
    }

    /// Returns the shared buffer without copying.
    pub(crate) fn buffer(&self) -> Arc<Vec<f64>> {
        Arc::clone(&self.read_data().buffer)
    }

    /// Returns the single value of a one-element tensor.
    pub fn item(&self) -> Result<f64, RevgradError> {
        let guard = self.read_data();
        if guard.numel() != 1 {
            return Err(RevgradError::NotAScalar {
                shape: guard.shape.clone(),
            });
        }
        Ok(guard.buffer[0])
    }

    /// Acquires a read lock on the tensor's data.
    ///
    /// Panics if the RwLock is poisoned.
    pub fn read_data(&self) -> RwLockReadGuard<'_, TensorData> {
        self.data.read().expect("RwLock poisoned")
    }

    /// Acquires a write lock on the tensor's data.
    ///
    /// Panics if the RwLock is poisoned.
    pub fn write_data(&self) -> RwLockWriteGuard<'_, TensorData> {
        self.data.write().expect("RwLock poisoned")
    }
}
