// src/tensor/traits.rs

use crate::tensor::Tensor;
use std::fmt::{self, Debug};
use std::sync::Arc;

impl Clone for Tensor {
    /// Shallow clone: the new handle shares data, `requires_grad`, `grad` and
    /// `grad_fn` with the original.
    fn clone(&self) -> Self {
        Tensor {
            data: Arc::clone(&self.data),
        }
    }
}

impl Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let td = self.read_data();
        let mut s = f.debug_struct("Tensor");
        s.field("shape", &td.shape);
        if td.numel() <= 16 {
            s.field("data", &td.buffer);
        } else {
            s.field("data", &format_args!("[... {} elements ...]", td.numel()));
        }
        s.field("requires_grad", &td.requires_grad);
        if let Some(node) = &td.grad_fn {
            s.field("grad_fn", &node.name());
        }
        s.finish()
    }
}

impl PartialEq for Tensor {
    /// Two tensors are equal when they have the same shape and values.
    /// Autograd metadata is ignored.
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.data, &other.data) {
            return true;
        }
        let self_guard = self.read_data();
        let other_guard = other.read_data();
        self_guard.shape == other_guard.shape && self_guard.buffer == other_guard.buffer
    }
}
