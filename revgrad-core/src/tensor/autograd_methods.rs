use crate::autograd::engine::{self, BackwardOptions};
use crate::autograd::node::Node;
use crate::error::RevgradError;
use crate::tensor::{self, Tensor};
use crate::tensor_data::TensorData;
use log::warn;
use std::sync::Arc;

/// Elementwise sum of two gradients of identical shape, as a fresh untracked
/// tensor.
pub(crate) fn add_gradients(existing: &Tensor, incoming: &Tensor) -> Result<Tensor, RevgradError> {
    let (lhs, shape) = {
        let guard = existing.read_data();
        (Arc::clone(&guard.buffer), guard.shape.clone())
    };
    let (rhs, incoming_shape) = {
        let guard = incoming.read_data();
        (Arc::clone(&guard.buffer), guard.shape.clone())
    };
    if shape != incoming_shape {
        return Err(RevgradError::ShapeMismatch {
            expected: shape,
            actual: incoming_shape,
            operation: "gradient accumulation".to_string(),
        });
    }
    let summed: Vec<f64> = lhs.iter().zip(rhs.iter()).map(|(a, b)| a + b).collect();
    Ok(Tensor::from_tensor_data(TensorData::from_buffer(
        Arc::new(summed),
        shape,
    )))
}

impl Tensor {
    /// Checks if this tensor requires gradient computation.
    pub fn requires_grad(&self) -> bool {
        self.read_data().requires_grad
    }

    /// Sets the `requires_grad` flag of a leaf tensor.
    ///
    /// # Errors
    /// `NonLeafRequiresGrad` if the tensor was produced by a tracked
    /// operation; its flag is derived from its inputs.
    pub fn set_requires_grad(&self, requires_grad: bool) -> Result<(), RevgradError> {
        let mut guard = self.write_data();
        if !guard.is_leaf() {
            return Err(RevgradError::NonLeafRequiresGrad);
        }
        guard.requires_grad = requires_grad;
        Ok(())
    }

    /// Returns `true` if the tensor was not produced by a tracked operation.
    pub fn is_leaf(&self) -> bool {
        self.read_data().is_leaf()
    }

    /// Returns a handle to the accumulated gradient, if any.
    pub fn grad(&self) -> Option<Tensor> {
        self.read_data().grad.clone()
    }

    /// Returns the node that produced this tensor.
    pub fn grad_fn(&self) -> Option<Arc<Node>> {
        self.read_data().grad_fn.clone()
    }

    /// Name of the producing operation's backward rule, e.g. `"AddBackward"`.
    pub fn grad_fn_name(&self) -> Option<&'static str> {
        self.read_data().grad_fn.as_ref().map(|node| node.name())
    }

    /// Resets the gradient to absent.
    pub fn clear_grad(&self) {
        self.write_data().grad = None;
    }

    /// Replaces an existing gradient with zeros of the same shape. Does nothing
    /// when no gradient is present.
    pub fn zero_grad(&self) -> Result<(), RevgradError> {
        let mut guard = self.write_data();
        if guard.grad.is_some() {
            guard.grad = Some(tensor::zeros(&guard.shape)?);
        }
        Ok(())
    }

    /// Returns a new leaf sharing this tensor's values, with no producer and
    /// `requires_grad == false`.
    pub fn detach(&self) -> Tensor {
        let guard = self.read_data();
        Tensor::from_tensor_data(TensorData::from_buffer(
            Arc::clone(&guard.buffer),
            guard.shape.clone(),
        ))
    }

    /// Asks the backward pass to also store the gradient flowing through this
    /// non-leaf in its `grad` slot. Leaves always receive their gradient, so
    /// the call is a no-op for them.
    pub fn retain_grad(&self) {
        match self.grad_fn() {
            Some(node) => node.retain_output(Arc::downgrade(&self.data)),
            None if !self.requires_grad() => {
                warn!("retain_grad() on a tensor that does not require grad has no effect");
            }
            None => {}
        }
    }

    /// Adds `grad_to_add` into this tensor's `grad` slot.
    ///
    /// The write lock is held across the addition so concurrent accumulations
    /// from the parallel executor are never lost.
    pub(crate) fn acc_grad(&self, grad_to_add: &Tensor) -> Result<(), RevgradError> {
        let incoming_shape = grad_to_add.shape();
        let mut guard = self.write_data();
        if incoming_shape != guard.shape {
            return Err(RevgradError::ShapeMismatch {
                expected: guard.shape.clone(),
                actual: incoming_shape,
                operation: "acc_grad".to_string(),
            });
        }
        let summed = match guard.grad.as_ref() {
            Some(existing) => add_gradients(existing, grad_to_add)?,
            None => grad_to_add.detach(),
        };
        guard.grad = Some(summed);
        Ok(())
    }

    /// Performs the backward pass starting from this tensor.
    ///
    /// Computes the gradient of this tensor with respect to every leaf of its
    /// graph that requires grad and adds it into their `grad` slots. The graph
    /// is released afterwards; use [`Tensor::backward_with_options`] with
    /// `retain_graph` to traverse it again.
    ///
    /// # Arguments
    /// * `gradient`: the seed gradient, same shape as `self`. May be `None`
    ///   only when `self` has exactly one element; it then defaults to ones.
    ///
    /// # Errors
    /// See [`crate::autograd::backward`].
    pub fn backward(&self, gradient: Option<&Tensor>) -> Result<(), RevgradError> {
        engine::backward(self, gradient, &BackwardOptions::default())
    }

    /// Like [`Tensor::backward`], with explicit [`BackwardOptions`].
    pub fn backward_with_options(
        &self,
        gradient: Option<&Tensor>,
        options: &BackwardOptions,
    ) -> Result<(), RevgradError> {
        engine::backward(self, gradient, options)
    }
}

#[cfg(test)]
#[path = "autograd_methods_test.rs"]
mod tests;
