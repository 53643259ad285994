use crate::autograd::node::NodeId;
use thiserror::Error;

/// Custom error type for the revgrad engine.
#[derive(Error, Debug, PartialEq, Clone)] // PartialEq for easier testing
pub enum RevgradError {
    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("Cannot broadcast shapes: {shape1:?} and {shape2:?}")]
    BroadcastError {
        shape1: Vec<usize>,
        shape2: Vec<usize>,
    },

    #[error("Index out of bounds: index {index:?} for shape {shape:?}")]
    IndexOutOfBounds {
        index: Vec<usize>,
        shape: Vec<usize>,
    },

    #[error("Tensor creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreationError { data_len: usize, shape: Vec<usize> },

    #[error("Cannot reshape tensor of shape {from:?} into shape {to:?}")]
    InvalidReshape { from: Vec<usize>, to: Vec<usize> },

    #[error("Backward called on non-scalar tensor of shape {shape:?} without explicit gradient.")]
    MissingSeed { shape: Vec<usize> },

    #[error("Nothing to differentiate: {reason}")]
    NotDifferentiable { reason: String },

    #[error("Computation graph already consumed at node {node} ({op}); re-run the forward pass or retain the graph.")]
    GraphAlreadyConsumed { node: NodeId, op: &'static str },

    #[error("Cycle detected in the computation graph during backward pass.")]
    CycleDetected,

    #[error("requires_grad can only be changed on leaf tensors.")]
    NonLeafRequiresGrad,

    #[error("Expected a single-element tensor, got shape {shape:?}")]
    NotAScalar { shape: Vec<usize> },

    #[error("Backward pass cancelled.")]
    Cancelled,

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}
