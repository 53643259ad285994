//! Reverse-mode automatic differentiation.
//!
//! Operations on tensors that require grad record a [`Node`] holding their
//! [`BackwardRule`]. [`backward`] walks the recorded graph from a root in
//! dependency order and accumulates gradients into the leaves.

pub mod backward_op;
pub mod engine;
pub mod grad_check;
pub mod grad_mode;
pub mod graph;
pub mod node;

pub use backward_op::{BackwardOp, BackwardRule};
pub use engine::{backward, BackwardOptions, CancellationToken};
pub use grad_check::{check_grad, GradCheckError};
pub use grad_mode::{enable_grad, is_grad_enabled, no_grad, EnableGradGuard, GradModeGuard, NoGradGuard};
pub use node::{Node, NodeId};
