//! Reverse-mode automatic differentiation over dense `f64` tensors.
//!
//! Operations on tensors that require grad are recorded into a dynamic
//! computation graph; [`Tensor::backward`] walks it in reverse and
//! accumulates gradients into the leaves.
//!
//! ```rust,ignore
//! use revgrad_core::Tensor;
//!
//! let a = Tensor::new(vec![2.0, 3.0], vec![2])?;
//! a.set_requires_grad(true)?;
//! let q = a.pow_scalar(3.0)?.mul_scalar(3.0)?;
//! q.backward(Some(&Tensor::new(vec![1.0, 1.0], vec![2])?))?;
//! assert_eq!(a.grad().unwrap().to_vec(), vec![36.0, 81.0]);
//! ```

pub mod autograd;
pub mod error;
pub mod ops;
pub mod tensor;
pub mod tensor_data;
pub mod utils;

pub use autograd::{
    no_grad, BackwardOptions, CancellationToken, EnableGradGuard, GradModeGuard, NoGradGuard,
};
pub use error::RevgradError;
pub use tensor::Tensor;
// Re-export traits required by public functions/structs
pub use num_traits;
