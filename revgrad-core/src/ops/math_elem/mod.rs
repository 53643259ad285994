//! Element-wise mathematical functions.

pub mod exp;
pub mod ln;
pub mod sqrt;

pub use exp::exp_op;
pub use ln::ln_op;
pub use sqrt::sqrt_op;
