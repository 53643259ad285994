//! Reductions over one or more axes.

pub mod mean;
pub mod sum;
pub(crate) mod utils;

pub use mean::mean_op;
pub use sum::sum_op;
