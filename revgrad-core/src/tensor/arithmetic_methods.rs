use crate::error::RevgradError;
use crate::ops::{activation, arithmetic, linalg, math_elem};
use crate::tensor::Tensor;

/// Element-wise and matrix operations as methods. Each one delegates to the
/// corresponding `ops` function and is recorded for autograd when tracked.
impl Tensor {
    /// Element-wise `self + other` with broadcasting.
    pub fn add(&self, other: &Tensor) -> Result<Tensor, RevgradError> {
        arithmetic::add_op(self, other)
    }

    /// Element-wise `self - other` with broadcasting.
    pub fn sub(&self, other: &Tensor) -> Result<Tensor, RevgradError> {
        arithmetic::sub_op(self, other)
    }

    /// Element-wise `self * other` with broadcasting.
    pub fn mul(&self, other: &Tensor) -> Result<Tensor, RevgradError> {
        arithmetic::mul_op(self, other)
    }

    /// Element-wise `self / other` with broadcasting.
    pub fn div(&self, other: &Tensor) -> Result<Tensor, RevgradError> {
        arithmetic::div_op(self, other)
    }

    pub fn neg(&self) -> Result<Tensor, RevgradError> {
        arithmetic::neg_op(self)
    }

    pub fn add_scalar(&self, scalar: f64) -> Result<Tensor, RevgradError> {
        arithmetic::add_scalar_op(self, scalar)
    }

    pub fn mul_scalar(&self, factor: f64) -> Result<Tensor, RevgradError> {
        arithmetic::mul_scalar_op(self, factor)
    }

    /// Raises every element to `exponent`.
    pub fn pow_scalar(&self, exponent: f64) -> Result<Tensor, RevgradError> {
        arithmetic::pow_scalar_op(self, exponent)
    }

    pub fn exp(&self) -> Result<Tensor, RevgradError> {
        math_elem::exp_op(self)
    }

    pub fn ln(&self) -> Result<Tensor, RevgradError> {
        math_elem::ln_op(self)
    }

    pub fn sqrt(&self) -> Result<Tensor, RevgradError> {
        math_elem::sqrt_op(self)
    }

    pub fn relu(&self) -> Result<Tensor, RevgradError> {
        activation::relu_op(self)
    }

    /// Matrix product of two 2-D tensors.
    pub fn matmul(&self, other: &Tensor) -> Result<Tensor, RevgradError> {
        linalg::matmul_op(self, other)
    }
}
