// src/tensor/create.rs

use crate::error::RevgradError;
use crate::tensor::Tensor;
use crate::tensor_data::TensorData;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use std::sync::Arc;

/// Creates a new tensor filled with zeros with the specified shape.
pub fn zeros(shape: &[usize]) -> Result<Tensor, RevgradError> {
    full(shape, 0.0)
}

/// Creates a new tensor filled with ones with the specified shape.
pub fn ones(shape: &[usize]) -> Result<Tensor, RevgradError> {
    full(shape, 1.0)
}

/// Creates a new tensor filled with `value` with the specified shape.
pub fn full(shape: &[usize], value: f64) -> Result<Tensor, RevgradError> {
    let numel = shape.iter().product();
    Tensor::new(vec![value; numel], shape.to_vec())
}

/// Creates a zero tensor with the same shape as `tensor`.
pub fn zeros_like(tensor: &Tensor) -> Result<Tensor, RevgradError> {
    zeros(&tensor.shape())
}

/// Creates a tensor of ones with the same shape as `tensor`.
pub fn ones_like(tensor: &Tensor) -> Result<Tensor, RevgradError> {
    ones(&tensor.shape())
}

impl Tensor {
    /// Creates a 0-dimensional tensor holding `value`.
    pub fn scalar(value: f64) -> Tensor {
        // A single value always matches the empty shape.
        Tensor::from_tensor_data(TensorData::from_buffer(Arc::new(vec![value]), vec![]))
    }

    /// Creates a tensor with values drawn uniformly from `[0, 1)`.
    pub fn rand(shape: &[usize]) -> Result<Tensor, RevgradError> {
        Self::rand_with_rng(shape, &mut rand::thread_rng())
    }

    /// Like [`Tensor::rand`] but draws from the given generator, for reproducible tests.
    pub fn rand_with_rng<R: Rng + ?Sized>(
        shape: &[usize],
        rng: &mut R,
    ) -> Result<Tensor, RevgradError> {
        let numel: usize = shape.iter().product();
        let data: Vec<f64> = (0..numel).map(|_| rng.gen::<f64>()).collect();
        Tensor::new(data, shape.to_vec())
    }

    /// Creates a tensor with values drawn from the standard normal distribution.
    pub fn randn(shape: &[usize]) -> Result<Tensor, RevgradError> {
        Self::randn_with_rng(shape, &mut rand::thread_rng())
    }

    /// Like [`Tensor::randn`] but draws from the given generator.
    pub fn randn_with_rng<R: Rng + ?Sized>(
        shape: &[usize],
        rng: &mut R,
    ) -> Result<Tensor, RevgradError> {
        let numel: usize = shape.iter().product();
        let data: Vec<f64> = (0..numel).map(|_| StandardNormal.sample(rng)).collect();
        Tensor::new(data, shape.to_vec())
    }
}

#[cfg(test)]
#[path = "create_test.rs"]
mod tests;
