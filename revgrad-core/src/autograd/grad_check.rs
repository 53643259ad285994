use crate::autograd::grad_mode::NoGradGuard;
use crate::error::RevgradError;
use crate::tensor::Tensor;
use thiserror::Error;

/// Error type specifically for gradient checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Gradient check failed for input tensor at index {input_index}, element index {element_index}: Analytical grad {analytical_grad:?} != Numerical grad {numerical_grad:?}. Difference: {difference:?}")]
    GradientMismatch {
        input_index: usize,
        element_index: usize,
        analytical_grad: f64,
        numerical_grad: f64,
        difference: f64,
    },
    #[error("Forward function execution failed during gradient check: {0}")]
    ForwardPassError(RevgradError),
    #[error("Backward pass execution failed during gradient check: {0}")]
    BackwardPassError(RevgradError),
    #[error("Tensor error during intermediate calculation: {0}")]
    TensorError(RevgradError),
    #[error("Input tensor {input_index} requires grad but has no gradient after backward pass.")]
    MissingAnalyticalGrad { input_index: usize },
    #[error("Numerical gradient is NaN or infinite for input {input_index}, element {element_index}. Details: Loss+: {loss_plus:?}, Loss-: {loss_minus:?}")]
    NumericalGradNaNOrInfinite {
        input_index: usize,
        element_index: usize,
        loss_plus: f64,
        loss_minus: f64,
    },
    #[error("Analytical gradient is NaN or infinite for input {input_index}, element {element_index}. Value: {value:?}")]
    AnalyticalGradNaNOrInfinite {
        input_index: usize,
        element_index: usize,
        value: f64,
    },
    #[error("Gradient check input tensor must be a leaf node (no grad_fn). Input index: {input_index}")]
    InputNotLeaf { input_index: usize },
    #[error("Function did not propagate requires_grad correctly.")]
    RequiresGradPropagationError,
}

impl From<RevgradError> for GradCheckError {
    fn from(err: RevgradError) -> Self {
        GradCheckError::TensorError(err)
    }
}

/// Checks analytical gradients against numerical gradients using central
/// finite differences.
///
/// The scalar being differentiated is `sum(func(inputs) * output_grad)`, so
/// the analytical side is `func(inputs).backward(Some(output_grad))`.
/// Existing gradients of the inputs are cleared first.
///
/// An element fails when both the absolute difference and the difference
/// relative to the analytical value exceed `tolerance`.
pub fn check_grad<F>(
    func: F,
    inputs: &[Tensor],
    output_grad: &Tensor,
    epsilon: f64,
    tolerance: f64,
) -> Result<(), GradCheckError>
where
    F: Fn(&[Tensor]) -> Result<Tensor, RevgradError>,
{
    for (i, input) in inputs.iter().enumerate() {
        if input.requires_grad() && !input.is_leaf() {
            return Err(GradCheckError::InputNotLeaf { input_index: i });
        }
        if input.requires_grad() {
            input.clear_grad();
        }
    }

    let output = func(inputs).map_err(GradCheckError::ForwardPassError)?;
    let any_input_requires_grad = inputs.iter().any(|t| t.requires_grad());
    if any_input_requires_grad && !output.requires_grad() {
        return Err(GradCheckError::RequiresGradPropagationError);
    }
    if output.requires_grad() {
        output
            .backward(Some(output_grad))
            .map_err(GradCheckError::BackwardPassError)?;
    }
    drop(output);

    let analytical_grads: Vec<Option<Tensor>> = inputs.iter().map(|t| t.grad()).collect();

    // Perturbed evaluations are plain forward passes.
    let _no_grad = NoGradGuard::new();

    for (i, original_input) in inputs.iter().enumerate() {
        if !original_input.requires_grad() {
            continue;
        }
        let analytical_data = match analytical_grads[i].as_ref() {
            Some(grad) => grad.to_vec(),
            None => return Err(GradCheckError::MissingAnalyticalGrad { input_index: i }),
        };
        let original_data = original_input.to_vec();

        for elem_idx in 0..original_data.len() {
            let loss_at = |delta: f64| -> Result<f64, GradCheckError> {
                let mut perturbed_data = original_data.clone();
                perturbed_data[elem_idx] += delta;
                let mut perturbed_inputs = inputs.to_vec();
                perturbed_inputs[i] = Tensor::new(perturbed_data, original_input.shape())?;
                let out = func(&perturbed_inputs).map_err(GradCheckError::ForwardPassError)?;
                calculate_loss(&out, output_grad)
            };
            let loss_plus = loss_at(epsilon)?;
            let loss_minus = loss_at(-epsilon)?;
            let numerical_grad = (loss_plus - loss_minus) / (2.0 * epsilon);
            let analytical_grad = analytical_data[elem_idx];

            if !numerical_grad.is_finite() {
                return Err(GradCheckError::NumericalGradNaNOrInfinite {
                    input_index: i,
                    element_index: elem_idx,
                    loss_plus,
                    loss_minus,
                });
            }
            if !analytical_grad.is_finite() {
                return Err(GradCheckError::AnalyticalGradNaNOrInfinite {
                    input_index: i,
                    element_index: elem_idx,
                    value: analytical_grad,
                });
            }

            let difference = (analytical_grad - numerical_grad).abs();
            if difference > tolerance && difference / (analytical_grad.abs() + epsilon) > tolerance {
                return Err(GradCheckError::GradientMismatch {
                    input_index: i,
                    element_index: elem_idx,
                    analytical_grad,
                    numerical_grad,
                    difference,
                });
            }
        }
    }

    Ok(())
}

/// `sum(tensor * output_grad)`
fn calculate_loss(tensor: &Tensor, output_grad: &Tensor) -> Result<f64, GradCheckError> {
    if tensor.shape() != output_grad.shape() {
        return Err(GradCheckError::TensorError(RevgradError::ShapeMismatch {
            expected: tensor.shape(),
            actual: output_grad.shape(),
            operation: "calculate_loss (grad_check)".to_string(),
        }));
    }
    let values = tensor.buffer();
    let weights = output_grad.buffer();
    Ok(values.iter().zip(weights.iter()).map(|(v, w)| v * w).sum())
}

#[cfg(test)]
#[path = "grad_check_test.rs"]
mod tests;
