use crate::autograd::backward_op::BackwardRule;
use crate::autograd::graph::record_operation;
use crate::error::RevgradError;
use crate::tensor::Tensor;
use crate::tensor_data::TensorData;
use std::sync::Arc;

/// Gives the tensor a new shape with the same number of elements. The output
/// shares the input's buffer.
///
/// # Errors
/// `InvalidReshape` if the element counts differ.
pub fn reshape_op(tensor: &Tensor, new_shape: Vec<usize>) -> Result<Tensor, RevgradError> {
    let (buffer, input_shape) = {
        let guard = tensor.read_data();
        (Arc::clone(guard.buffer()), guard.shape.clone())
    };

    let original_numel: usize = input_shape.iter().product();
    let new_numel: usize = new_shape.iter().product();
    if original_numel != new_numel {
        return Err(RevgradError::InvalidReshape {
            from: input_shape,
            to: new_shape,
        });
    }

    let output = Tensor::from_tensor_data(TensorData::from_buffer(buffer, new_shape));
    Ok(record_operation(&[tensor], output, || BackwardRule::Reshape { input_shape }))
}

pub(crate) fn reshape_backward(
    input_shape: &[usize],
    grad_output: &Tensor,
) -> Result<Vec<Option<Tensor>>, RevgradError> {
    Ok(vec![Some(reshape_op(grad_output, input_shape.to_vec())?)])
}

#[cfg(test)]
#[path = "reshape_test.rs"]
mod tests;
