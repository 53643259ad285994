use crate::autograd::backward_op::{grad_if, BackwardRule};
use crate::autograd::graph::record_operation;
use crate::error::RevgradError;
use crate::tensor::Tensor;

/// Performs matrix multiplication C = A @ B.
/// Currently supports only 2D tensors (matrices).
/// A: [M, K], B: [K, N] -> C: [M, N]
///
/// # Errors
/// `ShapeMismatch` if either operand is not 2-D or the inner dimensions differ.
pub fn matmul_op(a: &Tensor, b: &Tensor) -> Result<Tensor, RevgradError> {
    let output = matmul_kernel(a, b)?;
    Ok(record_operation(&[a, b], output, || BackwardRule::Matmul {
        lhs: a.detach(),
        rhs: b.detach(),
    }))
}

/// `dA = dC @ Bᵀ`, `dB = Aᵀ @ dC`.
pub(crate) fn matmul_backward(
    lhs: &Tensor,
    rhs: &Tensor,
    grad_output: &Tensor,
    needs_input_grad: &[bool],
) -> Result<Vec<Option<Tensor>>, RevgradError> {
    Ok(vec![
        grad_if(needs_input_grad, 0, || matmul_kernel(grad_output, &transpose_2d(rhs)?))?,
        grad_if(needs_input_grad, 1, || matmul_kernel(&transpose_2d(lhs)?, grad_output))?,
    ])
}

fn matmul_kernel(a: &Tensor, b: &Tensor) -> Result<Tensor, RevgradError> {
    let (a_data, a_shape) = {
        let guard = a.read_data();
        (guard.buffer().clone(), guard.shape.clone())
    };
    let (b_data, b_shape) = {
        let guard = b.read_data();
        (guard.buffer().clone(), guard.shape.clone())
    };

    if a_shape.len() != 2 || b_shape.len() != 2 || a_shape[1] != b_shape[0] {
        return Err(RevgradError::ShapeMismatch {
            expected: a_shape,
            actual: b_shape,
            operation: "matmul ([m, k] @ [k, n])".to_string(),
        });
    }

    let (m, k, n) = (a_shape[0], a_shape[1], b_shape[1]);
    let mut output_data = vec![0.0; m * n];
    for i in 0..m {
        for p in 0..k {
            let a_ip = a_data[i * k + p];
            let b_row = &b_data[p * n..(p + 1) * n];
            let out_row = &mut output_data[i * n..(i + 1) * n];
            for (out, &b_pj) in out_row.iter_mut().zip(b_row) {
                *out += a_ip * b_pj;
            }
        }
    }
    Tensor::new(output_data, vec![m, n])
}

/// Materialised transpose of a matrix. Untracked.
fn transpose_2d(t: &Tensor) -> Result<Tensor, RevgradError> {
    let (data, shape) = {
        let guard = t.read_data();
        (guard.buffer().clone(), guard.shape.clone())
    };
    if shape.len() != 2 {
        return Err(RevgradError::ShapeMismatch {
            expected: vec![shape.iter().product(), 1],
            actual: shape,
            operation: "transpose_2d (2-D input)".to_string(),
        });
    }
    let (rows, cols) = (shape[0], shape[1]);
    let mut transposed = Vec::with_capacity(rows * cols);
    for j in 0..cols {
        for i in 0..rows {
            transposed.push(data[i * cols + j]);
        }
    }
    Tensor::new(transposed, vec![cols, rows])
}

#[cfg(test)]
#[path = "matmul_test.rs"]
mod tests;
