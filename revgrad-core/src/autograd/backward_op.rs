use crate::error::RevgradError;
use crate::ops;
use crate::tensor::Tensor;
use std::fmt::Debug;

/// Defines the interface for the backward pass of a differentiable tensor operation.
///
/// Every tracked operation stores an implementation in the [`Node`](super::node::Node)
/// it records, and the backward engine invokes it to propagate gradients
/// according to the chain rule.
///
/// The trait requires `Debug + Send + Sync` because nodes are shared between
/// tensors and may be evaluated on worker threads by the parallel executor.
pub trait BackwardOp: Debug + Send + Sync {
    /// Short operation name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Computes \( \frac{dL}{d\text{Input}_i} \) for each input given
    /// \( \frac{dL}{d\text{Output}} \) (`grad_output`).
    ///
    /// # Arguments
    /// * `grad_output`: gradient flowing into the operation's output, with the
    ///   output's shape.
    /// * `needs_input_grad`: one flag per input; an implementation may return
    ///   `None` for inputs whose flag is false.
    ///
    /// # Returns
    /// One entry per input, in forward order. Entries may still carry the
    /// broadcast output shape; the engine reduces them to each input's shape.
    fn backward(
        &self,
        grad_output: &Tensor,
        needs_input_grad: &[bool],
    ) -> Result<Vec<Option<Tensor>>, RevgradError>;
}

/// The backward rule of every differentiable operation, holding exactly the
/// forward values the rule needs. Captured tensors are detached and share
/// their (immutable) buffers with the forward values.
#[derive(Debug)]
pub enum BackwardRule {
    Add,
    Sub,
    Mul { lhs: Tensor, rhs: Tensor },
    Div { lhs: Tensor, rhs: Tensor },
    Neg,
    AddScalar,
    MulScalar { factor: f64 },
    PowScalar { base: Tensor, exponent: f64 },
    Exp { output: Tensor },
    Ln { input: Tensor },
    Sqrt { output: Tensor },
    Relu { input: Tensor },
    Sum { input_shape: Vec<usize>, axes: Vec<usize>, keep_dims: bool },
    Mean { input_shape: Vec<usize>, axes: Vec<usize>, keep_dims: bool },
    Reshape { input_shape: Vec<usize> },
    Matmul { lhs: Tensor, rhs: Tensor },
}

impl BackwardOp for BackwardRule {
    fn name(&self) -> &'static str {
        match self {
            BackwardRule::Add => "AddBackward",
            BackwardRule::Sub => "SubBackward",
            BackwardRule::Mul { .. } => "MulBackward",
            BackwardRule::Div { .. } => "DivBackward",
            BackwardRule::Neg => "NegBackward",
            BackwardRule::AddScalar => "AddScalarBackward",
            BackwardRule::MulScalar { .. } => "MulScalarBackward",
            BackwardRule::PowScalar { .. } => "PowBackward",
            BackwardRule::Exp { .. } => "ExpBackward",
            BackwardRule::Ln { .. } => "LnBackward",
            BackwardRule::Sqrt { .. } => "SqrtBackward",
            BackwardRule::Relu { .. } => "ReluBackward",
            BackwardRule::Sum { .. } => "SumBackward",
            BackwardRule::Mean { .. } => "MeanBackward",
            BackwardRule::Reshape { .. } => "ReshapeBackward",
            BackwardRule::Matmul { .. } => "MatmulBackward",
        }
    }

    fn backward(
        &self,
        grad_output: &Tensor,
        needs_input_grad: &[bool],
    ) -> Result<Vec<Option<Tensor>>, RevgradError> {
        use ops::{activation, arithmetic, linalg, math_elem, reduction, view};

        let g = grad_output;
        let needs = needs_input_grad;
        match self {
            BackwardRule::Add => arithmetic::add::add_backward(g, needs),
            BackwardRule::Sub => arithmetic::sub::sub_backward(g, needs),
            BackwardRule::Mul { lhs, rhs } => arithmetic::mul::mul_backward(lhs, rhs, g, needs),
            BackwardRule::Div { lhs, rhs } => arithmetic::div::div_backward(lhs, rhs, g, needs),
            BackwardRule::Neg => arithmetic::neg::neg_backward(g),
            BackwardRule::AddScalar => arithmetic::scalar::add_scalar_backward(g),
            BackwardRule::MulScalar { factor } => {
                arithmetic::scalar::mul_scalar_backward(*factor, g)
            }
            BackwardRule::PowScalar { base, exponent } => {
                arithmetic::pow::pow_scalar_backward(base, *exponent, g)
            }
            BackwardRule::Exp { output } => math_elem::exp::exp_backward(output, g),
            BackwardRule::Ln { input } => math_elem::ln::ln_backward(input, g),
            BackwardRule::Sqrt { output } => math_elem::sqrt::sqrt_backward(output, g),
            BackwardRule::Relu { input } => activation::relu::relu_backward(input, g),
            BackwardRule::Sum {
                input_shape,
                axes,
                keep_dims,
            } => reduction::sum::sum_backward(input_shape, axes, *keep_dims, g),
            BackwardRule::Mean {
                input_shape,
                axes,
                keep_dims,
            } => reduction::mean::mean_backward(input_shape, axes, *keep_dims, g),
            BackwardRule::Reshape { input_shape } => view::reshape::reshape_backward(input_shape, g),
            BackwardRule::Matmul { lhs, rhs } => linalg::matmul::matmul_backward(lhs, rhs, g, needs),
        }
    }
}

/// Computes a gradient only when the corresponding input asked for one.
pub(crate) fn grad_if<F>(
    needs_input_grad: &[bool],
    index: usize,
    compute: F,
) -> Result<Option<Tensor>, RevgradError>
where
    F: FnOnce() -> Result<Tensor, RevgradError>,
{
    if needs_input_grad.get(index).copied().unwrap_or(false) {
        compute().map(Some)
    } else {
        Ok(None)
    }
}
