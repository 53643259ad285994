//! The classic introductory example: for `Q = 3a³ - b²`, the gradients are
//! `dQ/da = 9a²` and `dQ/db = -2b`.
//!
//! Run with `RUST_LOG=debug cargo run --example tutorial_q` to see the
//! engine's traversal log.

use revgrad_core::{RevgradError, Tensor};

fn main() -> Result<(), RevgradError> {
    env_logger::init();

    let a = Tensor::new(vec![2.0, 3.0], vec![2])?;
    let b = Tensor::new(vec![6.0, 4.0], vec![2])?;
    a.set_requires_grad(true)?;
    b.set_requires_grad(true)?;

    let q = a.pow_scalar(3.0)?.mul_scalar(3.0)?.sub(&b.pow_scalar(2.0)?)?;
    println!("Q = {:?}", q);

    // Q is a vector, so the seed dQ/dQ must be given explicitly.
    let external_grad = Tensor::new(vec![1.0, 1.0], vec![2])?;
    q.backward(Some(&external_grad))?;

    let a_grad = a.grad().map(|g| g.to_vec()).unwrap_or_default();
    let b_grad = b.grad().map(|g| g.to_vec()).unwrap_or_default();
    println!("dQ/da = {:?} (expected 9a² = [36.0, 81.0])", a_grad);
    println!("dQ/db = {:?} (expected -2b = [-12.0, -8.0])", b_grad);
    Ok(())
}
