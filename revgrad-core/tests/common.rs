use revgrad_core::Tensor;

/// Installs `env_logger` once per test binary; run with `RUST_LOG=trace` to
/// see the recorded nodes and traversals.
#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub fn create_test_tensor(data: Vec<f64>, shape: Vec<usize>) -> Tensor {
    Tensor::new(data, shape).expect("Test tensor creation failed")
}

#[allow(dead_code)]
pub fn create_leaf(data: Vec<f64>, shape: Vec<usize>) -> Tensor {
    let t = create_test_tensor(data, shape);
    t.set_requires_grad(true).expect("fresh tensors are leaves");
    t
}
