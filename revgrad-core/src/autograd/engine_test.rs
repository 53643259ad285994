use super::*;
use crate::utils::testing::{check_tensor_near, create_test_tensor, create_test_tensor_with_grad};
use crate::autograd::backward_op::BackwardRule;
use approx::assert_relative_eq;

/// Q = 3a^3 - b^2
fn tutorial_q(a: &Tensor, b: &Tensor) -> Tensor {
    let a3 = a.pow_scalar(3.0).unwrap().mul_scalar(3.0).unwrap();
    let b2 = b.pow_scalar(2.0).unwrap();
    a3.sub(&b2).unwrap()
}

#[test]
fn test_tutorial_gradients() {
    let a = create_test_tensor_with_grad(vec![2.0, 3.0], vec![2]);
    let b = create_test_tensor_with_grad(vec![6.0, 4.0], vec![2]);
    let q = tutorial_q(&a, &b);
    let seed = create_test_tensor(vec![1.0, 1.0], vec![2]);
    q.backward(Some(&seed)).unwrap();

    // dQ/da = 9a^2, dQ/db = -2b
    check_tensor_near(&a.grad().unwrap(), &[2], &[36.0, 81.0], 1e-12);
    check_tensor_near(&b.grad().unwrap(), &[2], &[-12.0, -8.0], 1e-12);
}

#[test]
fn test_seed_scales_gradients() {
    let a = create_test_tensor_with_grad(vec![2.0, 3.0], vec![2]);
    let b = create_test_tensor_with_grad(vec![6.0, 4.0], vec![2]);
    let q = tutorial_q(&a, &b);
    let seed = create_test_tensor(vec![0.5, -2.0], vec![2]);
    q.backward(Some(&seed)).unwrap();
    check_tensor_near(&a.grad().unwrap(), &[2], &[18.0, -162.0], 1e-12);
    check_tensor_near(&b.grad().unwrap(), &[2], &[-6.0, 16.0], 1e-12);
}

#[test]
fn test_scalar_default_seed_matches_explicit_one() {
    let x1 = create_test_tensor_with_grad(vec![1.5, -2.0], vec![2]);
    let x2 = create_test_tensor_with_grad(vec![1.5, -2.0], vec![2]);

    x1.pow_scalar(2.0).unwrap().sum().unwrap().backward(None).unwrap();
    let explicit = Tensor::scalar(1.0);
    x2.pow_scalar(2.0)
        .unwrap()
        .sum()
        .unwrap()
        .backward(Some(&explicit))
        .unwrap();

    assert_eq!(x1.grad().unwrap(), x2.grad().unwrap());
    check_tensor_near(&x1.grad().unwrap(), &[2], &[3.0, -4.0], 1e-12);
}

#[test]
fn test_missing_seed_for_vector_root() {
    let x = create_test_tensor_with_grad(vec![1.0, 2.0], vec![2]);
    let y = x.mul_scalar(2.0).unwrap();
    assert_eq!(
        y.backward(None),
        Err(RevgradError::MissingSeed { shape: vec![2] })
    );
    assert!(x.grad().is_none());
}

#[test]
fn test_seed_shape_mismatch() {
    let x = create_test_tensor_with_grad(vec![1.0, 2.0], vec![2]);
    let y = x.mul_scalar(2.0).unwrap();
    let seed = create_test_tensor(vec![1.0, 1.0, 1.0], vec![3]);
    assert!(matches!(
        y.backward(Some(&seed)),
        Err(RevgradError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_not_differentiable_roots() {
    let plain = create_test_tensor(vec![1.0], vec![1]);
    assert!(matches!(
        plain.backward(None),
        Err(RevgradError::NotDifferentiable { .. })
    ));

    let leaf_vector = create_test_tensor_with_grad(vec![1.0, 2.0], vec![2]);
    let seed = create_test_tensor(vec![1.0, 1.0], vec![2]);
    assert!(matches!(
        leaf_vector.backward(Some(&seed)),
        Err(RevgradError::NotDifferentiable { .. })
    ));
}

#[test]
fn test_scalar_leaf_root_receives_seed() {
    let x = create_test_tensor_with_grad(vec![4.0], vec![1]);
    x.backward(None).unwrap();
    x.backward(None).unwrap();
    check_tensor_near(&x.grad().unwrap(), &[1], &[2.0], 0.0);
}

#[test]
fn test_accumulates_across_backward_calls() {
    let x = create_test_tensor_with_grad(vec![3.0], vec![1]);
    x.pow_scalar(2.0).unwrap().backward(None).unwrap(); // 2x = 6
    x.mul_scalar(5.0).unwrap().backward(None).unwrap(); // 5
    assert_relative_eq!(x.grad().unwrap().item().unwrap(), 11.0);

    x.clear_grad();
    x.mul_scalar(5.0).unwrap().backward(None).unwrap();
    assert_relative_eq!(x.grad().unwrap().item().unwrap(), 5.0);
}

#[test]
fn test_diamond_sums_all_paths() {
    // y = a*a + a with a = 2x  =>  dy/dx = (2a + 1) * 2
    let x = create_test_tensor_with_grad(vec![1.0, -3.0], vec![2]);
    let a = x.mul_scalar(2.0).unwrap();
    let y = a.mul(&a).unwrap().add(&a).unwrap().sum().unwrap();
    y.backward(None).unwrap();
    check_tensor_near(&x.grad().unwrap(), &[2], &[10.0, -22.0], 1e-12);
}

#[test]
fn test_constant_inputs_get_no_grad() {
    let w = create_test_tensor_with_grad(vec![1.0, 2.0], vec![2]);
    let c = create_test_tensor(vec![3.0, 4.0], vec![2]);
    w.mul(&c).unwrap().sum().unwrap().backward(None).unwrap();
    check_tensor_near(&w.grad().unwrap(), &[2], &[3.0, 4.0], 0.0);
    assert!(c.grad().is_none());
}

#[test]
fn test_broadcast_gradient_is_reduced() {
    let m = create_test_tensor_with_grad(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
    let bias = create_test_tensor_with_grad(vec![10.0, 20.0, 30.0], vec![3]);
    let out = m.add(&bias).unwrap();
    let seed = create_test_tensor(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
    out.backward(Some(&seed)).unwrap();
    check_tensor_near(&m.grad().unwrap(), &[2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 0.0);
    check_tensor_near(&bias.grad().unwrap(), &[3], &[5.0, 7.0, 9.0], 0.0);
}

#[test]
fn test_second_backward_without_retain_fails() {
    let x = create_test_tensor_with_grad(vec![2.0], vec![1]);
    let y = x.pow_scalar(3.0).unwrap();
    y.backward(None).unwrap();
    assert!(matches!(
        y.backward(None),
        Err(RevgradError::GraphAlreadyConsumed { .. })
    ));
    assert_relative_eq!(x.grad().unwrap().item().unwrap(), 12.0);
}

#[test]
fn test_retain_graph_allows_repeated_backward() {
    let x = create_test_tensor_with_grad(vec![2.0], vec![1]);
    let y = x.pow_scalar(3.0).unwrap();
    let retain = BackwardOptions::new().retain_graph(true);
    y.backward_with_options(None, &retain).unwrap();
    y.backward_with_options(None, &retain).unwrap();
    // The last pass may release the graph.
    y.backward(None).unwrap();
    assert_relative_eq!(x.grad().unwrap().item().unwrap(), 36.0);
    assert!(y.backward(None).is_err());
}

#[test]
fn test_partially_consumed_graph_is_rejected() {
    let x = create_test_tensor_with_grad(vec![2.0], vec![1]);
    let shared = x.pow_scalar(2.0).unwrap();
    let first = shared.mul_scalar(3.0).unwrap();
    let second = shared.mul_scalar(5.0).unwrap();

    first.backward(None).unwrap();
    let before = x.grad().unwrap().item().unwrap();

    let retain = BackwardOptions::new().retain_graph(true);
    assert!(matches!(
        second.backward_with_options(None, &retain),
        Err(RevgradError::GraphAlreadyConsumed { .. })
    ));
    assert_eq!(x.grad().unwrap().item().unwrap(), before);
    // The consumer that was never traversed still holds its rule.
    assert!(!second.grad_fn().unwrap().is_released());
}

#[test]
fn test_graph_independence_across_passes() {
    let a = create_test_tensor_with_grad(vec![1.0, 2.0], vec![2]);
    let b = create_test_tensor_with_grad(vec![3.0, 4.0], vec![2]);

    a.mul(&b).unwrap().sum().unwrap().backward(None).unwrap();
    check_tensor_near(&a.grad().unwrap(), &[2], &[3.0, 4.0], 0.0);
    check_tensor_near(&b.grad().unwrap(), &[2], &[1.0, 2.0], 0.0);

    a.clear_grad();
    b.clear_grad();
    a.add(&b).unwrap().pow_scalar(2.0).unwrap().sum().unwrap().backward(None).unwrap();
    // d/da (a+b)^2 = 2(a+b)
    check_tensor_near(&a.grad().unwrap(), &[2], &[8.0, 12.0], 1e-12);
    check_tensor_near(&b.grad().unwrap(), &[2], &[8.0, 12.0], 1e-12);
}

#[test]
fn test_retain_grad_on_intermediate() {
    let x = create_test_tensor_with_grad(vec![1.0, 2.0], vec![2]);
    let h = x.mul_scalar(3.0).unwrap();
    h.retain_grad();
    let y = h.pow_scalar(2.0).unwrap().sum().unwrap();
    y.retain_grad();
    y.backward(None).unwrap();
    // dy/dh = 2h
    check_tensor_near(&h.grad().unwrap(), &[2], &[6.0, 12.0], 1e-12);
    check_tensor_near(&x.grad().unwrap(), &[2], &[18.0, 36.0], 1e-12);
    assert_relative_eq!(y.grad().unwrap().item().unwrap(), 1.0);
}

#[test]
fn test_intermediate_grad_not_kept_by_default() {
    let x = create_test_tensor_with_grad(vec![1.0], vec![1]);
    let h = x.mul_scalar(3.0).unwrap();
    h.mul_scalar(2.0).unwrap().backward(None).unwrap();
    assert!(h.grad().is_none());
}

fn wide_graph(leaves: &[Tensor]) -> Tensor {
    // Many independent branches joined at the end.
    let mut total: Option<Tensor> = None;
    for (i, leaf) in leaves.iter().enumerate() {
        let branch = leaf
            .pow_scalar(2.0)
            .unwrap()
            .mul_scalar(i as f64 + 1.0)
            .unwrap()
            .exp()
            .unwrap()
            .ln()
            .unwrap()
            .mul(leaf)
            .unwrap()
            .sum()
            .unwrap();
        total = Some(match total {
            Some(t) => t.add(&branch).unwrap(),
            None => branch,
        });
    }
    total.unwrap()
}

#[test]
fn test_parallel_matches_sequential() {
    let make = || -> Vec<Tensor> {
        (0..16)
            .map(|i| create_test_tensor_with_grad(vec![0.1 * i as f64, -0.2, 0.3], vec![3]))
            .collect()
    };
    let seq_leaves = make();
    let par_leaves = make();

    wide_graph(&seq_leaves).backward(None).unwrap();
    let options = BackwardOptions::new().parallel(true).num_threads(4);
    wide_graph(&par_leaves)
        .backward_with_options(None, &options)
        .unwrap();

    for (s, p) in seq_leaves.iter().zip(&par_leaves) {
        let s = s.grad().unwrap().to_vec();
        let p = p.grad().unwrap().to_vec();
        for (a, b) in s.iter().zip(&p) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_parallel_shared_leaf_accumulates_every_path() {
    let x = create_test_tensor_with_grad(vec![1.0, 2.0], vec![2]);
    let branches: Vec<Tensor> = (0..32).map(|i| x.mul_scalar(i as f64).unwrap()).collect();
    let mut total = branches[0].clone();
    for b in &branches[1..] {
        total = total.add(b).unwrap();
    }
    let options = BackwardOptions::new().parallel(true);
    total
        .sum()
        .unwrap()
        .backward_with_options(None, &options)
        .unwrap();
    // sum of 0..32 = 496
    check_tensor_near(&x.grad().unwrap(), &[2], &[496.0, 496.0], 1e-9);
}

#[test]
fn test_cancelled_traversal() {
    let x = create_test_tensor_with_grad(vec![1.0], vec![1]);
    let y = x.mul_scalar(2.0).unwrap().mul_scalar(3.0).unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let options = BackwardOptions::new().cancel_token(token.clone());
    assert_eq!(
        y.backward_with_options(None, &options),
        Err(RevgradError::Cancelled)
    );
    let options = BackwardOptions::new().parallel(true).cancel_token(token);
    assert_eq!(
        y.backward_with_options(None, &options),
        Err(RevgradError::Cancelled)
    );
    assert!(x.grad().is_none());
}

#[test]
fn test_deep_chain() {
    let x = create_test_tensor_with_grad(vec![1.0], vec![1]);
    let mut y = x.clone();
    for _ in 0..20_000 {
        y = y.add_scalar(1.0).unwrap();
    }
    y.backward(None).unwrap();
    assert_relative_eq!(x.grad().unwrap().item().unwrap(), 1.0);
    drop(y);
}

#[test]
fn test_leaf_that_stops_requiring_grad_receives_nothing() {
    for parallel in [false, true] {
        let x = create_test_tensor_with_grad(vec![2.0], vec![1]);
        let w = create_test_tensor_with_grad(vec![5.0], vec![1]);
        let y = x.mul(&w).unwrap();
        x.set_requires_grad(false).unwrap();

        let options = BackwardOptions::new().parallel(parallel);
        y.backward_with_options(None, &options).unwrap();
        assert!(x.grad().is_none());
        check_tensor_near(&w.grad().unwrap(), &[1], &[2.0], 1e-12);
    }
}

/// An add node whose first input was recorded as `[3]` while the output is
/// `[2]`: the gradient cannot be reduced back to that shape.
fn irreducible_add(x: &Tensor) -> Tensor {
    let node = Node::new(
        BackwardRule::Add,
        vec![InputEdge::for_input(x), InputEdge::Constant],
        vec![vec![3], vec![2]],
        vec![2],
    );
    let out = create_test_tensor(vec![3.0, 4.0], vec![2]);
    {
        let mut guard = out.write_data();
        guard.requires_grad = true;
        guard.grad_fn = Some(Arc::new(node));
    }
    out
}

#[test]
fn test_irreducible_rule_output_is_shape_mismatch() {
    for parallel in [false, true] {
        let x = create_test_tensor_with_grad(vec![1.0, 2.0], vec![2]);
        let out = irreducible_add(&x);
        let seed = create_test_tensor(vec![1.0, 1.0], vec![2]);
        let options = BackwardOptions::new().parallel(parallel);

        match out.backward_with_options(Some(&seed), &options) {
            Err(RevgradError::ShapeMismatch {
                expected,
                actual,
                operation,
            }) => {
                assert_eq!(expected, vec![3]);
                assert_eq!(actual, vec![2]);
                assert_eq!(operation, "AddBackward input 0");
            }
            other => panic!("parallel={}: unexpected result {:?}", parallel, other),
        }
        assert!(x.grad().is_none());
    }
}

/// Runs an executor over `y = 2x + 1` after overwriting the dependency counts
/// of the root and of the inner node (`None` drops the inner entry).
fn run_with_counts(
    parallel: bool,
    root_count: usize,
    inner_count: Option<usize>,
) -> Result<(), RevgradError> {
    let x = create_test_tensor_with_grad(vec![1.0], vec![1]);
    let inner = x.mul_scalar(2.0).unwrap();
    let y = inner.add_scalar(1.0).unwrap();
    let root = y.grad_fn().unwrap();
    let inner_id = inner.grad_fn().unwrap().id();

    let mut topology = GraphTopology::discover(&root, false).unwrap();
    topology.dependencies.insert(root.id(), root_count);
    match inner_count {
        Some(count) => {
            topology.dependencies.insert(inner_id, count);
        }
        None => {
            topology.dependencies.remove(&inner_id);
        }
    }

    let seed = create_test_tensor(vec![1.0], vec![1]);
    let options = BackwardOptions::new().parallel(parallel);
    if parallel {
        run_parallel(topology, &root, seed, &options)
    } else {
        run_sequential(topology, &root, seed, &options)
    }
}

#[test]
fn test_consistent_counts_run_to_completion() {
    for parallel in [false, true] {
        assert_eq!(run_with_counts(parallel, 0, Some(1)), Ok(()));
    }
}

#[test]
fn test_inconsistent_counts_are_cycle_detected() {
    let cases = [
        // root still waiting on a consumer
        (1, Some(1)),
        // inner node never becomes ready
        (0, Some(2)),
        // inner node reached more often than counted
        (0, Some(0)),
        // inner node missing from the topology
        (0, None),
    ];
    for parallel in [false, true] {
        for &(root_count, inner_count) in &cases {
            assert_eq!(
                run_with_counts(parallel, root_count, inner_count),
                Err(RevgradError::CycleDetected),
                "parallel={} root={} inner={:?}",
                parallel,
                root_count,
                inner_count
            );
        }
    }
}

#[test]
fn test_concurrent_release_is_rejected_before_any_gradient() {
    let x = create_test_tensor_with_grad(vec![2.0], vec![1]);
    let y = x.mul_scalar(3.0).unwrap();
    let root = y.grad_fn().unwrap();

    // Another releasing pass is still walking the graph.
    let in_flight = GraphTopology::discover(&root, false).unwrap();
    assert!(matches!(
        y.backward(None),
        Err(RevgradError::GraphAlreadyConsumed { .. })
    ));
    assert!(x.grad().is_none());

    drop(in_flight);
    y.backward(None).unwrap();
    check_tensor_near(&x.grad().unwrap(), &[1], &[3.0], 1e-12);
}
