use super::*;
use crate::autograd::grad_mode::NoGradGuard;
use crate::utils::testing::{create_test_tensor, create_test_tensor_with_grad};

#[test]
fn test_untracked_when_no_input_requires_grad() {
    let x = create_test_tensor(vec![1.0, 2.0], vec![2]);
    let y = create_test_tensor(vec![3.0, 4.0], vec![2]);
    let out = x.add(&y).unwrap();
    assert!(!out.requires_grad());
    assert!(out.is_leaf());
}

#[test]
fn test_tracked_when_any_input_requires_grad() {
    let x = create_test_tensor(vec![1.0, 2.0], vec![2]);
    let z = create_test_tensor_with_grad(vec![3.0, 4.0], vec![2]);
    let out = x.add(&z).unwrap();
    assert!(out.requires_grad());
    assert!(!out.is_leaf());
    assert_eq!(out.grad_fn_name(), Some("AddBackward"));
}

#[test]
fn test_rule_factory_skipped_when_untracked() {
    let x = create_test_tensor(vec![1.0], vec![1]);
    let out = record_operation(&[&x], x.detach(), || panic!("factory must not run"));
    assert!(out.is_leaf());
}

#[test]
fn test_no_grad_suppresses_recording() {
    let z = create_test_tensor_with_grad(vec![3.0, 4.0], vec![2]);
    let tracked = z.mul(&z).unwrap();
    let untracked = {
        let _guard = NoGradGuard::new();
        z.mul(&z).unwrap()
    };
    assert!(!untracked.requires_grad());
    assert!(untracked.is_leaf());
    assert_eq!(tracked.to_vec(), untracked.to_vec());
}

#[test]
fn test_edges_classify_inputs() {
    let leaf = create_test_tensor_with_grad(vec![1.0], vec![1]);
    let constant = create_test_tensor(vec![2.0], vec![1]);
    let inner = leaf.mul_scalar(3.0).unwrap();
    assert!(matches!(InputEdge::for_input(&leaf), InputEdge::Leaf(_)));
    assert!(matches!(InputEdge::for_input(&constant), InputEdge::Constant));
    assert!(matches!(InputEdge::for_input(&inner), InputEdge::Node(_)));
}

#[test]
fn test_topology_counts_diamond() {
    // y = a * a + a, with a itself a non-leaf
    let x = create_test_tensor_with_grad(vec![2.0], vec![1]);
    let a = x.mul_scalar(2.0).unwrap();
    let sq = a.mul(&a).unwrap();
    let y = sq.add(&a).unwrap();

    let root = y.grad_fn().unwrap();
    let topology = GraphTopology::discover(&root, false).unwrap();
    assert_eq!(topology.len(), 3);

    let a_id = a.grad_fn().unwrap().id();
    let sq_id = sq.grad_fn().unwrap().id();
    assert_eq!(topology.dependencies[&root.id()], 0);
    assert_eq!(topology.dependencies[&sq_id], 1);
    // consumed twice by the multiply and once by the add
    assert_eq!(topology.dependencies[&a_id], 3);
}

#[test]
fn test_discover_rejects_released_graph() {
    let x = create_test_tensor_with_grad(vec![2.0], vec![1]);
    let y = x.mul_scalar(2.0).unwrap();
    y.backward(None).unwrap();
    let root = y.grad_fn().unwrap();
    assert!(matches!(
        GraphTopology::discover(&root, false),
        Err(RevgradError::GraphAlreadyConsumed { .. })
    ));
}

#[test]
fn test_releasing_pass_excludes_concurrent_passes() {
    let x = create_test_tensor_with_grad(vec![2.0], vec![1]);
    let y = x.mul_scalar(2.0).unwrap().add_scalar(1.0).unwrap();
    let root = y.grad_fn().unwrap();

    let claimed = GraphTopology::discover(&root, false).unwrap();
    assert!(matches!(
        GraphTopology::discover(&root, false),
        Err(RevgradError::GraphAlreadyConsumed { .. })
    ));
    assert!(matches!(
        GraphTopology::discover(&root, true),
        Err(RevgradError::GraphAlreadyConsumed { .. })
    ));
    // A rejected pass leaves gradients alone.
    assert!(x.grad().is_none());

    drop(claimed);
    assert!(GraphTopology::discover(&root, false).is_ok());
}

#[test]
fn test_retaining_passes_share_but_block_release() {
    let x = create_test_tensor_with_grad(vec![2.0], vec![1]);
    let y = x.mul_scalar(2.0).unwrap();
    let root = y.grad_fn().unwrap();

    let first = GraphTopology::discover(&root, true).unwrap();
    let second = GraphTopology::discover(&root, true).unwrap();
    assert!(GraphTopology::discover(&root, false).is_err());

    drop(first);
    assert!(GraphTopology::discover(&root, false).is_err());
    drop(second);
    assert!(GraphTopology::discover(&root, false).is_ok());
}

#[test]
fn test_failed_discovery_releases_nodes_it_held() {
    // `shared` is walked by both graphs; `y` is held by a releasing pass.
    let x = create_test_tensor_with_grad(vec![2.0], vec![1]);
    let shared = x.mul_scalar(2.0).unwrap();
    let y = shared.add_scalar(1.0).unwrap();
    let z = shared.mul_scalar(3.0).unwrap();
    let shared_root = shared.grad_fn().unwrap();

    let held = GraphTopology::discover(&shared_root, false).unwrap();
    assert!(GraphTopology::discover(&y.grad_fn().unwrap(), false).is_err());
    drop(held);

    // The failed pass had claimed `y`'s node before reaching `shared`.
    assert!(GraphTopology::discover(&y.grad_fn().unwrap(), false).is_ok());
    assert!(GraphTopology::discover(&z.grad_fn().unwrap(), false).is_ok());
}
