use crate::autograd::backward_op::BackwardRule;
use crate::autograd::grad_mode::is_grad_enabled;
use crate::autograd::node::{InputEdge, Node, NodeId};
use crate::error::RevgradError;
use crate::tensor::Tensor;
use log::trace;
use std::collections::HashMap;
use std::sync::Arc;

/// Whether an operation over `inputs` must be recorded.
pub(crate) fn is_tracking(inputs: &[&Tensor]) -> bool {
    is_grad_enabled() && inputs.iter().any(|t| t.requires_grad())
}

/// Links a freshly computed `output` into the computation graph.
///
/// When gradient mode is enabled and at least one input requires grad, a
/// [`Node`] is created with the rule returned by `make_rule`, and `output`
/// becomes a non-leaf with `requires_grad == true`. Otherwise `output` is
/// returned untouched and `make_rule` is never called. The numeric result is
/// never changed.
pub(crate) fn record_operation<F>(inputs: &[&Tensor], output: Tensor, make_rule: F) -> Tensor
where
    F: FnOnce() -> BackwardRule,
{
    if !is_tracking(inputs) {
        return output;
    }

    let edges: Vec<InputEdge> = inputs.iter().map(|t| InputEdge::for_input(t)).collect();
    let input_shapes: Vec<Vec<usize>> = inputs.iter().map(|t| t.shape()).collect();
    let node = Arc::new(Node::new(make_rule(), edges, input_shapes, output.shape()));
    trace!(
        "recorded {} (node {}) with {} inputs",
        node.name(),
        node.id(),
        node.num_inputs()
    );

    {
        let mut guard = output.write_data();
        guard.requires_grad = true;
        guard.grad_fn = Some(node);
    }
    output
}

/// Nodes registered by one backward pass, unregistered when dropped.
#[derive(Debug)]
pub(crate) struct GraphHold {
    nodes: Vec<Arc<Node>>,
    exclusive: bool,
}

impl GraphHold {
    fn new(exclusive: bool) -> Self {
        GraphHold {
            nodes: Vec::new(),
            exclusive,
        }
    }

    fn acquire(&mut self, node: &Arc<Node>) -> bool {
        if !node.try_hold(self.exclusive) {
            return false;
        }
        self.nodes.push(Arc::clone(node));
        true
    }
}

impl Drop for GraphHold {
    fn drop(&mut self) {
        for node in &self.nodes {
            node.release_hold(self.exclusive);
        }
    }
}

/// The part of a graph reachable from one root, with each node's number of
/// consumers inside that part.
#[derive(Debug)]
pub(crate) struct GraphTopology {
    pub(crate) nodes: HashMap<NodeId, Arc<Node>>,
    pub(crate) dependencies: HashMap<NodeId, usize>,
    /// Keeps other passes off these nodes until the traversal ends.
    pub(crate) hold: GraphHold,
}

impl GraphTopology {
    /// Walks every node reachable from `root` and registers the pass on each.
    ///
    /// A releasing pass (`retain_graph == false`) takes every node for itself;
    /// retaining passes only exclude releasing ones.
    ///
    /// # Errors
    /// `GraphAlreadyConsumed` if any reachable node was released by an
    /// earlier backward pass, or is held by a concurrent pass that conflicts
    /// with this one. The check happens before anything is evaluated, so a
    /// rejected pass never touches gradients.
    pub(crate) fn discover(root: &Arc<Node>, retain_graph: bool) -> Result<Self, RevgradError> {
        let mut hold = GraphHold::new(!retain_graph);
        let mut nodes: HashMap<NodeId, Arc<Node>> = HashMap::new();
        let mut dependencies: HashMap<NodeId, usize> = HashMap::new();
        let mut stack = vec![Arc::clone(root)];
        nodes.insert(root.id(), Arc::clone(root));
        dependencies.insert(root.id(), 0);

        while let Some(node) = stack.pop() {
            if !hold.acquire(&node) || node.is_released() {
                return Err(RevgradError::GraphAlreadyConsumed {
                    node: node.id(),
                    op: node.name(),
                });
            }
            for next in node.next_nodes() {
                *dependencies.entry(next.id()).or_insert(0) += 1;
                if !nodes.contains_key(&next.id()) {
                    nodes.insert(next.id(), Arc::clone(next));
                    stack.push(Arc::clone(next));
                }
            }
        }

        Ok(GraphTopology {
            nodes,
            dependencies,
            hold,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
