use crate::autograd::backward_op::{BackwardOp, BackwardRule};
use crate::error::RevgradError;
use crate::tensor::Tensor;
use crate::tensor_data::TensorData;
use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

/// Unique identifier for graph nodes.
pub type NodeId = u64;

/// Counter for generating unique node IDs.
static NODE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `Node::traversals` value while a releasing pass owns the node.
const CLAIMED: usize = usize::MAX;

fn new_node_id() -> NodeId {
    NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Where the gradient for one input of a [`Node`] goes.
pub(crate) enum InputEdge {
    /// A non-leaf input: its producer receives the gradient.
    Node(Arc<Node>),
    /// A leaf that requires grad: the gradient is added into its `grad` slot.
    Leaf(Tensor),
    /// An input that takes no gradient.
    Constant,
}

impl InputEdge {
    pub(crate) fn for_input(input: &Tensor) -> Self {
        let guard = input.read_data();
        match &guard.grad_fn {
            Some(node) => InputEdge::Node(Arc::clone(node)),
            None if guard.requires_grad => InputEdge::Leaf(input.clone()),
            None => InputEdge::Constant,
        }
    }

    /// A leaf is asked again at backward time: `set_requires_grad(false)`
    /// after the forward pass stops it from receiving gradients.
    pub(crate) fn needs_grad(&self) -> bool {
        match self {
            InputEdge::Node(_) => true,
            InputEdge::Leaf(leaf) => leaf.requires_grad(),
            InputEdge::Constant => false,
        }
    }
}

/// One recorded operation in the computation graph.
///
/// A node is owned by the tensor it produced (its `grad_fn`) and by every
/// downstream node that consumed that tensor. It holds its predecessors
/// strongly and its own output only weakly, so graphs never form reference
/// cycles and are reclaimed as soon as the last tensor handle is dropped.
pub struct Node {
    id: NodeId,
    name: &'static str,
    inputs: Vec<InputEdge>,
    input_shapes: Vec<Vec<usize>>,
    output_shape: Vec<usize>,
    /// `None` once the graph has been released by a backward pass.
    rule: Mutex<Option<BackwardRule>>,
    /// Set by `Tensor::retain_grad` on the output.
    retained_output: Mutex<Option<Weak<RwLock<TensorData>>>>,
    /// Number of retaining passes walking this node, or `CLAIMED`.
    traversals: AtomicUsize,
}

impl Node {
    pub(crate) fn new(
        rule: BackwardRule,
        inputs: Vec<InputEdge>,
        input_shapes: Vec<Vec<usize>>,
        output_shape: Vec<usize>,
    ) -> Self {
        Node {
            id: new_node_id(),
            name: rule.name(),
            inputs,
            input_shapes,
            output_shape,
            rule: Mutex::new(Some(rule)),
            retained_output: Mutex::new(None),
            traversals: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Name of the recorded operation, e.g. `"MulBackward"`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn output_shape(&self) -> &[usize] {
        &self.output_shape
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// True once a backward pass released this node's captured values.
    pub fn is_released(&self) -> bool {
        self.rule.lock().map_or(true, |rule| rule.is_none())
    }

    /// Registers a backward pass over this node. A releasing pass needs the
    /// node to itself; retaining passes may share it with each other.
    pub(crate) fn try_hold(&self, exclusive: bool) -> bool {
        if exclusive {
            return self
                .traversals
                .compare_exchange(0, CLAIMED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok();
        }
        self.traversals
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count != CLAIMED).then(|| count + 1)
            })
            .is_ok()
    }

    pub(crate) fn release_hold(&self, exclusive: bool) {
        if exclusive {
            self.traversals.store(0, Ordering::Release);
        } else {
            self.traversals.fetch_sub(1, Ordering::AcqRel);
        }
    }

    pub(crate) fn inputs(&self) -> &[InputEdge] {
        &self.inputs
    }

    pub(crate) fn input_shapes(&self) -> &[Vec<usize>] {
        &self.input_shapes
    }

    /// Producer nodes of this node's inputs, one entry per edge.
    pub(crate) fn next_nodes(&self) -> impl Iterator<Item = &Arc<Node>> {
        self.inputs.iter().filter_map(|edge| match edge {
            InputEdge::Node(node) => Some(node),
            _ => None,
        })
    }

    /// Evaluates the backward rule. Without `retain_graph` the rule is taken
    /// out of the node, so its captured values are freed when this returns.
    pub(crate) fn apply(
        &self,
        grad_output: &Tensor,
        needs_input_grad: &[bool],
        retain_graph: bool,
    ) -> Result<Vec<Option<Tensor>>, RevgradError> {
        let mut slot = self
            .rule
            .lock()
            .map_err(|_| RevgradError::LockPoisoned(format!("rule of node {}", self.id)))?;
        let consumed = || RevgradError::GraphAlreadyConsumed {
            node: self.id,
            op: self.name,
        };
        if retain_graph {
            slot.as_ref()
                .ok_or_else(consumed)?
                .backward(grad_output, needs_input_grad)
        } else {
            let rule = slot.take().ok_or_else(consumed)?;
            drop(slot);
            rule.backward(grad_output, needs_input_grad)
        }
    }

    pub(crate) fn retain_output(&self, output: Weak<RwLock<TensorData>>) {
        if let Ok(mut slot) = self.retained_output.lock() {
            *slot = Some(output);
        }
    }

    /// The output tensor, if `retain_grad` was requested and it is still alive.
    pub(crate) fn retained_output(&self) -> Option<Tensor> {
        let slot = self.retained_output.lock().ok()?;
        slot.as_ref()
            .and_then(Weak::upgrade)
            .map(|data| Tensor { data })
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("num_inputs", &self.inputs.len())
            .field("output_shape", &self.output_shape)
            .field("released", &self.is_released())
            .finish()
    }
}

impl Drop for Node {
    // Unlinks predecessor chains iteratively; the default recursive drop
    // overflows the stack on very deep graphs.
    fn drop(&mut self) {
        let mut stack: Vec<Arc<Node>> = Vec::new();
        collect_node_edges(&mut self.inputs, &mut stack);
        while let Some(node) = stack.pop() {
            if let Ok(mut owned) = Arc::try_unwrap(node) {
                collect_node_edges(&mut owned.inputs, &mut stack);
            }
        }
    }
}

fn collect_node_edges(inputs: &mut Vec<InputEdge>, stack: &mut Vec<Arc<Node>>) {
    for edge in inputs.drain(..) {
        if let InputEdge::Node(node) = edge {
            stack.push(node);
        }
    }
}
