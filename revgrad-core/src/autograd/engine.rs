//! The backward engine.
//!
//! Starting from a root tensor, the engine discovers the reachable part of
//! the graph, counts for every node how many consumers feed it, and evaluates
//! a node only after all of them have contributed. Contributions to the same
//! node or leaf are summed, never overwritten.

use crate::autograd::grad_mode::NoGradGuard;
use crate::autograd::graph::{GraphHold, GraphTopology};
use crate::autograd::node::{InputEdge, Node, NodeId};
use crate::error::RevgradError;
use crate::tensor::{self, Tensor};
use log::{debug, trace};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared flag used to cancel a running backward pass.
///
/// The engine checks it each time it dequeues a node; a cancelled traversal
/// returns [`RevgradError::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Configuration of one backward pass.
///
/// The default releases the graph after use and runs on the calling thread.
#[derive(Clone, Debug, Default)]
pub struct BackwardOptions {
    /// Keep the captured forward values so the graph can be traversed again.
    pub retain_graph: bool,
    /// Evaluate independent nodes concurrently on a rayon pool.
    pub parallel: bool,
    /// Size of a dedicated pool for the parallel executor. `None` uses the
    /// global rayon pool.
    pub num_threads: Option<usize>,
    pub cancel_token: Option<CancellationToken>,
}

impl BackwardOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retain_graph(mut self, retain_graph: bool) -> Self {
        self.retain_graph = retain_graph;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    fn check_cancelled(&self) -> Result<(), RevgradError> {
        match &self.cancel_token {
            Some(token) if token.is_cancelled() => Err(RevgradError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Computes the gradient of `root` with respect to every leaf of its graph
/// that requires grad, adding the results into their `grad` slots.
///
/// # Arguments
/// * `gradient`: the seed, \( \frac{dL}{d\text{root}} \). May be omitted only
///   when `root` has exactly one element, in which case it defaults to ones.
///
/// # Errors
/// * `NotDifferentiable` if `root` does not require grad, or is a leaf with
///   more than one element.
/// * `MissingSeed` if `gradient` is `None` and `root` has more than one element.
/// * `ShapeMismatch` if the seed's shape differs from `root`'s, or a backward
///   rule produced a gradient that cannot be reduced to its input's shape.
/// * `GraphAlreadyConsumed` if part of the graph was released by an earlier
///   pass, or a concurrent pass over a shared subgraph conflicts with this one
///   (a releasing pass excludes every other pass over the same nodes).
/// * `Cancelled` if the options' token was cancelled.
pub fn backward(
    root: &Tensor,
    gradient: Option<&Tensor>,
    options: &BackwardOptions,
) -> Result<(), RevgradError> {
    let seed = initial_gradient(root, gradient)?;

    let root_node = match root.grad_fn() {
        Some(node) => node,
        None => {
            // Single-element leaf: d(root)/d(root) is the seed itself.
            return root.acc_grad(&seed);
        }
    };

    let topology = GraphTopology::discover(&root_node, options.retain_graph)?;
    debug!(
        "backward from {} (node {}): {} nodes, parallel={}, retain_graph={}",
        root_node.name(),
        root_node.id(),
        topology.len(),
        options.parallel,
        options.retain_graph
    );

    if options.parallel {
        run_parallel(topology, &root_node, seed, options)
    } else {
        run_sequential(topology, &root_node, seed, options)
    }
}

/// Validates `root` and resolves the seed gradient.
fn initial_gradient(root: &Tensor, gradient: Option<&Tensor>) -> Result<Tensor, RevgradError> {
    let (requires_grad, is_leaf, shape) = {
        let guard = root.read_data();
        (guard.requires_grad, guard.is_leaf(), guard.shape.clone())
    };
    let numel: usize = shape.iter().product();

    if !requires_grad {
        return Err(RevgradError::NotDifferentiable {
            reason: "tensor does not require grad and has no grad_fn".to_string(),
        });
    }
    if is_leaf && numel != 1 {
        return Err(RevgradError::NotDifferentiable {
            reason: format!("leaf tensor of shape {:?} has no graph to traverse", shape),
        });
    }

    match gradient {
        Some(g) => {
            let seed_shape = g.shape();
            if seed_shape != shape {
                return Err(RevgradError::ShapeMismatch {
                    expected: shape,
                    actual: seed_shape,
                    operation: "backward seed".to_string(),
                });
            }
            Ok(g.detach())
        }
        None if numel == 1 => tensor::ones(&shape),
        None => Err(RevgradError::MissingSeed { shape }),
    }
}

/// Runs `node`'s backward rule on its summed incoming gradient and returns the
/// contribution for each input that takes one, already reduced to that
/// input's shape.
fn evaluate_node(
    node: &Node,
    grad_output: &Tensor,
    options: &BackwardOptions,
) -> Result<Vec<(usize, Tensor)>, RevgradError> {
    trace!("evaluating {} (node {})", node.name(), node.id());
    if let Some(output) = node.retained_output() {
        output.acc_grad(grad_output)?;
    }

    let needs: Vec<bool> = node.inputs().iter().map(InputEdge::needs_grad).collect();
    let grads = {
        let _guard = NoGradGuard::new();
        node.apply(grad_output, &needs, options.retain_graph)?
    };
    if grads.len() != needs.len() {
        return Err(RevgradError::InternalError(format!(
            "{} returned {} gradients for {} inputs",
            node.name(),
            grads.len(),
            needs.len()
        )));
    }

    let mut contributions = Vec::with_capacity(grads.len());
    for (index, (grad, input_shape)) in grads.into_iter().zip(node.input_shapes()).enumerate() {
        let grad = match grad {
            Some(grad) if needs[index] => grad,
            _ => continue,
        };
        let reduced = grad
            .reduce_to_shape(input_shape)
            .map_err(|_| RevgradError::ShapeMismatch {
                expected: input_shape.clone(),
                actual: grad.shape(),
                operation: format!("{} input {}", node.name(), index),
            })?;
        contributions.push((index, reduced));
    }
    Ok(contributions)
}

/// Adds `incoming` to a pending gradient sum.
fn add_to_pending(slot: &mut Option<Tensor>, incoming: Tensor) -> Result<(), RevgradError> {
    let summed = match slot.as_ref() {
        Some(existing) => tensor::autograd_methods::add_gradients(existing, &incoming)?,
        None => incoming,
    };
    *slot = Some(summed);
    Ok(())
}

fn zeros_for(node: &Node) -> Result<Tensor, RevgradError> {
    tensor::zeros(node.output_shape())
}

// --- Sequential executor ---

fn run_sequential(
    topology: GraphTopology,
    root: &Arc<Node>,
    seed: Tensor,
    options: &BackwardOptions,
) -> Result<(), RevgradError> {
    let mut remaining = topology.dependencies;
    let mut pending: HashMap<NodeId, Option<Tensor>> = HashMap::new();
    pending.insert(root.id(), Some(seed));

    if remaining.get(&root.id()).copied() != Some(0) {
        return Err(RevgradError::CycleDetected);
    }

    let mut ready: VecDeque<Arc<Node>> = VecDeque::from([Arc::clone(root)]);
    let mut processed: HashSet<NodeId> = HashSet::with_capacity(topology.nodes.len());

    while let Some(node) = ready.pop_front() {
        options.check_cancelled()?;
        if !processed.insert(node.id()) {
            return Err(RevgradError::CycleDetected);
        }

        let grad_output = match pending.remove(&node.id()).flatten() {
            Some(grad) => grad,
            None => zeros_for(&node)?,
        };

        for (index, grad) in evaluate_node(&node, &grad_output, options)? {
            match &node.inputs()[index] {
                InputEdge::Leaf(leaf) => leaf.acc_grad(&grad)?,
                InputEdge::Node(next) => {
                    add_to_pending(pending.entry(next.id()).or_insert(None), grad)?
                }
                InputEdge::Constant => {}
            }
        }

        for next in node.next_nodes() {
            let count = remaining
                .get_mut(&next.id())
                .ok_or(RevgradError::CycleDetected)?;
            if *count == 0 {
                return Err(RevgradError::CycleDetected);
            }
            *count -= 1;
            if *count == 0 {
                ready.push_back(Arc::clone(next));
            }
        }
    }

    if processed.len() != topology.nodes.len() {
        return Err(RevgradError::CycleDetected);
    }
    Ok(())
}

// --- Parallel executor ---

/// Per-node state shared between workers.
struct NodeTask {
    node: Arc<Node>,
    /// Consumers that have not contributed yet.
    remaining: AtomicUsize,
    /// Sum of the contributions received so far.
    pending: Mutex<Option<Tensor>>,
}

struct ParallelGraphTask<'a> {
    tasks: HashMap<NodeId, NodeTask>,
    _hold: GraphHold,
    options: &'a BackwardOptions,
    processed: AtomicUsize,
    failed: AtomicBool,
    error: Mutex<Option<RevgradError>>,
}

fn poisoned(what: &str) -> RevgradError {
    RevgradError::LockPoisoned(what.to_string())
}

impl<'a> ParallelGraphTask<'a> {
    fn new(topology: GraphTopology, options: &'a BackwardOptions) -> Self {
        let GraphTopology {
            nodes,
            dependencies,
            hold,
        } = topology;
        let tasks = nodes
            .into_iter()
            .map(|(id, node)| {
                let remaining = dependencies.get(&id).copied().unwrap_or(0);
                let task = NodeTask {
                    node,
                    remaining: AtomicUsize::new(remaining),
                    pending: Mutex::new(None),
                };
                (id, task)
            })
            .collect();
        ParallelGraphTask {
            tasks,
            _hold: hold,
            options,
            processed: AtomicUsize::new(0),
            failed: AtomicBool::new(false),
            error: Mutex::new(None),
        }
    }

    fn task(&self, id: NodeId) -> Result<&NodeTask, RevgradError> {
        self.tasks.get(&id).ok_or(RevgradError::CycleDetected)
    }

    fn record_error(&self, err: RevgradError) {
        // First error wins.
        if !self.failed.swap(true, Ordering::AcqRel) {
            if let Ok(mut slot) = self.error.lock() {
                *slot = Some(err);
            }
        }
    }

    fn spawn_node<'s>(&'s self, scope: &rayon::Scope<'s>, id: NodeId) {
        scope.spawn(move |scope| {
            if let Err(err) = self.process(scope, id) {
                self.record_error(err);
            }
        });
    }

    fn process<'s>(&'s self, scope: &rayon::Scope<'s>, id: NodeId) -> Result<(), RevgradError> {
        if self.failed.load(Ordering::Acquire) {
            return Ok(());
        }
        self.options.check_cancelled()?;

        let task = self.task(id)?;
        self.processed.fetch_add(1, Ordering::Relaxed);
        let incoming = task
            .pending
            .lock()
            .map_err(|_| poisoned("pending gradient"))?
            .take();
        let grad_output = match incoming {
            Some(grad) => grad,
            None => zeros_for(&task.node)?,
        };

        for (index, grad) in evaluate_node(&task.node, &grad_output, self.options)? {
            match &task.node.inputs()[index] {
                InputEdge::Leaf(leaf) => leaf.acc_grad(&grad)?,
                InputEdge::Node(next) => {
                    let next_task = self.task(next.id())?;
                    let mut slot = next_task
                        .pending
                        .lock()
                        .map_err(|_| poisoned("pending gradient"))?;
                    add_to_pending(&mut slot, grad)?;
                }
                InputEdge::Constant => {}
            }
        }

        // The contribution is published under the consumer's lock above; the
        // AcqRel decrement orders it before whichever worker runs that node.
        for next in task.node.next_nodes() {
            let next_task = self.task(next.id())?;
            let previous = next_task.remaining.fetch_sub(1, Ordering::AcqRel);
            if previous == 0 {
                return Err(RevgradError::CycleDetected);
            }
            if previous == 1 {
                self.spawn_node(scope, next.id());
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<(), RevgradError> {
        let error = self.error.lock().map_err(|_| poisoned("error slot"))?.take();
        if let Some(err) = error {
            return Err(err);
        }
        if self.processed.load(Ordering::Acquire) != self.tasks.len() {
            return Err(RevgradError::CycleDetected);
        }
        Ok(())
    }
}

fn run_parallel(
    topology: GraphTopology,
    root: &Arc<Node>,
    seed: Tensor,
    options: &BackwardOptions,
) -> Result<(), RevgradError> {
    let task = ParallelGraphTask::new(topology, options);
    {
        let root_task = task.task(root.id())?;
        if root_task.remaining.load(Ordering::Acquire) != 0 {
            return Err(RevgradError::CycleDetected);
        }
        *root_task
            .pending
            .lock()
            .map_err(|_| poisoned("pending gradient"))? = Some(seed);
    }

    let root_id = root.id();
    let run = || rayon::scope(|scope| task.spawn_node(scope, root_id));
    match options.num_threads {
        Some(num_threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build()
                .map_err(|e| RevgradError::InternalError(format!("thread pool: {}", e)))?;
            pool.install(run);
        }
        None => run(),
    }

    task.finish()
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
