//! Compile-time schedule resolution.
//!
//! [`resolve`] validates an operator list against a [`SignalStore`] and
//! returns the single fixed execution order the stepper replays.

use tracing::debug;

use sigflow_store::SignalStore;

use crate::error::GraphError;
use crate::graph::DependencyGraph;
use crate::operator::Operator;

/// Resolved execution order for an operator list.
///
/// Indices refer to positions in the list passed to [`resolve`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    order: Vec<usize>,
    levels: Vec<Vec<usize>>,
    edge_count: usize,
}

impl Schedule {
    /// Operator indices in execution order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Antichains of mutually independent operators.
    ///
    /// Every operator in level `k` depends only on operators in levels
    /// below `k`. Within a level, indices are ascending.
    pub fn levels(&self) -> &[Vec<usize>] {
        &self.levels
    }

    /// Number of scheduled operators.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of dependency edges the order satisfies.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Position of operator `op` in the execution order.
    pub fn position(&self, op: usize) -> Option<usize> {
        self.order.iter().position(|&o| o == op)
    }
}

/// Validate `ops` and compute their execution order.
///
/// Ties between independent operators are broken by declaration order,
/// so the same operator list always yields the same schedule.
///
/// # Errors
///
/// [`GraphError::EmptyGraph`] for an empty list, any access violation
/// found by [`DependencyGraph::build`], or
/// [`GraphError::CyclicDependency`].
pub fn resolve(ops: &[Box<dyn Operator>], store: &SignalStore) -> Result<Schedule, GraphError> {
    if ops.is_empty() {
        return Err(GraphError::EmptyGraph);
    }
    let graph = DependencyGraph::build(ops, store)?;
    let order = graph.topological_order(|i| ops[i].name().to_string())?;

    let depth = graph.levels(&order);
    let level_count = depth.iter().copied().max().map_or(0, |d| d + 1);
    let mut levels = vec![Vec::new(); level_count];
    for (op, &d) in depth.iter().enumerate() {
        levels[d].push(op);
    }

    debug!(
        operators = ops.len(),
        edges = graph.edge_count(),
        levels = levels.len(),
        "schedule resolved"
    );

    Ok(Schedule {
        order,
        levels,
        edge_count: graph.edge_count(),
    })
}
