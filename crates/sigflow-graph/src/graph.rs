//! Operator dependency graph derived from declared signal accesses.
//!
//! Edges are computed per base buffer over overlapping element ranges, so
//! views participate in ordering exactly like the memory they alias.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::ops::Range;

use indexmap::{IndexMap, IndexSet};

use sigflow_core::{AccessKind, SignalId};
use sigflow_store::SignalStore;

use crate::error::GraphError;
use crate::operator::Operator;
use crate::opset::OpSet;

/// One declared access, resolved to its base buffer.
#[derive(Clone, Debug)]
struct Touch {
    op: usize,
    kind: AccessKind,
    signal: SignalId,
    range: Range<usize>,
}

impl Touch {
    fn overlaps(&self, other: &Touch) -> bool {
        !self.range.is_empty()
            && !other.range.is_empty()
            && self.range.start < other.range.end
            && other.range.start < self.range.end
    }
}

/// Position of an access kind within one step.
///
/// Sets run first, then increments, then reads of the final value, then
/// updates of the previous-step value.
fn phase(kind: AccessKind) -> u8 {
    match kind {
        AccessKind::Set => 0,
        AccessKind::Increment => 1,
        AccessKind::Read => 2,
        AccessKind::Update => 3,
    }
}

/// Directed graph over operator indices.
///
/// An edge `a -> b` means `a` must run before `b` within a step.
#[derive(Clone, Debug)]
pub struct DependencyGraph {
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
    edge_count: usize,
}

impl DependencyGraph {
    /// Validate the declared accesses and derive the dependency edges.
    ///
    /// # Errors
    ///
    /// Any access-level [`GraphError`]. Cycles are not detected here; see
    /// [`topological_order`](Self::topological_order).
    pub fn build(ops: &[Box<dyn Operator>], store: &SignalStore) -> Result<Self, GraphError> {
        let mut by_base: IndexMap<SignalId, Vec<Touch>> = IndexMap::new();

        for (index, op) in ops.iter().enumerate() {
            let access = op.access();
            if let Some(dup) = access.first_duplicate() {
                return Err(GraphError::InvalidAccess {
                    operator: op.name().to_string(),
                    signal: store.name(dup).to_string(),
                });
            }
            for (kind, signal) in access.iter() {
                let meta = store.meta(signal).map_err(|_| GraphError::UnknownSignal {
                    operator: op.name().to_string(),
                    signal,
                })?;
                if kind.is_write() && meta.readonly {
                    return Err(GraphError::ReadonlyWrite {
                        operator: op.name().to_string(),
                        signal: meta.name.clone(),
                    });
                }
                by_base.entry(meta.location.base).or_default().push(Touch {
                    op: index,
                    kind,
                    signal,
                    range: meta.location.range.clone(),
                });
            }
        }

        let mut successors: Vec<IndexSet<usize>> = vec![IndexSet::new(); ops.len()];
        let name = |i: usize| ops[i].name().to_string();

        for touches in by_base.values() {
            for (i, a) in touches.iter().enumerate() {
                for b in &touches[i + 1..] {
                    if a.op == b.op || !a.overlaps(b) {
                        continue;
                    }
                    // Touches are pushed in operator order, so `a` was declared first.
                    match (a.kind, b.kind) {
                        (AccessKind::Set, AccessKind::Set) => {
                            return Err(GraphError::MultipleSetter {
                                signal: store.name(b.signal).to_string(),
                                first: name(a.op),
                                second: name(b.op),
                            });
                        }
                        (AccessKind::Update, AccessKind::Update) => {
                            return Err(GraphError::MultipleUpdater {
                                signal: store.name(b.signal).to_string(),
                                first: name(a.op),
                                second: name(b.op),
                            });
                        }
                        (AccessKind::Set, AccessKind::Update) => {
                            return Err(GraphError::SetUpdateConflict {
                                signal: store.name(a.signal).to_string(),
                                setter: name(a.op),
                                updater: name(b.op),
                            });
                        }
                        (AccessKind::Update, AccessKind::Set) => {
                            return Err(GraphError::SetUpdateConflict {
                                signal: store.name(b.signal).to_string(),
                                setter: name(b.op),
                                updater: name(a.op),
                            });
                        }
                        _ => {}
                    }
                    match phase(a.kind).cmp(&phase(b.kind)) {
                        Ordering::Less => {
                            successors[a.op].insert(b.op);
                        }
                        Ordering::Greater => {
                            successors[b.op].insert(a.op);
                        }
                        Ordering::Equal => {}
                    }
                }
            }
        }

        for (base, touches) in &by_base {
            if store.meta(*base).is_ok_and(|m| m.readonly) {
                continue;
            }
            for read in touches.iter().filter(|t| t.kind == AccessKind::Read) {
                let written = touches
                    .iter()
                    .any(|t| t.kind.is_write() && t.overlaps(read));
                if !written {
                    return Err(GraphError::UnsetRead {
                        operator: name(read.op),
                        signal: store.name(read.signal).to_string(),
                    });
                }
            }
        }

        let mut predecessors = vec![Vec::new(); ops.len()];
        let successors: Vec<Vec<usize>> = successors
            .into_iter()
            .enumerate()
            .map(|(from, set)| {
                let mut out: Vec<usize> = set.into_iter().collect();
                out.sort_unstable();
                for &to in &out {
                    predecessors[to].push(from);
                }
                out
            })
            .collect();
        for preds in &mut predecessors {
            preds.sort_unstable();
        }
        let edge_count = successors.iter().map(Vec::len).sum();

        Ok(Self {
            successors,
            predecessors,
            edge_count,
        })
    }

    /// Number of operators.
    pub fn len(&self) -> usize {
        self.successors.len()
    }

    /// Whether the graph has no operators.
    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    /// Number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Operators that must run after `op`, ascending.
    pub fn successors(&self, op: usize) -> &[usize] {
        self.successors.get(op).map_or(&[], Vec::as_slice)
    }

    /// Operators that must run before `op`, ascending.
    pub fn predecessors(&self, op: usize) -> &[usize] {
        self.predecessors.get(op).map_or(&[], Vec::as_slice)
    }

    /// Whether `from -> to` is an edge.
    pub fn has_edge(&self, from: usize, to: usize) -> bool {
        self.successors(from).binary_search(&to).is_ok()
    }

    /// A topological order of the operators (Kahn's algorithm).
    ///
    /// Among ready operators the one declared first runs first, so the
    /// order is a pure function of the declarations.
    ///
    /// # Errors
    ///
    /// [`GraphError::CyclicDependency`] naming one cycle, using `names`
    /// to label operators.
    pub fn topological_order<F>(&self, names: F) -> Result<Vec<usize>, GraphError>
    where
        F: Fn(usize) -> String,
    {
        let n = self.len();
        let mut in_degree: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(op)) = ready.pop() {
            order.push(op);
            for &next in &self.successors[op] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() == n {
            return Ok(order);
        }
        let cycle = self
            .find_cycle(&in_degree)
            .into_iter()
            .map(names)
            .collect();
        Err(GraphError::CyclicDependency { cycle })
    }

    /// Walk predecessors among unscheduled operators until one repeats.
    ///
    /// Every unscheduled operator has an unscheduled predecessor, so the
    /// walk always closes. Returns the cycle in dependency order with the
    /// first operator repeated at the end.
    fn find_cycle(&self, in_degree: &[usize]) -> Vec<usize> {
        let Some(start) = in_degree.iter().position(|&d| d > 0) else {
            return Vec::new();
        };
        let mut seen_at: Vec<Option<usize>> = vec![None; self.len()];
        let mut path = Vec::new();
        let mut current = start;
        loop {
            if let Some(at) = seen_at[current] {
                let mut cycle: Vec<usize> = path[at..].to_vec();
                cycle.reverse();
                cycle.push(cycle[0]);
                return cycle;
            }
            seen_at[current] = Some(path.len());
            path.push(current);
            match self.predecessors[current]
                .iter()
                .copied()
                .find(|&p| in_degree[p] > 0)
            {
                Some(p) => current = p,
                None => return Vec::new(),
            }
        }
    }

    /// Longest-path level of each operator given a topological `order`.
    ///
    /// Operators sharing a level are mutually independent.
    pub fn levels(&self, order: &[usize]) -> Vec<usize> {
        let mut level = vec![0; self.len()];
        for &op in order {
            level[op] = self.predecessors[op]
                .iter()
                .map(|&p| level[p] + 1)
                .max()
                .unwrap_or(0);
        }
        level
    }

    /// For each operator, the set of operators reachable from it.
    pub(crate) fn descendants(&self, order: &[usize]) -> Vec<OpSet> {
        let mut reach = vec![OpSet::with_capacity(self.len()); self.len()];
        for &op in order.iter().rev() {
            let mut set = OpSet::with_capacity(self.len());
            for &next in &self.successors[op] {
                set.insert(next);
                set.union_with(&reach[next]);
            }
            reach[op] = set;
        }
        reach
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StepContext;
    use sigflow_core::{AccessSet, Dtype, OperatorError};
    use sigflow_store::Initial;

    struct Stub {
        name: &'static str,
        access: AccessSet,
    }

    impl Operator for Stub {
        fn name(&self) -> &str {
            self.name
        }
        fn access(&self) -> &AccessSet {
            &self.access
        }
        fn step(&self, _ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
            Ok(())
        }
    }

    fn stub(name: &'static str, access: AccessSet) -> Box<dyn Operator> {
        Box::new(Stub { name, access })
    }

    fn signals(n: usize) -> (SignalStore, Vec<SignalId>) {
        let mut store = SignalStore::new();
        let ids = (0..n)
            .map(|i| {
                store
                    .allocate(format!("s{i}"), &[4], Dtype::F64, Initial::Zeros)
                    .unwrap()
            })
            .collect();
        (store, ids)
    }

    #[test]
    fn touches_overlap_only_on_shared_elements() {
        let touch = |range: Range<usize>| Touch {
            op: 0,
            kind: AccessKind::Read,
            signal: SignalId(0),
            range,
        };
        assert!(touch(0..4).overlaps(&touch(3..5)));
        assert!(!touch(0..2).overlaps(&touch(2..4)));
        assert!(!touch(2..2).overlaps(&touch(0..4)));
        assert!(!touch(0..4).overlaps(&touch(1..1)));
    }

    #[test]
    fn set_then_increment_then_read() {
        let (store, s) = signals(1);
        let x = s[0];
        let ops = vec![
            stub("rd", AccessSet::new().read(x)),
            stub("inc", AccessSet::new().increment(x)),
            stub("set", AccessSet::new().set(x)),
        ];
        let g = DependencyGraph::build(&ops, &store).unwrap();
        assert!(g.has_edge(2, 1));
        assert!(g.has_edge(1, 0));
        assert!(g.has_edge(2, 0));
        let order = g.topological_order(|i| ops[i].name().to_string()).unwrap();
        assert_eq!(order, vec![2, 1, 0]);
        assert_eq!(g.levels(&order), vec![2, 1, 0]);
    }

    #[test]
    fn update_runs_after_readers_and_incrementers() {
        let (store, s) = signals(1);
        let x = s[0];
        let ops = vec![
            stub("upd", AccessSet::new().update(x)),
            stub("rd", AccessSet::new().read(x)),
            stub("inc", AccessSet::new().increment(x)),
        ];
        let g = DependencyGraph::build(&ops, &store).unwrap();
        assert!(g.has_edge(1, 0));
        assert!(g.has_edge(2, 0));
        assert_eq!(g.predecessors(0), &[1, 2]);
        let order = g.topological_order(|i| ops[i].name().to_string()).unwrap();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn disjoint_views_do_not_depend() {
        let (mut store, s) = signals(1);
        let lo = store.view(s[0], &[2], 0).unwrap();
        let hi = store.view(s[0], &[2], 2).unwrap();
        let ops = vec![
            stub("set_lo", AccessSet::new().set(lo)),
            stub("read_hi", AccessSet::new().read(hi)),
            stub("set_hi", AccessSet::new().set(hi)),
        ];
        let g = DependencyGraph::build(&ops, &store).unwrap();
        assert!(!g.has_edge(0, 1));
        assert!(g.has_edge(2, 1));
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn overlapping_view_reader_follows_base_setter() {
        let (mut store, s) = signals(1);
        let mid = store.view(s[0], &[2], 1).unwrap();
        let ops = vec![
            stub("read_mid", AccessSet::new().read(mid)),
            stub("set_base", AccessSet::new().set(s[0])),
        ];
        let g = DependencyGraph::build(&ops, &store).unwrap();
        assert!(g.has_edge(1, 0));
    }

    #[test]
    fn cycle_is_reported_in_dependency_order() {
        let (store, s) = signals(2);
        let ops = vec![
            stub("a", AccessSet::new().read(s[0]).set(s[1])),
            stub("b", AccessSet::new().read(s[1]).set(s[0])),
        ];
        let g = DependencyGraph::build(&ops, &store).unwrap();
        let err = g
            .topological_order(|i| ops[i].name().to_string())
            .unwrap_err();
        match err {
            GraphError::CyclicDependency { cycle } => {
                assert_eq!(cycle.len(), 3);
                assert_eq!(cycle.first(), cycle.last());
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_read_and_set_is_not_an_edge() {
        let (store, s) = signals(1);
        let ops = vec![stub("own", AccessSet::new().update(s[0]))];
        let g = DependencyGraph::build(&ops, &store).unwrap();
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn descendants_are_transitive() {
        let (store, s) = signals(3);
        let ops = vec![
            stub("a", AccessSet::new().set(s[0])),
            stub("b", AccessSet::new().read(s[0]).set(s[1])),
            stub("c", AccessSet::new().read(s[1]).set(s[2])),
            stub("d", AccessSet::new().read(s[2])),
        ];
        let g = DependencyGraph::build(&ops, &store).unwrap();
        let order = g.topological_order(|i| ops[i].name().to_string()).unwrap();
        let reach = g.descendants(&order);
        assert!(reach[0].contains(3));
        assert!(reach[1].contains(3));
        assert!(!reach[3].contains(0));
        assert_eq!(reach[0].len(), 3);
    }

    #[test]
    fn readonly_reads_need_no_writer() {
        let mut store = SignalStore::new();
        let k = store
            .allocate_readonly("k", &[1], Dtype::F64, Initial::Fill(2.0))
            .unwrap();
        let ops = vec![stub("use_k", AccessSet::new().read(k))];
        assert!(DependencyGraph::build(&ops, &store).is_ok());
    }
}
