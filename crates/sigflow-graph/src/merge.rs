//! Operator fusion.
//!
//! An optional rewrite pass run between two resolutions. Independent
//! operators with equal [`FuseKey`]s are replaced by one operator over
//! batched buffers. The pass never changes what a step computes, only how
//! many operators compute it.

use tracing::{debug, trace};

use sigflow_core::AccessSet;
use sigflow_store::{Location, SignalStore};

use crate::error::GraphError;
use crate::graph::DependencyGraph;
use crate::operator::{FuseKey, Operator};
use crate::opset::OpSet;

/// Outcome of a fusion pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Operators before the pass.
    pub before: usize,
    /// Operators after the pass.
    pub after: usize,
    /// Number of fused operators created.
    pub groups: usize,
}

/// Fuse compatible, mutually independent operators.
///
/// Walks the schedule order. Each untried operator with a [`FuseKey`]
/// becomes a leader and greedily collects later operators that share its
/// key, are unreachable from and cannot reach any member, and whose
/// accesses do not alias any member's writes.
///
/// The group is then split into runs whose written signals tile one base
/// buffer, ordered by element offset, so that unrelated buffers and
/// declaration order never prevent adjacent members from fusing. The
/// first member of each run of two or more builds the replacement through
/// [`Operator::fuse`], which takes the position of the run's
/// earliest-declared member. Members left out of an accepted run stay
/// untried and may lead a later group.
///
/// The dependency closure is rebuilt only after an accepted fusion. A
/// declined group only marks its leader as tried.
///
/// The returned list must be resolved again before execution.
///
/// # Errors
///
/// Any [`GraphError`] raised while building the dependency graph.
pub fn merge_operators(
    ops: Vec<Box<dyn Operator>>,
    store: &mut SignalStore,
) -> Result<(Vec<Box<dyn Operator>>, MergeReport), GraphError> {
    let before = ops.len();
    let mut ops = ops;
    let mut tried = vec![false; ops.len()];
    let mut groups = 0;
    let mut rebuilds = 0;

    'rebuild: loop {
        rebuilds += 1;
        let graph = DependencyGraph::build(&ops, store)?;
        let order = graph.topological_order(|i| ops[i].name().to_string())?;
        let reach = graph.descendants(&order);
        let keys: Vec<Option<FuseKey>> = ops.iter().map(|op| op.fuse_key(store)).collect();

        for (at, &leader) in order.iter().enumerate() {
            if tried[leader] {
                continue;
            }
            let Some(key) = keys[leader].as_ref() else {
                continue;
            };
            tried[leader] = true;

            let mut group = vec![leader];
            for &candidate in &order[at + 1..] {
                if tried[candidate] || keys[candidate].as_ref() != Some(key) {
                    continue;
                }
                if group
                    .iter()
                    .all(|&m| compatible(&ops, store, &reach, m, candidate))
                {
                    group.push(candidate);
                }
            }
            if group.len() < 2 {
                continue;
            }

            for run in contiguous_runs(&ops, store, group) {
                if run.len() < 2 {
                    continue;
                }
                let first = run[0];
                let members: Vec<&dyn Operator> = run.iter().map(|&i| ops[i].as_ref()).collect();
                let Some(fused) = ops[first].fuse(&members, store) else {
                    trace!(operator = ops[first].name(), members = run.len(), "fusion declined");
                    continue;
                };
                debug!(operator = fused.name(), members = run.len(), "fused operators");
                groups += 1;
                (ops, tried) = replace_run(ops, tried, &run, fused);
                continue 'rebuild;
            }
        }
        break;
    }
    trace!(rebuilds, "fusion pass converged");

    let report = MergeReport {
        before,
        after: ops.len(),
        groups,
    };
    Ok((ops, report))
}

/// Split a fusion group into runs of members whose first written signals
/// are adjacent ranges of one base buffer, each ordered by offset.
///
/// Members without a resolvable write form runs of their own.
fn contiguous_runs(
    ops: &[Box<dyn Operator>],
    store: &SignalStore,
    group: Vec<usize>,
) -> Vec<Vec<usize>> {
    let mut placed: Vec<(Option<Location>, usize)> = group
        .into_iter()
        .map(|i| {
            let loc = ops[i]
                .access()
                .writes()
                .next()
                .and_then(|w| store.location(w).ok().cloned());
            (loc, i)
        })
        .collect();
    placed.sort_by_key(|(loc, i)| (loc.as_ref().map(|l| (l.base, l.range.start)), *i));

    let mut runs: Vec<Vec<usize>> = Vec::new();
    let mut tail: Option<Location> = None;
    for (loc, i) in placed {
        let extends = match (&tail, &loc) {
            (Some(prev), Some(next)) => {
                prev.base == next.base && prev.range.end == next.range.start
            }
            _ => false,
        };
        if extends {
            if let Some(run) = runs.last_mut() {
                run.push(i);
            }
        } else {
            runs.push(vec![i]);
        }
        tail = loc;
    }
    runs
}

/// Replace the members of `run` by `fused`, placed at the earliest
/// member's index and marked tried.
fn replace_run(
    ops: Vec<Box<dyn Operator>>,
    tried: Vec<bool>,
    run: &[usize],
    fused: Box<dyn Operator>,
) -> (Vec<Box<dyn Operator>>, Vec<bool>) {
    let first = run.iter().copied().min().unwrap_or(0);
    let mut in_run = OpSet::with_capacity(ops.len());
    run.iter().for_each(|&i| in_run.insert(i));

    let mut next_ops = Vec::with_capacity(ops.len() + 1 - run.len());
    let mut next_tried = Vec::with_capacity(next_ops.capacity());
    let mut fused = Some(fused);
    for (i, op) in ops.into_iter().enumerate() {
        if i == first {
            if let Some(f) = fused.take() {
                next_ops.push(f);
                next_tried.push(true);
            }
        } else if !in_run.contains(i) {
            next_ops.push(op);
            next_tried.push(tried[i]);
        }
    }
    (next_ops, next_tried)
}

/// Whether `b` may join a group containing `a`.
fn compatible(
    ops: &[Box<dyn Operator>],
    store: &SignalStore,
    reach: &[OpSet],
    a: usize,
    b: usize,
) -> bool {
    if reach[a].contains(b) || reach[b].contains(a) {
        return false;
    }
    let (aa, ba) = (ops[a].access(), ops[b].access());
    let clobbers = |writer: &AccessSet, other: &AccessSet| {
        writer
            .writes()
            .any(|w| other.iter().any(|(_, s)| store.may_share_memory(w, s)))
    };
    !clobbers(aa, ba) && !clobbers(ba, aa)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StepContext;
    use crate::operator::downcast_ref;
    use crate::resolve::resolve;
    use sigflow_core::{AccessSet, Dtype, OperatorError, SignalId, StepId};
    use sigflow_store::Initial;

    /// `dst = src`, fusable over adjacent buffers.
    struct Mirror {
        name: String,
        src: SignalId,
        dst: SignalId,
        access: AccessSet,
        count: usize,
    }

    impl Mirror {
        fn boxed(name: &str, src: SignalId, dst: SignalId) -> Box<dyn Operator> {
            Box::new(Mirror {
                name: name.to_string(),
                src,
                dst,
                access: AccessSet::new().read(src).set(dst),
                count: 1,
            })
        }
    }

    impl Operator for Mirror {
        fn name(&self) -> &str {
            &self.name
        }
        fn access(&self) -> &AccessSet {
            &self.access
        }
        fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
            let v = ctx.read(self.src)?.to_vec();
            ctx.write(self.dst)?.copy_from_slice(&v);
            Ok(())
        }
        fn fuse_key(&self, store: &SignalStore) -> Option<FuseKey> {
            let dtype = store.meta(self.dst).ok()?.dtype;
            Some(FuseKey::new("mirror", dtype))
        }
        fn fuse(&self, members: &[&dyn Operator], store: &mut SignalStore) -> Option<Box<dyn Operator>> {
            let mirrors: Vec<&Mirror> = members
                .iter()
                .map(|&m| downcast_ref::<Mirror>(m))
                .collect::<Option<_>>()?;
            let srcs: Vec<SignalId> = mirrors.iter().map(|m| m.src).collect();
            let dsts: Vec<SignalId> = mirrors.iter().map(|m| m.dst).collect();
            let src = store.concat(&srcs)?;
            let dst = store.concat(&dsts)?;
            Some(Box::new(Mirror {
                name: format!("{}+{}", self.name, members.len() - 1),
                src,
                dst,
                access: AccessSet::new().read(src).set(dst),
                count: mirrors.iter().map(|m| m.count).sum(),
            }))
        }
        fn fused_count(&self) -> usize {
            self.count
        }
    }

    /// Sets a whole base; never fuses.
    struct Source {
        dst: SignalId,
        access: AccessSet,
    }

    impl Operator for Source {
        fn name(&self) -> &str {
            "source"
        }
        fn access(&self) -> &AccessSet {
            &self.access
        }
        fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), OperatorError> {
            for (i, v) in ctx.write(self.dst)?.iter_mut().enumerate() {
                *v = i as f64 + 1.0;
            }
            Ok(())
        }
    }

    fn source(dst: SignalId) -> Box<dyn Operator> {
        Box::new(Source {
            dst,
            access: AccessSet::new().set(dst),
        })
    }

    fn split(store: &mut SignalStore, name: &str, n: usize) -> (SignalId, Vec<SignalId>) {
        let base = store.allocate(name, &[n], Dtype::F64, Initial::Zeros).unwrap();
        let parts = (0..n).map(|i| store.view(base, &[1], i).unwrap()).collect();
        (base, parts)
    }

    fn run_once(ops: &[Box<dyn Operator>], store: &SignalStore) -> sigflow_store::SignalData {
        let schedule = resolve(ops, store).unwrap();
        let mut data = store.instantiate();
        for &i in schedule.order() {
            let op = &ops[i];
            let mut ctx = StepContext::new(&mut data, op.access(), StepId(1), 0.0, 0.1);
            op.step(&mut ctx).unwrap();
        }
        data
    }

    #[test]
    fn adjacent_independent_mirrors_fuse() {
        let mut store = SignalStore::new();
        let (x, xs) = split(&mut store, "x", 4);
        let (y, ys) = split(&mut store, "y", 4);
        let mut ops = vec![source(x)];
        for i in 0..4 {
            ops.push(Mirror::boxed(&format!("m{i}"), xs[i], ys[i]));
        }
        let expected = run_once(&ops, &store);

        let (fused, report) = merge_operators(ops, &mut store).unwrap();
        assert_eq!(
            report,
            MergeReport {
                before: 5,
                after: 2,
                groups: 1
            }
        );
        assert_eq!(fused[1].name(), "m0+3");
        assert_eq!(fused[1].fused_count(), 4);
        let mirror = downcast_ref::<Mirror>(fused[1].as_ref()).unwrap();
        assert_eq!(mirror.src, x);
        assert_eq!(mirror.dst, y);

        let actual = run_once(&fused, &store);
        assert_eq!(actual.read(y), expected.read(y));
        assert_eq!(actual.read(y).unwrap(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn dependent_operators_stay_separate() {
        let mut store = SignalStore::new();
        let (a, _) = split(&mut store, "a", 1);
        let (_, bs) = split(&mut store, "b", 2);
        let ops = vec![
            source(a),
            Mirror::boxed("first", a, bs[0]),
            Mirror::boxed("second", bs[0], bs[1]),
        ];
        let (out, report) = merge_operators(ops, &mut store).unwrap();
        assert_eq!(report.groups, 0);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn non_adjacent_buffers_decline_fusion() {
        let mut store = SignalStore::new();
        let (x, xs) = split(&mut store, "x", 4);
        let (_, ys) = split(&mut store, "y", 4);
        let ops = vec![
            source(x),
            Mirror::boxed("m0", xs[0], ys[0]),
            Mirror::boxed("m2", xs[2], ys[2]),
        ];
        let (out, report) = merge_operators(ops, &mut store).unwrap();
        assert_eq!(report.groups, 0);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn fused_operator_keeps_earliest_position() {
        let mut store = SignalStore::new();
        let (x, xs) = split(&mut store, "x", 2);
        let (_, ys) = split(&mut store, "y", 2);
        let ops = vec![
            Mirror::boxed("m0", xs[0], ys[0]),
            source(x),
            Mirror::boxed("m1", xs[1], ys[1]),
        ];
        let (out, report) = merge_operators(ops, &mut store).unwrap();
        assert_eq!(report.after, 2);
        // `source` runs first, but the fused operator takes m0's slot.
        assert_eq!(out[0].name(), "m0+1");
        assert_eq!(out[0].fused_count(), 2);
        assert_eq!(out[1].name(), "source");
    }

    #[test]
    fn unrelated_base_does_not_block_adjacent_members() {
        let mut store = SignalStore::new();
        let (x, xs) = split(&mut store, "x", 2);
        let (y, ys) = split(&mut store, "y", 2);
        let (z, _) = split(&mut store, "z", 1);
        let (w, _) = split(&mut store, "w", 1);
        let ops = vec![
            source(x),
            source(z),
            Mirror::boxed("m0", xs[0], ys[0]),
            Mirror::boxed("mz", z, w),
            Mirror::boxed("m1", xs[1], ys[1]),
        ];
        let expected = run_once(&ops, &store);

        let (out, report) = merge_operators(ops, &mut store).unwrap();
        assert_eq!(
            report,
            MergeReport {
                before: 5,
                after: 4,
                groups: 1
            }
        );
        let names: Vec<&str> = out.iter().map(|op| op.name()).collect();
        assert_eq!(names, ["source", "source", "m0+1", "mz"]);

        let actual = run_once(&out, &store);
        assert_eq!(actual.read(y), expected.read(y));
        assert_eq!(actual.read(w), expected.read(w));
    }

    #[test]
    fn members_fuse_in_buffer_order() {
        let mut store = SignalStore::new();
        let (x, xs) = split(&mut store, "x", 2);
        let (y, ys) = split(&mut store, "y", 2);
        let ops = vec![
            source(x),
            Mirror::boxed("m1", xs[1], ys[1]),
            Mirror::boxed("m0", xs[0], ys[0]),
        ];
        let (out, report) = merge_operators(ops, &mut store).unwrap();
        assert_eq!(report.after, 2);
        assert_eq!(out[1].name(), "m0+1");
        let mirror = downcast_ref::<Mirror>(out[1].as_ref()).unwrap();
        assert_eq!(mirror.src, x);
        assert_eq!(mirror.dst, y);
        assert_eq!(run_once(&out, &store).read(y).unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn every_contiguous_run_fuses() {
        let mut store = SignalStore::new();
        let (x, xs) = split(&mut store, "x", 2);
        let (_, ys) = split(&mut store, "y", 2);
        let (v, vs) = split(&mut store, "v", 2);
        let (_, ws) = split(&mut store, "w", 2);
        let ops = vec![
            source(x),
            source(v),
            Mirror::boxed("m0", xs[0], ys[0]),
            Mirror::boxed("n0", vs[0], ws[0]),
            Mirror::boxed("m1", xs[1], ys[1]),
            Mirror::boxed("n1", vs[1], ws[1]),
        ];
        let (out, report) = merge_operators(ops, &mut store).unwrap();
        assert_eq!(report.groups, 2);
        assert_eq!(report.after, 4);
        let names: Vec<&str> = out.iter().map(|op| op.name()).collect();
        assert_eq!(names, ["source", "source", "m0+1", "n0+1"]);
    }

    #[test]
    fn scattered_members_are_left_in_place() {
        let mut store = SignalStore::new();
        let mut ops = Vec::new();
        for i in 0..6 {
            let (src, _) = split(&mut store, &format!("s{i}"), 1);
            let (dst, _) = split(&mut store, &format!("d{i}"), 1);
            ops.push(source(src));
            ops.push(Mirror::boxed(&format!("m{i}"), src, dst));
        }
        let names: Vec<String> = ops.iter().map(|op| op.name().to_string()).collect();
        let (out, report) = merge_operators(ops, &mut store).unwrap();
        assert_eq!(report.groups, 0);
        let after: Vec<String> = out.iter().map(|op| op.name().to_string()).collect();
        assert_eq!(after, names);
    }

    #[test]
    fn empty_list_is_untouched() {
        let mut store = SignalStore::new();
        let (out, report) = merge_operators(Vec::new(), &mut store).unwrap();
        assert!(out.is_empty());
        assert_eq!(report, MergeReport::default());
    }
}
