//! Access kinds and the per-operator [`AccessSet`].
//!
//! Operators never name their producers or consumers. They classify every
//! signal they touch with exactly one [`AccessKind`], and the resolver
//! derives the dependency edges from those classifications.

use smallvec::SmallVec;
use std::fmt;

use crate::id::SignalId;

/// How an operator touches a signal during one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccessKind {
    /// The value must be fully produced before the operator runs.
    Read,
    /// The operator overwrites every element. At most one setter per signal.
    Set,
    /// The operator adds into the existing contents. Any number of
    /// incrementers may target a signal, in any relative order.
    Increment,
    /// The operator reads the value left by the previous step and writes
    /// the value seen by the next one. Runs after every same-step reader.
    Update,
}

impl AccessKind {
    /// Whether this access writes the signal.
    pub fn is_write(self) -> bool {
        !matches!(self, Self::Read)
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Set => write!(f, "set"),
            Self::Increment => write!(f, "increment"),
            Self::Update => write!(f, "update"),
        }
    }
}

type SignalList = SmallVec<[SignalId; 4]>;

/// The four disjoint signal lists an operator declares.
///
/// Declaration order is preserved within each list.
///
/// ```
/// use sigflow_core::{AccessKind, AccessSet, SignalId};
///
/// let access = AccessSet::new()
///     .read(SignalId(0))
///     .increment(SignalId(1));
/// assert_eq!(access.kind_of(SignalId(1)), Some(AccessKind::Increment));
/// assert_eq!(access.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessSet {
    reads: SignalList,
    sets: SignalList,
    increments: SignalList,
    updates: SignalList,
}

impl AccessSet {
    /// An operator touching no signals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a read access.
    pub fn read(mut self, signal: SignalId) -> Self {
        self.reads.push(signal);
        self
    }

    /// Add a set access.
    pub fn set(mut self, signal: SignalId) -> Self {
        self.sets.push(signal);
        self
    }

    /// Add an increment access.
    pub fn increment(mut self, signal: SignalId) -> Self {
        self.increments.push(signal);
        self
    }

    /// Add an update access.
    pub fn update(mut self, signal: SignalId) -> Self {
        self.updates.push(signal);
        self
    }

    /// Add an access of the given kind.
    pub fn with(self, kind: AccessKind, signal: SignalId) -> Self {
        match kind {
            AccessKind::Read => self.read(signal),
            AccessKind::Set => self.set(signal),
            AccessKind::Increment => self.increment(signal),
            AccessKind::Update => self.update(signal),
        }
    }

    /// Signals read this step.
    pub fn reads(&self) -> &[SignalId] {
        &self.reads
    }

    /// Signals fully overwritten this step.
    pub fn sets(&self) -> &[SignalId] {
        &self.sets
    }

    /// Signals accumulated into this step.
    pub fn increments(&self) -> &[SignalId] {
        &self.increments
    }

    /// Signals carried to the next step.
    pub fn updates(&self) -> &[SignalId] {
        &self.updates
    }

    /// The signals of one access kind.
    pub fn of(&self, kind: AccessKind) -> &[SignalId] {
        match kind {
            AccessKind::Read => &self.reads,
            AccessKind::Set => &self.sets,
            AccessKind::Increment => &self.increments,
            AccessKind::Update => &self.updates,
        }
    }

    /// Every `(kind, signal)` pair, reads first, then sets, increments, updates.
    pub fn iter(&self) -> impl Iterator<Item = (AccessKind, SignalId)> + '_ {
        self.reads
            .iter()
            .map(|&s| (AccessKind::Read, s))
            .chain(self.sets.iter().map(|&s| (AccessKind::Set, s)))
            .chain(self.increments.iter().map(|&s| (AccessKind::Increment, s)))
            .chain(self.updates.iter().map(|&s| (AccessKind::Update, s)))
    }

    /// Every written signal (set, increment, or update).
    pub fn writes(&self) -> impl Iterator<Item = SignalId> + '_ {
        self.iter()
            .filter(|(kind, _)| kind.is_write())
            .map(|(_, s)| s)
    }

    /// The kind under which `signal` is declared, if any.
    ///
    /// If the signal is (illegally) declared twice, the first kind in
    /// [`iter`](Self::iter) order is returned.
    pub fn kind_of(&self, signal: SignalId) -> Option<AccessKind> {
        self.iter().find(|&(_, s)| s == signal).map(|(k, _)| k)
    }

    /// The first signal declared more than once, across all kinds.
    pub fn first_duplicate(&self) -> Option<SignalId> {
        let mut seen: SmallVec<[SignalId; 16]> = SmallVec::new();
        for (_, s) in self.iter() {
            if seen.contains(&s) {
                return Some(s);
            }
            seen.push(s);
        }
        None
    }

    /// Total number of declared accesses.
    pub fn len(&self) -> usize {
        self.reads.len() + self.sets.len() + self.increments.len() + self.updates.len()
    }

    /// Whether the operator touches no signals.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenate another access set onto this one.
    pub fn extend(&mut self, other: &AccessSet) {
        self.reads.extend_from_slice(&other.reads);
        self.sets.extend_from_slice(&other.sets);
        self.increments.extend_from_slice(&other.increments);
        self.updates.extend_from_slice(&other.updates);
    }
}
