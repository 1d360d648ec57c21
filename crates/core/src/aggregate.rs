//! Aggregate contract for the event-sourced domain crates.

/// Identity and revision of an aggregate.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Number of events applied so far; equals the stream revision the
    /// state was rebuilt from.
    fn version(&self) -> u64;
}

/// What a writer believes the stream head is.
///
/// `Exact(v)` is the whole concurrency story: an append carrying it commits
/// only if the stream is still at revision `v`, which turns a read-decide-
/// write sequence into a compare-and-swap instead of a lost-update race.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// No expectation; append at whatever the head is.
    Any,
    /// The stream must still be exactly at this revision.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn is_satisfied_by(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(expected) => expected == actual,
        }
    }
}

/// Pure decide/evolve split.
///
/// `handle` inspects state plus a command and returns the facts that should
/// become true; `apply` folds one fact into state. Neither may perform IO
/// or mutate anything else: after a lost optimistic race the dispatcher
/// re-runs both against fresher history, so the first run must leave no
/// trace.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event; advances `version()` by
    /// one per applied event.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit for a command, without mutating state.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
