/// A single transition of a [`Source`](super::Source).
///
/// `generation` increases by one on every real transition of the source it came from, so two
/// changes from the same source can always be ordered even if their notifications are delivered
/// out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    pub value: bool,
    pub generation: u64,
}

impl Change {
    /// Returns `true` if `self` describes a later state of the same source than `other`.
    pub fn is_newer_than(&self, other: &Change) -> bool {
        self.generation > other.generation
    }
}

/// Receives the transitions of a [`Source`](super::Source).
///
/// Observers are invoked synchronously by the thread calling `set`/`clear`, after the source's
/// lock has been released. Implementations may call back into the source.
pub trait Observer: Send + Sync {
    fn on_change(&self, change: Change);

    /// Observers that return `false` are removed by the source on its next transition.
    fn is_alive(&self) -> bool {
        true
    }
}

impl<F> Observer for F
where
    F: Fn(Change) + Send + Sync,
{
    fn on_change(&self, change: Change) {
        self(change)
    }
}
