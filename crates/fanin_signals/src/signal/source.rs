use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use super::observer::{Change, Observer};

type Observers = Arc<Vec<Arc<dyn Observer>>>;

struct SourceState {
    flag: bool,
    generation: u64,
    /// Number of transitions to `true`, lets a waiter notice a set that was cleared again.
    sets: u64,
    /// Copy-on-write, so a transition can hand the list to its observers without holding the lock.
    observers: Observers,
}

impl SourceState {
    fn change(&self) -> Change {
        Change {
            value: self.flag,
            generation: self.generation,
        }
    }

    fn push_observer(&mut self, observer: Arc<dyn Observer>) {
        Arc::make_mut(&mut self.observers).push(observer);
    }

    /// `true` if the source is set, or was set at some point since `sets` was sampled.
    fn released(&self, sets: u64) -> bool {
        self.flag || self.sets != sets
    }
}

/// Compares by allocation only, vtable pointers for the same type may differ between codegen units.
fn same_observer(a: &Arc<dyn Observer>, b: &Arc<dyn Observer>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// An observable boolean flag owned by a single producer.
///
/// Sources are shared as `Arc<Source>`; any number of [`CompositeSignal`](super::CompositeSignal)s
/// may observe one without owning it.
///
/// ```rust
/// use fanin_signals::Source;
///
/// let shutdown = Source::named("shutdown");
/// shutdown.set();
/// assert!(shutdown.is_set());
/// shutdown.clear();
/// assert!(!shutdown.is_set());
/// ```
pub struct Source {
    label: Option<String>,
    state: Mutex<SourceState>,
    condvar: Condvar,
}

impl Source {
    pub fn new() -> Self {
        Self::build(None, false)
    }

    /// Creates a source with a label used in log output.
    pub fn named(label: impl Into<String>) -> Self {
        Self::build(Some(label.into()), false)
    }

    pub fn with_state(label: impl Into<String>, initial: bool) -> Self {
        Self::build(Some(label.into()), initial)
    }

    fn build(label: Option<String>, initial: bool) -> Self {
        Self {
            label,
            state: Mutex::new(SourceState {
                flag: initial,
                generation: 0,
                sets: 0,
                observers: Arc::new(Vec::new()),
            }),
            condvar: Condvar::new(),
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set(&self) {
        self.transition(true);
    }

    pub fn clear(&self) {
        self.transition(false);
    }

    pub fn is_set(&self) -> bool {
        self.state.lock().flag
    }

    /// Registers `observer` for all transitions from now on. The current state is not replayed,
    /// use [`Source::subscribe_and_read`] when it is needed.
    pub fn subscribe(&self, observer: Arc<dyn Observer>) {
        self.state.lock().push_observer(observer);
    }

    /// Registers `observer` and returns the state at the moment of registration.
    ///
    /// Both happen under one lock acquisition, so every later transition is delivered to the
    /// observer with a generation greater than the returned one.
    pub fn subscribe_and_read(&self, observer: Arc<dyn Observer>) -> Change {
        let mut state = self.state.lock();
        state.push_observer(observer);
        state.change()
    }

    /// Removes a previously subscribed observer, returns `false` if it was not registered.
    pub(crate) fn unsubscribe(&self, observer: &Arc<dyn Observer>) -> bool {
        let mut state = self.state.lock();
        match state
            .observers
            .iter()
            .position(|candidate| same_observer(candidate, observer))
        {
            Some(index) => {
                Arc::make_mut(&mut state.observers).remove(index);
                true
            }
            None => false,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.state.lock().observers.len()
    }

    /// Blocks until this source is set.
    ///
    /// A waiter is also released if the source was set and cleared again while it was blocked.
    pub fn wait(&self) {
        let mut state = self.state.lock();
        let sets = state.sets;
        self.condvar
            .wait_while(&mut state, |state| !state.released(sets));
    }

    /// Returns `false` if `timeout` elapsed before the source was set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        let sets = state.sets;
        self.condvar
            .wait_while_for(&mut state, |state| !state.released(sets), timeout);
        state.released(sets)
    }

    fn transition(&self, value: bool) {
        let (change, observers) = {
            let mut state = self.state.lock();
            if state.flag == value {
                return;
            }
            state.flag = value;
            state.generation += 1;

            if value {
                state.sets += 1;
                self.condvar.notify_all();
            }

            (state.change(), state.observers.clone())
        };

        trace!(
            "Source transition. label: {:?}, value: {}, generation: {}, observers: {}",
            self.label,
            change.value,
            change.generation,
            observers.len()
        );

        // the source lock must not be held here, observers take their own locks and may call back into us.
        for observer in observers.iter() {
            observer.on_change(change);
        }

        self.prune(&observers);
    }

    /// Drops observers from `observers` that report they are no longer alive.
    ///
    /// Liveness is user code too, so it is evaluated without the lock held.
    fn prune(&self, observers: &Observers) {
        let dead: Vec<&Arc<dyn Observer>> = observers
            .iter()
            .filter(|observer| !observer.is_alive())
            .collect();
        if dead.is_empty() {
            return;
        }

        let mut state = self.state.lock();
        Arc::make_mut(&mut state.observers).retain(|observer| {
            !dead
                .iter()
                .any(|candidate| same_observer(candidate, observer))
        });
    }
}

impl Default for Source {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Source")
            .field("label", &self.label)
            .field("flag", &state.flag)
            .field("generation", &state.generation)
            .field("observers", &state.observers.len())
            .finish()
    }
}
