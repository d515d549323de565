use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{Level, debug, trace};

use super::observer::{Change, Observer};
use super::source::Source;
use crate::error::SignalError;

struct CompositeState {
    /// Last known state of each source, `None` until the first snapshot or change arrives.
    shadows: Vec<Option<Change>>,
    aggregate: bool,
    /// Incremented every time `aggregate` flips to `true`.
    epoch: u64,
}

impl CompositeState {
    fn apply(&mut self, index: usize, change: Change) -> bool {
        let accept = match &self.shadows[index] {
            None => true,
            Some(current) => change.is_newer_than(current),
        };
        if accept {
            self.shadows[index] = Some(change);
        }
        accept
    }

    fn any_set(&self) -> bool {
        self.shadows
            .iter()
            .any(|shadow| matches!(shadow, Some(Change { value: true, .. })))
    }

    /// `true` if the aggregate is set, or was set at some point since `epoch` was sampled.
    fn released(&self, epoch: u64) -> bool {
        self.aggregate || self.epoch != epoch
    }
}

struct Shared {
    state: Mutex<CompositeState>,
    condvar: Condvar,
}

impl Shared {
    fn on_source_changed(&self, index: usize, change: Change) {
        let mut state = self.state.lock();
        if !state.apply(index, change) {
            trace!(
                "Ignoring stale change. index: {}, generation: {}",
                index, change.generation
            );
            return;
        }

        let aggregate = state.any_set();
        if aggregate == state.aggregate {
            return;
        }
        state.aggregate = aggregate;

        debug!(
            "Composite signal changed. aggregate: {}, index: {}, generation: {}",
            aggregate, index, change.generation
        );

        if aggregate {
            state.epoch += 1;
            self.condvar.notify_all();
        }
    }
}

/// Connects one source to the composite it feeds, without keeping the composite alive.
struct SourceLink {
    index: usize,
    shared: Weak<Shared>,
}

impl Observer for SourceLink {
    fn on_change(&self, change: Change) {
        if let Some(shared) = self.shared.upgrade() {
            shared.on_source_changed(self.index, change);
        }
    }

    fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

/// The sources of a composite with the links registered on them, detached when the last clone of
/// the composite is dropped.
struct Subscriptions {
    sources: Vec<Arc<Source>>,
    links: Vec<Arc<dyn Observer>>,
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        for (source, link) in self.sources.iter().zip(self.links.iter()) {
            source.unsubscribe(link);
        }
    }
}

/// The logical OR of a fixed set of [`Source`]s.
///
/// The aggregate is recomputed synchronously by every source transition, so a `set()` that
/// completes before a call to [`CompositeSignal::wait`] is always observed by it.
///
/// There is no way to set or clear a composite directly; to force it, add a dedicated source to
/// the set it is built from.
///
/// Clones share the same state.
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use fanin_signals::{CompositeSignal, Source};
///
/// let data_ready = Arc::new(Source::named("data_ready"));
/// let shutdown = Arc::new(Source::named("shutdown"));
///
/// let any = CompositeSignal::new([data_ready.clone(), shutdown.clone()]);
/// assert!(!any.wait_timeout(Duration::from_millis(10)));
///
/// shutdown.set();
/// assert!(any.is_set());
/// any.wait();
/// ```
#[derive(Clone)]
pub struct CompositeSignal {
    subscriptions: Arc<Subscriptions>,
    shared: Arc<Shared>,
}

impl CompositeSignal {
    /// Subscribes to every source and computes the initial aggregate.
    ///
    /// An empty set of sources is allowed; the resulting signal is never set.
    #[tracing::instrument(level = Level::DEBUG, skip_all)]
    pub fn new<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = Arc<Source>>,
    {
        let sources: Vec<Arc<Source>> = sources.into_iter().collect();

        let shared = Arc::new(Shared {
            state: Mutex::new(CompositeState {
                shadows: vec![None; sources.len()],
                aggregate: false,
                epoch: 0,
            }),
            condvar: Condvar::new(),
        });

        let mut links: Vec<Arc<dyn Observer>> = Vec::with_capacity(sources.len());
        for (index, source) in sources.iter().enumerate() {
            let link: Arc<dyn Observer> = Arc::new(SourceLink {
                index,
                shared: Arc::downgrade(&shared),
            });
            links.push(link.clone());

            // the source lock is released before the snapshot is applied, any change that raced
            // with it carries a newer generation and wins in `apply`.
            let current = source.subscribe_and_read(link);
            shared.on_source_changed(index, current);
        }

        let signal = Self {
            subscriptions: Arc::new(Subscriptions {
                sources,
                links,
            }),
            shared,
        };
        debug!("Created composite signal. {:?}", signal);

        signal
    }

    pub fn is_set(&self) -> bool {
        self.shared.state.lock().aggregate
    }

    /// Blocks until the aggregate is set.
    ///
    /// Returns immediately if it already is. A waiter is also released if the aggregate was set
    /// and cleared again while it was blocked.
    pub fn wait(&self) {
        let mut state = self.shared.state.lock();
        let epoch = state.epoch;
        self.shared
            .condvar
            .wait_while(&mut state, |state| !state.released(epoch));
    }

    /// Returns `false` if `timeout` elapsed before the aggregate was set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut state = self.shared.state.lock();
        let epoch = state.epoch;
        self.shared
            .condvar
            .wait_while_for(&mut state, |state| !state.released(epoch), timeout);
        state.released(epoch)
    }

    /// Returns `false` if `deadline` passed before the aggregate was set.
    pub fn wait_deadline(&self, deadline: Instant) -> bool {
        let mut state = self.shared.state.lock();
        let epoch = state.epoch;
        self.shared
            .condvar
            .wait_while_until(&mut state, |state| !state.released(epoch), deadline);
        state.released(epoch)
    }

    /// Like [`CompositeSignal::wait_timeout`], but an expired wait is an error.
    pub fn wait_or_err(&self, timeout: Duration) -> Result<(), SignalError> {
        if self.wait_timeout(timeout) {
            Ok(())
        } else {
            Err(SignalError::TimedOut {
                timeout,
            })
        }
    }

    pub fn sources(&self) -> &[Arc<Source>] {
        &self.subscriptions.sources
    }

    pub fn len(&self) -> usize {
        self.subscriptions.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.sources.is_empty()
    }
}

impl Debug for CompositeSignal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let labels: Vec<Option<&str>> = self
            .sources()
            .iter()
            .map(|source| source.label())
            .collect();

        let state = self.shared.state.lock();
        f.debug_struct("CompositeSignal")
            .field("sources", &labels)
            .field("aggregate", &state.aggregate)
            .field("epoch", &state.epoch)
            .finish()
    }
}
