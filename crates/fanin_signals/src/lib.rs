//! Thread-safe boolean sources and a fan-in signal that waits for any of them.
//!
//! A [`Source`] is a flag owned by one producer, for example "data ready" or "shutdown
//! requested". A [`CompositeSignal`] observes a fixed set of sources and lets consumer threads
//! block until at least one of them is set.
//!
//! # Key Features
//!
//! - Level-triggered: the composite always reflects the current OR of its sources
//! - No lost wakeups: recomputation happens synchronously inside `set()`/`clear()`
//! - Deadlock free: source locks are never held while observers run
//! - Sources and composites may be dropped in any order
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use fanin_signals::{CompositeSignal, Source};
//!
//! let sources: Vec<Arc<Source>> = ["a", "b", "c"]
//!     .into_iter()
//!     .map(|label| Arc::new(Source::named(label)))
//!     .collect();
//!
//! let any = CompositeSignal::new(sources.clone());
//! assert!(!any.wait_timeout(Duration::from_millis(10)));
//!
//! sources[1].set();
//! sources[2].set();
//! sources[1].clear();
//! assert!(any.is_set());
//!
//! sources[2].clear();
//! assert!(!any.is_set());
//! ```

pub mod error;
pub mod signal;


pub use error::SignalError;
pub use signal::{Change, CompositeSignal, Observer, Source};
