//! Core signal components.
//!
//! - `Source`: an observable boolean flag, set and cleared by its producer
//! - `CompositeSignal`: the OR of a fixed set of sources, with blocking waits
//! - `Observer`: the interface through which a source reports its transitions
//!
//! # Lock ordering
//!
//! A source never holds its own lock while calling observers, and a composite only takes its
//! lock from inside those calls or from its own methods. Neither ever waits on the other's lock
//! while holding its own.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use fanin_signals::{CompositeSignal, Source};
//!
//! let data_ready = Arc::new(Source::named("data_ready"));
//! let error = Arc::new(Source::named("error"));
//! let wake = CompositeSignal::new([data_ready.clone(), error.clone()]);
//!
//! let producer = thread::spawn(move || error.set());
//!
//! wake.wait();
//! producer.join().unwrap();
//! assert!(wake.is_set());
//! ```

mod composite;
mod observer;
mod source;

pub use composite::CompositeSignal;
pub use observer::{Change, Observer};
pub use source::Source;
