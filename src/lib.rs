//! The `nexter` crate turns push-style traversals into pull-style iterators.
//!
//! A *traversal* is a function that walks some data and calls a callback once
//! per element, in order, and returns when it's done. That's how a lot of code
//! is naturally written: tree walkers, parsers that emit tokens, a method that
//! visits every row of a table. But a caller who wants to *pull* elements one
//! at a time, interleave two traversals, or stop halfway and come back later,
//! needs an iterator instead.
//!
//! An [`Enumerator`] bridges the two. Given a traversal, it offers:
//!
//!   * [`next`](Enumerator::next) to get the next element and advance,
//!   * [`peek`](Enumerator::peek) to look at the next element without
//!     advancing,
//!   * [`has_next`](Enumerator::has_next) to ask whether there is one,
//!   * [`feed`](Enumerator::feed) to choose what the traversal's callback
//!     returns for the current element,
//!   * [`rewind`](Enumerator::rewind) to start over, and
//!   * [`size`](Enumerator::size) to report how many elements to expect.
//!
//! When the traversal finishes, `next()` returns [`Error::Exhausted`] with
//! whatever the traversal returned, and keeps returning it. When the traversal
//! fails, `next()` returns [`Error::Failed`] with the original [`Failure`],
//! backtrace and all.
//!
//! # Examples
//!
//! ## Enumerating a sequence
//!
//! Random-access sequences are indexed directly:
//!
//! ```rust
//! use std::sync::Arc;
//! use nexter::Enumerator;
//!
//! let e = Enumerator::over(Arc::new(vec![1, 2, 3]));
//! assert_eq!(e.next().unwrap(), 1);
//! assert_eq!(e.next().unwrap(), 2);
//! assert_eq!(e.next().unwrap(), 3);
//! assert!(e.next().unwrap_err().is_exhausted());
//! ```
//!
//! ## Enumerating a traversal
//!
//! Any other traversal runs on a pooled worker thread and is suspended between
//! elements, so it never runs ahead of the caller:
//!
//! ```rust
//! use nexter::Enumerator;
//! use nexter::Yielder;
//!
//! let e: Enumerator<&str, (), &str> = Enumerator::from_fn(|y: &mut Yielder<_>| {
//!     y.yield_value("x");
//!     y.yield_value("y");
//!     Ok("done")
//! });
//! assert_eq!(e.next().unwrap(), "x");
//! assert_eq!(e.next().unwrap(), "y");
//! assert_eq!(e.next().unwrap_err().into_result(), Some("done"));
//! // Asking again replays the end without running the traversal again.
//! assert_eq!(e.next().unwrap_err().into_result(), Some("done"));
//! ```
//!
//! ## Feeding values back
//!
//! The callback's return value is whatever the consumer fed for that element:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::Mutex;
//! use nexter::Enumerator;
//! use nexter::Yielder;
//!
//! let replies = Arc::new(Mutex::new(Vec::new()));
//! let seen = replies.clone();
//! let e: Enumerator<&str, i32> = Enumerator::from_fn(move |y: &mut Yielder<_, _>| {
//!     for question in ["a", "b"] {
//!         let reply = y.yield_value(question);
//!         seen.lock().unwrap().push(reply);
//!     }
//!     Ok(())
//! });
//! assert_eq!(e.next().unwrap(), "a");
//! e.feed(42).unwrap();
//! assert_eq!(e.next().unwrap(), "b");
//! assert!(e.next().unwrap_err().is_exhausted());
//! assert_eq!(*replies.lock().unwrap(), [Some(42), None]);
//! ```
//!
//! ## Derived enumerators
//!
//! ```rust
//! use nexter::IntoEnumerator;
//!
//! let e = vec![1, 2, 3, 4, 5].into_enumerator();
//! let pairs = e.each_slice(2).unwrap();
//! assert_eq!(pairs.to_string(), "#<Enumerator: #<Enumerator: [1, 2, 3, 4, 5]:each>:each_slice(2)>");
//! let all: Vec<Vec<i32>> = pairs.iter().map(Result::unwrap).collect();
//! assert_eq!(all, [vec![1, 2], vec![3, 4], vec![5]]);
//! ```
//!
//! # Configuration
//!
//! [`Config::global`] is read from the environment on first use:
//!
//!   * `NEXTER_LIGHTWEIGHT`: whether random-access sources are indexed
//!     directly (default `true`).
//!   * `NEXTER_MAX_WORKERS`: the worker pool's thread limit (default 1024).
//!   * `NEXTER_KEEP_ALIVE_MS`: how long idle workers linger (default 60000).
//!   * `NEXTER_STACK_SIZE`: worker stack size in bytes.
//!
//! Individual enumerators can override the first with
//! [`Builder::lightweight`] and use a private pool with [`Builder::pool`].
//!
//! # Logging
//!
//! The crate emits [`tracing`](https://docs.rs/tracing) events: `trace` for
//! worker handoffs and cancellation, `debug` for pool growth and reclamation,
//! `warn` for ignored settings. It never installs a subscriber.
//!
//! # FAQ
//!
//! ## Why a thread per suspended traversal?
//!
//! A traversal written as an ordinary function keeps its state on its call
//! stack. The only way to stop it halfway and resume it later, without
//! rewriting it, is to give it a stack of its own. Workers come from a pool
//! and go back to it as soon as the traversal ends or the enumerator is
//! rewound or dropped.
//!
//! ## What happens to a traversal that is abandoned halfway?
//!
//! Rewinding or dropping the enumerator unwinds the traversal from inside the
//! `yield_value` call it is suspended in. Its destructors run, and it never
//! observes a return from that call. Don't wrap `yield_value` in
//! `catch_unwind`.
//!
//! ## Can a traversal that never yields be cancelled?
//!
//! No. Cancellation is observed at handoffs. A traversal that loops forever
//! without yielding blocks the consumer waiting on it.

mod adapter;
mod assertions;
mod config;
mod derived;
mod enumerator;
mod error;
mod index_adapter;
mod into_enumerator;
mod iter;
mod pool;
mod size;
mod suspend;
mod termination;
mod thread_adapter;
mod unwind;
mod void;
mod yielder;

pub use assertions::EnumeratorAssertions;
pub use config::Config;
pub use config::ENV_KEEP_ALIVE_MS;
pub use config::ENV_LIGHTWEIGHT;
pub use config::ENV_MAX_WORKERS;
pub use config::ENV_STACK_SIZE;
pub use config::PoolConfig;
pub use enumerator::Builder;
pub use enumerator::Enumerator;
pub use error::Error;
pub use error::ErrorContext;
pub use error::Failure;
pub use error::NO_MESSAGE_AVAILABLE;
pub use index_adapter::RandomAccess;
pub use into_enumerator::IntoEnumerator;
pub use iter::Iter;
pub use pool::WorkerPool;
pub use size::Size;
pub use size::SizeDescriptor;
pub use yielder::Yielder;
