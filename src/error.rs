use std::any::Any;
use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Message used when a failure is raised without one.
pub const NO_MESSAGE_AVAILABLE: &str = "No message available";

/// Errors reported by the external-iteration operations of an
/// [`Enumerator`](crate::Enumerator).
///
/// `R` is the type of the value the underlying traversal returns when it
/// finishes normally. It is carried by [`Error::Exhausted`] so that the
/// consumer can observe what the producer returned.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error<R> {
    /// The traversal finished. `result` is the traversal's own return value.
    ///
    /// Once observed, every later `next()` or `peek()` reports the same
    /// exhaustion without running the traversal again.
    #[error("iteration reached an end")]
    Exhausted { result: R },

    /// `feed()` was called while a previously fed value had not yet been
    /// delivered to the producer.
    #[error("feed value already set")]
    FeedAlreadySet,

    /// A slice or window size of zero was requested.
    #[error("invalid size")]
    InvalidSize,

    /// The handoff with the producer broke outside of a cancellation.
    #[error("interrupted during iteration")]
    Interrupted,

    /// No worker could be started for the traversal, even after one
    /// reclamation pass.
    #[error("unable to start enumerator worker: {0}")]
    ResourceExhausted(String),

    /// The traversal failed. The failure is replayed exactly as it was
    /// raised on the producer side.
    #[error(transparent)]
    Failed(#[from] Failure),
}

impl<R> Error<R> {
    /// Returns `true` if this is [`Error::Exhausted`].
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Error::Exhausted { .. })
    }

    /// Returns the traversal's return value if this is [`Error::Exhausted`].
    pub fn into_result(self) -> Option<R> {
        match self {
            Error::Exhausted { result } => Some(result),
            _ => None,
        }
    }

    /// Returns the replayed failure if this is [`Error::Failed`].
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Error::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Changes the exhaustion payload type, keeping every other variant.
    pub fn map_result<R2>(self, f: impl FnOnce(R) -> R2) -> Error<R2> {
        match self {
            Error::Exhausted { result } => Error::Exhausted { result: f(result) },
            Error::FeedAlreadySet => Error::FeedAlreadySet,
            Error::InvalidSize => Error::InvalidSize,
            Error::Interrupted => Error::Interrupted,
            Error::ResourceExhausted(msg) => Error::ResourceExhausted(msg),
            Error::Failed(failure) => Error::Failed(failure),
        }
    }
}

struct Raised {
    kind: Cow<'static, str>,
    message: String,
    backtrace: Backtrace,
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// An error raised inside a traversal.
///
/// A `Failure` carries a kind (the identity of the error class), a message,
/// the backtrace captured where it was raised, and optionally the error that
/// caused it. Cloning is cheap and every clone refers to the same raise, so a
/// failure captured on a worker thread and replayed on the consumer keeps its
/// original backtrace. [`Failure::same_raise`] tells whether two values come
/// from the same raise.
#[derive(Clone)]
pub struct Failure(Arc<Raised>);

impl Failure {
    /// Raises a new failure of the given kind, capturing a backtrace here.
    ///
    /// Whether the backtrace contains frames follows the usual
    /// `RUST_BACKTRACE`/`RUST_LIB_BACKTRACE` policy of
    /// [`Backtrace::capture`].
    pub fn new(
        kind: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Failure(Arc::new(Raised {
            kind: kind.into(),
            message: if message.is_empty() {
                NO_MESSAGE_AVAILABLE.to_owned()
            } else {
                message
            },
            backtrace: Backtrace::capture(),
            cause: None,
        }))
    }

    /// Wraps an arbitrary error. The kind is the error's type name.
    pub fn from_error<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let full = std::any::type_name::<E>();
        let kind = full
            .split('<')
            .next()
            .and_then(|path| path.rsplit("::").next())
            .unwrap_or(full);
        Failure(Arc::new(Raised {
            kind: Cow::Owned(kind.to_owned()),
            message: error.to_string(),
            backtrace: Backtrace::capture(),
            cause: Some(Box::new(error)),
        }))
    }

    /// Captures a panic payload from a traversal as a failure of kind
    /// `"panic"`.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            String::new()
        };
        Failure::new("panic", message)
    }

    /// The identity of the error class this failure was raised as.
    pub fn kind(&self) -> &str {
        &self.0.kind
    }

    /// Returns `true` if this failure was raised with the given kind.
    pub fn is(&self, kind: &str) -> bool {
        self.kind() == kind
    }

    pub fn message(&self) -> &str {
        &self.0.message
    }

    /// The backtrace captured at the original raise site.
    pub fn backtrace(&self) -> &Backtrace {
        &self.0.backtrace
    }

    /// Returns `true` if both values are the same raise.
    pub fn same_raise(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.0.kind, self.0.message)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("kind", &self.0.kind)
            .field("message", &self.0.message)
            .field("cause", &self.0.cause)
            .finish_non_exhaustive()
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0
            .cause
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// The "last raised error" of one side of an enumerator.
///
/// Each consumer keeps its own context, and a producer running on a worker
/// thread raises into a private copy. The context holds at most one failure,
/// the most recent, along with a count of everything raised into it.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    last: Option<Failure>,
    raised: u64,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises a new failure into this context and returns it, typically to be
    /// returned as `Err(..)` from a traversal.
    pub fn raise(
        &mut self,
        kind: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Failure {
        let failure = Failure::new(kind, message);
        self.record(&failure);
        failure
    }

    /// Makes `failure` the last raised error.
    pub fn record(&mut self, failure: &Failure) {
        self.last = Some(failure.clone());
        self.raised += 1;
    }

    /// The most recently raised failure, if any.
    pub fn last(&self) -> Option<&Failure> {
        self.last.as_ref()
    }

    /// How many failures have been raised into this context.
    pub fn raised(&self) -> u64 {
        self.raised
    }
}
