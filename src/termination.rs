use crate::error::Error;
use crate::error::ErrorContext;
use crate::error::Failure;

/// How a traversal ended.
///
/// A termination is produced at most once per adapter and cached by the
/// consumer after it is first observed, so asking again after the end replays
/// the same signal instead of running the traversal again.
#[derive(Debug, Clone)]
pub(crate) enum Termination<R> {
    /// The traversal returned normally with this value.
    Exhausted(R),
    /// The traversal failed.
    Failed(Failure),
}

impl<R: Clone> Termination<R> {
    /// Turns the signal into the error the consumer reports.
    ///
    /// Replaying a failure records it in the consumer's context unless it is
    /// already the last raised error there. Whatever the producer raised into
    /// its own context along the way stays on the worker.
    pub(crate) fn replay(&self, cx: &mut ErrorContext) -> Error<R> {
        match self {
            Termination::Exhausted(result) => Error::Exhausted {
                result: result.clone(),
            },
            Termination::Failed(failure) => {
                if !cx.last().is_some_and(|last| last.same_raise(failure)) {
                    cx.record(failure);
                }
                Error::Failed(failure.clone())
            }
        }
    }
}
