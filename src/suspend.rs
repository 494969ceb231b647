use crate::termination::Termination;

/// A message handed from the producer to the consumer.
///
/// Every value that crosses the handoff channel is tagged:
///
///   * `Yield(y)`: the producer invoked its callback with `y` and is waiting
///     to be resumed.
///   * `Return(t)`: the traversal finished, either normally or with a captured
///     failure. No further messages follow.
///
/// Because exhaustion is a variant rather than a reserved element value, an
/// element can never be mistaken for the end of iteration.
#[derive(Debug)]
pub(crate) enum Suspend<Y, R> {
    Yield(Y),
    Return(Termination<R>),
}
