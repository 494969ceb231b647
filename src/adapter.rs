use either::Either;
use either::for_both;

use crate::enumerator::Source;
use crate::error::Error;
use crate::error::ErrorContext;
use crate::index_adapter::IndexAdapter;
use crate::thread_adapter::ThreadAdapter;

/// The consumer's side of an enumerator: the pending feed value and the
/// consumer's error context.
#[derive(Debug)]
pub(crate) struct Consumer<I> {
    pub(crate) feed: Option<I>,
    pub(crate) errors: ErrorContext,
}

impl<I> Default for Consumer<I> {
    fn default() -> Self {
        Consumer {
            feed: None,
            errors: ErrorContext::default(),
        }
    }
}

/// Translates a push-style traversal into pull-style operations.
///
/// An enumerator owns at most one adapter at a time. It is built on first use
/// and thrown away by `rewind()`.
pub(crate) trait Adapter<Y, I, R> {
    /// Returns the next element and advances past it.
    fn next(&mut self, consumer: &mut Consumer<I>) -> Result<Y, Error<R>>;

    /// Returns the next element without advancing.
    fn peek(&mut self, consumer: &mut Consumer<I>) -> Result<Y, Error<R>>;

    /// Returns `true` if `next()` would produce an element. Never fails.
    fn has_next(&mut self, consumer: &mut Consumer<I>) -> bool;

    /// Gets the traversal ready to accept a feed value.
    fn start(&mut self, consumer: &Consumer<I>) -> Result<(), Error<R>>;

    /// Releases everything the traversal holds and rewinds to the start.
    fn shutdown(&mut self);
}

/// Either adapter can stand in for the other; the enumerator stores whichever
/// the selector picked.
impl<Y, I, R, A, B> Adapter<Y, I, R> for Either<A, B>
where
    A: Adapter<Y, I, R>,
    B: Adapter<Y, I, R>,
{
    fn next(&mut self, consumer: &mut Consumer<I>) -> Result<Y, Error<R>> {
        for_both!(self, adapter => adapter.next(consumer))
    }

    fn peek(&mut self, consumer: &mut Consumer<I>) -> Result<Y, Error<R>> {
        for_both!(self, adapter => adapter.peek(consumer))
    }

    fn has_next(&mut self, consumer: &mut Consumer<I>) -> bool {
        for_both!(self, adapter => adapter.has_next(consumer))
    }

    fn start(&mut self, consumer: &Consumer<I>) -> Result<(), Error<R>> {
        for_both!(self, adapter => adapter.start(consumer))
    }

    fn shutdown(&mut self) {
        for_both!(self, adapter => adapter.shutdown())
    }
}

pub(crate) type Selected<Y, I, R> =
    Either<IndexAdapter<Y, R>, ThreadAdapter<Y, I, R>>;

/// Whether a source can be iterated by indexing instead of running its
/// traversal on a worker.
pub(crate) fn direct_index_applies(
    lightweight: bool,
    random_access: bool,
    selector: &str,
    arg_count: usize,
) -> bool {
    lightweight && random_access && selector == "each" && arg_count == 0
}

/// Builds the adapter for `source`. The choice holds for the adapter's whole
/// life.
pub(crate) fn select<Y, I, R>(source: &Source<Y, I, R>) -> Selected<Y, I, R> {
    match &source.random_access {
        Some(indexed)
            if direct_index_applies(
                source.lightweight,
                true,
                &source.selector,
                source.args.len(),
            ) =>
        {
            tracing::trace!(selector = %source.selector, "direct index adapter");
            Either::Left(IndexAdapter::new(indexed.clone()))
        }
        _ => {
            tracing::trace!(selector = %source.selector, "thread adapter");
            Either::Right(ThreadAdapter::new(
                source.invoke.clone(),
                source.pool.clone(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::direct_index_applies;

    #[test]
    fn only_plain_each_over_random_access_is_indexed() {
        assert!(direct_index_applies(true, true, "each", 0));
        assert!(!direct_index_applies(false, true, "each", 0));
        assert!(!direct_index_applies(true, false, "each", 0));
        assert!(!direct_index_applies(true, true, "each_slice", 0));
        assert!(!direct_index_applies(true, true, "each", 1));
    }
}
