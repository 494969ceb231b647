use std::borrow::Cow;

use crate::error::ErrorContext;
use crate::error::Failure;

/// The callback handed to a push-style traversal.
///
/// A traversal calls [`Yielder::yield_value`] once per element, in order. The
/// return value is whatever the consumer fed back for that element with
/// [`Enumerator::feed`](crate::Enumerator::feed), or `None` if nothing was
/// fed. Eager traversals such as [`Enumerator::each`](crate::Enumerator::each)
/// return the callback's own result instead.
///
/// When an enumerator is rewound or dropped while its traversal is suspended
/// inside `yield_value`, the call does not return: the traversal is unwound
/// and its worker released. Traversals should therefore not wrap
/// `yield_value` in `catch_unwind`.
pub struct Yielder<'a, Y, I = ()> {
    sink: &'a mut dyn FnMut(Y) -> Option<I>,
    context: &'a mut ErrorContext,
}

impl<'a, Y, I> Yielder<'a, Y, I> {
    pub(crate) fn new(
        sink: &'a mut dyn FnMut(Y) -> Option<I>,
        context: &'a mut ErrorContext,
    ) -> Self {
        Yielder { sink, context }
    }

    /// Delivers one element and returns the value fed back for it.
    pub fn yield_value(&mut self, value: Y) -> Option<I> {
        (self.sink)(value)
    }

    /// Delivers every element of `values`, discarding fed values.
    pub fn yield_all(&mut self, values: impl IntoIterator<Item = Y>) {
        for value in values {
            self.yield_value(value);
        }
    }

    /// Raises a failure on the producer's side. Return it as `Err(..)` from
    /// the traversal to end iteration with that failure.
    pub fn raise(
        &mut self,
        kind: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Failure {
        self.context.raise(kind, message)
    }

    /// The producer's error context.
    pub fn context(&self) -> &ErrorContext {
        self.context
    }

    pub(crate) fn parts(
        &mut self,
    ) -> (&mut (dyn FnMut(Y) -> Option<I> + 'a), &mut ErrorContext) {
        (&mut *self.sink, &mut *self.context)
    }
}
