use std::fmt::Debug;

use crate::enumerator::Enumerator;
use crate::error::Error;

/// Extension trait providing assertion methods for testing enumerators.
///
/// Each assertion that leaves the enumerator usable returns it again, so
/// assertions chain:
///
/// ```rust
/// use std::sync::Arc;
/// use nexter::Enumerator;
/// use nexter::EnumeratorAssertions;
///
/// Enumerator::over(Arc::new(vec![1, 2]))
///     .assert_peek(1)
///     .assert_next(1)
///     .assert_next(2)
///     .assert_exhausted(());
/// ```
pub trait EnumeratorAssertions<Y, R> {
    /// Calls `next()` and asserts that it returns `expected`. Panics if the
    /// enumerator ends instead.
    fn assert_next(&self, expected: Y) -> &Self;

    /// Calls `peek()` and asserts that it returns `expected`.
    fn assert_peek(&self, expected: Y) -> &Self;

    /// Asserts that the enumerator is exhausted and that its traversal
    /// returned `expected`.
    ///
    /// ```rust
    /// use nexter::Enumerator;
    /// use nexter::EnumeratorAssertions;
    /// use nexter::Yielder;
    ///
    /// let e: Enumerator<u8, (), &str> =
    ///     Enumerator::from_fn(|y: &mut Yielder<_>| {
    ///         y.yield_value(7);
    ///         Ok("done")
    ///     });
    /// e.assert_next(7).assert_exhausted("done");
    /// ```
    fn assert_exhausted(&self, expected: R) -> &Self;

    /// Asserts that the enumerator ends with a failure of the given kind and
    /// message.
    ///
    /// ```rust
    /// use nexter::Enumerator;
    /// use nexter::EnumeratorAssertions;
    /// use nexter::Yielder;
    ///
    /// let e: Enumerator<u8> = Enumerator::from_fn(|y: &mut Yielder<_>| {
    ///     Err(y.raise("ArgumentError", "bad input"))
    /// });
    /// e.assert_failed("ArgumentError", "bad input");
    /// ```
    fn assert_failed(&self, kind: &str, message: &str) -> &Self;
}

impl<Y, I, R> EnumeratorAssertions<Y, R> for Enumerator<Y, I, R>
where
    Y: Clone + PartialEq + Debug + Send + 'static,
    I: Send + 'static,
    R: Clone + PartialEq + Debug + Send + 'static,
{
    fn assert_next(&self, expected: Y) -> &Self {
        match self.next() {
            Ok(actual) => assert_eq!(
                actual, expected,
                "expected next() to be {expected:?}, got {actual:?}"
            ),
            Err(err) => {
                panic!("expected next() to be {expected:?}, got {err:?}")
            }
        }
        self
    }

    fn assert_peek(&self, expected: Y) -> &Self {
        match self.peek() {
            Ok(actual) => assert_eq!(
                actual, expected,
                "expected peek() to be {expected:?}, got {actual:?}"
            ),
            Err(err) => {
                panic!("expected peek() to be {expected:?}, got {err:?}")
            }
        }
        self
    }

    fn assert_exhausted(&self, expected: R) -> &Self {
        match self.next() {
            Err(Error::Exhausted { result }) => assert_eq!(
                result, expected,
                "expected exhaustion with {expected:?}, got {result:?}"
            ),
            other => {
                panic!("expected exhaustion with {expected:?}, got {other:?}")
            }
        }
        self
    }

    fn assert_failed(&self, kind: &str, message: &str) -> &Self {
        match self.next() {
            Err(Error::Failed(failure)) => {
                assert_eq!(failure.kind(), kind, "unexpected kind: {failure}");
                assert_eq!(
                    failure.message(),
                    message,
                    "unexpected message: {failure}"
                );
            }
            other => panic!("expected a {kind} failure, got {other:?}"),
        }
        self
    }
}
