use std::iter::FusedIterator;

use crate::enumerator::Enumerator;
use crate::error::Error;

/// A Rust iterator over the remaining elements of an [`Enumerator`].
///
/// Iteration continues from the enumerator's current position and advances
/// it. Exhaustion ends the iterator; any other error is yielded once, after
/// which the iterator is finished.
///
/// ```
/// use std::sync::Arc;
/// use nexter::Enumerator;
///
/// let e = Enumerator::over(Arc::new(vec![1, 2, 3]));
/// e.next().unwrap();
/// let rest: Vec<i32> = e.iter().map(Result::unwrap).collect();
/// assert_eq!(rest, [2, 3]);
/// ```
#[derive(Debug)]
pub struct Iter<'a, Y, I = (), R = ()> {
    enumerator: &'a Enumerator<Y, I, R>,
    finished: bool,
}

impl<'a, Y, I, R> Iter<'a, Y, I, R> {
    pub(crate) fn new(enumerator: &'a Enumerator<Y, I, R>) -> Self {
        Iter {
            enumerator,
            finished: false,
        }
    }
}

impl<Y, I, R> Iterator for Iter<'_, Y, I, R>
where
    Y: Clone + Send + 'static,
    I: Send + 'static,
    R: Clone + Send + 'static,
{
    type Item = Result<Y, Error<R>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.enumerator.next() {
            Ok(value) => Some(Ok(value)),
            Err(Error::Exhausted { .. }) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

impl<Y, I, R> FusedIterator for Iter<'_, Y, I, R>
where
    Y: Clone + Send + 'static,
    I: Send + 'static,
    R: Clone + Send + 'static,
{
}

impl<'a, Y, I, R> IntoIterator for &'a Enumerator<Y, I, R>
where
    Y: Clone + Send + 'static,
    I: Send + 'static,
    R: Clone + Send + 'static,
{
    type Item = Result<Y, Error<R>>;
    type IntoIter = Iter<'a, Y, I, R>;

    fn into_iter(self) -> Self::IntoIter {
        Iter::new(self)
    }
}
