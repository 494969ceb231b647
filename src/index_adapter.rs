use std::collections::VecDeque;
use std::sync::Arc;

use crate::adapter::Adapter;
use crate::adapter::Consumer;
use crate::error::Error;

/// A source whose elements can be read by position.
///
/// Random-access sources iterated with `"each"` and no arguments are indexed
/// directly by a cursor instead of running their traversal on a worker
/// thread. The length is read on every step, so a source that shrinks while
/// being iterated ends early instead of failing.
pub trait RandomAccess<Y>: Send + Sync {
    fn len(&self) -> usize;

    /// Reads the element at `index`, or `None` if it is out of bounds.
    fn get(&self, index: usize) -> Option<Y>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<Y: Clone + Send + Sync> RandomAccess<Y> for Vec<Y> {
    fn len(&self) -> usize {
        <[Y]>::len(self)
    }

    fn get(&self, index: usize) -> Option<Y> {
        <[Y]>::get(self, index).cloned()
    }
}

impl<Y: Clone + Send + Sync> RandomAccess<Y> for VecDeque<Y> {
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn get(&self, index: usize) -> Option<Y> {
        VecDeque::get(self, index).cloned()
    }
}

impl<Y: Clone + Send + Sync> RandomAccess<Y> for Box<[Y]> {
    fn len(&self) -> usize {
        <[Y]>::len(self)
    }

    fn get(&self, index: usize) -> Option<Y> {
        <[Y]>::get(self, index).cloned()
    }
}

impl<Y: Clone + Send + Sync> RandomAccess<Y> for Arc<[Y]> {
    fn len(&self) -> usize {
        <[Y]>::len(self)
    }

    fn get(&self, index: usize) -> Option<Y> {
        <[Y]>::get(self, index).cloned()
    }
}

/// What the direct-index adapter needs from a source: the elements, and the
/// value the traversal would have returned at the end.
pub(crate) struct Indexed<Y, R> {
    pub(crate) seq: Arc<dyn RandomAccess<Y>>,
    pub(crate) finish: Arc<dyn Fn() -> R + Send + Sync>,
}

impl<Y, R> Clone for Indexed<Y, R> {
    fn clone(&self) -> Self {
        Indexed {
            seq: self.seq.clone(),
            finish: self.finish.clone(),
        }
    }
}

/// Walks a random-access source with a cursor on the consumer's own thread.
pub(crate) struct IndexAdapter<Y, R> {
    indexed: Indexed<Y, R>,
    cursor: usize,
}

impl<Y, R> IndexAdapter<Y, R> {
    pub(crate) fn new(indexed: Indexed<Y, R>) -> Self {
        IndexAdapter { indexed, cursor: 0 }
    }

    fn current(&self) -> Result<Y, Error<R>> {
        if self.cursor >= self.indexed.seq.len() {
            return Err(self.exhausted());
        }
        self.indexed
            .seq
            .get(self.cursor)
            .ok_or_else(|| self.exhausted())
    }

    fn exhausted(&self) -> Error<R> {
        Error::Exhausted {
            result: (self.indexed.finish)(),
        }
    }
}

impl<Y, I, R> Adapter<Y, I, R> for IndexAdapter<Y, R> {
    fn next(&mut self, consumer: &mut Consumer<I>) -> Result<Y, Error<R>> {
        // There is no producer to deliver a fed value to.
        consumer.feed = None;
        let value = self.current()?;
        self.cursor += 1;
        Ok(value)
    }

    fn peek(&mut self, _: &mut Consumer<I>) -> Result<Y, Error<R>> {
        self.current()
    }

    fn has_next(&mut self, _: &mut Consumer<I>) -> bool {
        self.cursor < self.indexed.seq.len()
    }

    fn start(&mut self, _: &Consumer<I>) -> Result<(), Error<R>> {
        Ok(())
    }

    fn shutdown(&mut self) {
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;

    struct Shrinking(RwLock<Vec<u32>>);

    impl RandomAccess<u32> for Shrinking {
        fn len(&self) -> usize {
            self.0.read().len()
        }

        fn get(&self, index: usize) -> Option<u32> {
            <[u32]>::get(&self.0.read(), index).copied()
        }
    }

    fn adapter<T>(seq: T) -> IndexAdapter<u32, &'static str>
    where
        T: RandomAccess<u32> + 'static,
    {
        IndexAdapter::new(Indexed {
            seq: Arc::new(seq),
            finish: Arc::new(|| "end"),
        })
    }

    #[test]
    fn walks_and_reports_the_finish_value() {
        let mut a = adapter(vec![1, 2]);
        let mut c = Consumer::<()>::default();
        assert_eq!(a.peek(&mut c).unwrap(), 1);
        assert_eq!(a.next(&mut c).unwrap(), 1);
        assert_eq!(a.next(&mut c).unwrap(), 2);
        assert!(!a.has_next(&mut c));
        assert_eq!(a.next(&mut c).unwrap_err().into_result(), Some("end"));
        assert_eq!(a.peek(&mut c).unwrap_err().into_result(), Some("end"));
    }

    #[test]
    fn next_discards_a_pending_feed() {
        let mut a = adapter(vec![1]);
        let mut c = Consumer::default();
        c.feed = Some(9);
        a.next(&mut c).unwrap();
        assert_eq!(c.feed, None);
    }

    #[test]
    fn shrinking_source_ends_early() {
        let shared = Arc::new(Shrinking(RwLock::new(vec![1, 2, 3])));
        let mut a = IndexAdapter::<u32, ()>::new(Indexed {
            seq: shared.clone(),
            finish: Arc::new(|| ()),
        });
        let mut c = Consumer::<()>::default();
        assert_eq!(a.next(&mut c).unwrap(), 1);
        shared.0.write().truncate(1);
        assert!(!a.has_next(&mut c));
        assert!(a.next(&mut c).unwrap_err().is_exhausted());
    }

    #[test]
    fn shutdown_rewinds_the_cursor() {
        let mut a = adapter(VecDeque::from(vec![4, 5]));
        let mut c = Consumer::<()>::default();
        a.next(&mut c).unwrap();
        Adapter::<u32, (), &str>::shutdown(&mut a);
        assert_eq!(a.next(&mut c).unwrap(), 4);
    }
}
