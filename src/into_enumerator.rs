use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::enumerator::Enumerator;

/// Implemented by collections that can be turned into an enumerator over
/// their elements.
///
/// The resulting enumerator is random access, so with the default
/// configuration it is indexed directly and never starts a worker thread.
///
/// ```
/// use nexter::IntoEnumerator;
///
/// let e = vec!['a', 'b'].into_enumerator();
/// assert_eq!(e.next().unwrap(), 'a');
/// assert_eq!(e.size().finite(), Some(2));
/// ```
pub trait IntoEnumerator<Y> {
    fn into_enumerator(self) -> Enumerator<Y>;
}

impl<Y> IntoEnumerator<Y> for Vec<Y>
where
    Y: Clone + fmt::Debug + Send + Sync + 'static,
{
    fn into_enumerator(self) -> Enumerator<Y> {
        Enumerator::over(Arc::new(self))
    }
}

impl<Y> IntoEnumerator<Y> for VecDeque<Y>
where
    Y: Clone + fmt::Debug + Send + Sync + 'static,
{
    fn into_enumerator(self) -> Enumerator<Y> {
        Enumerator::over(Arc::new(self))
    }
}

impl<Y> IntoEnumerator<Y> for Arc<[Y]>
where
    Y: Clone + fmt::Debug + Send + Sync + 'static,
{
    fn into_enumerator(self) -> Enumerator<Y> {
        Enumerator::over(Arc::new(self))
    }
}
