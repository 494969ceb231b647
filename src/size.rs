use std::fmt;
use std::sync::Arc;

/// The resolved size of an enumerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Size {
    Finite(u64),
    Infinite,
    Unknown,
}

impl Size {
    /// Returns the element count if it is known and finite.
    pub fn finite(self) -> Option<u64> {
        match self {
            Size::Finite(n) => Some(n),
            Size::Infinite | Size::Unknown => None,
        }
    }

    /// The number of groups `each_slice(n)` produces over this many
    /// elements. `n` must be positive.
    pub(crate) fn slices(self, n: usize) -> Size {
        match self {
            Size::Finite(len) => Size::Finite(len.div_ceil(n as u64)),
            other => other,
        }
    }

    /// The number of windows `each_cons(n)` produces over this many
    /// elements. `n` must be positive.
    pub(crate) fn windows(self, n: usize) -> Size {
        match self {
            Size::Finite(len) => Size::Finite(len.saturating_sub(n as u64 - 1)),
            other => other,
        }
    }
}

impl From<u64> for Size {
    fn from(n: u64) -> Self {
        Size::Finite(n)
    }
}

impl From<usize> for Size {
    fn from(n: usize) -> Self {
        Size::Finite(n as u64)
    }
}

/// How an enumerator learns its size.
///
/// Fixed sizes are given up front; lazy sizes are computed on every call to
/// [`Enumerator::size`](crate::Enumerator::size), so they can follow a
/// source that grows or shrinks.
#[derive(Clone, Default)]
pub enum SizeDescriptor {
    #[default]
    Absent,
    Fixed(u64),
    Lazy(Arc<dyn Fn() -> Size + Send + Sync>),
    Infinite,
}

impl SizeDescriptor {
    /// A size computed on demand by `f`.
    pub fn lazy(f: impl Fn() -> Size + Send + Sync + 'static) -> Self {
        SizeDescriptor::Lazy(Arc::new(f))
    }

    pub fn resolve(&self) -> Size {
        match self {
            SizeDescriptor::Absent => Size::Unknown,
            SizeDescriptor::Fixed(n) => Size::Finite(*n),
            SizeDescriptor::Lazy(f) => f(),
            SizeDescriptor::Infinite => Size::Infinite,
        }
    }
}

impl fmt::Debug for SizeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeDescriptor::Absent => f.write_str("Absent"),
            SizeDescriptor::Fixed(n) => f.debug_tuple("Fixed").field(n).finish(),
            SizeDescriptor::Lazy(_) => f.write_str("Lazy(..)"),
            SizeDescriptor::Infinite => f.write_str("Infinite"),
        }
    }
}

impl From<u64> for SizeDescriptor {
    fn from(n: u64) -> Self {
        SizeDescriptor::Fixed(n)
    }
}

impl From<Size> for SizeDescriptor {
    fn from(size: Size) -> Self {
        match size {
            Size::Finite(n) => SizeDescriptor::Fixed(n),
            Size::Infinite => SizeDescriptor::Infinite,
            Size::Unknown => SizeDescriptor::Absent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_round_up() {
        assert_eq!(Size::Finite(5).slices(2), Size::Finite(3));
        assert_eq!(Size::Finite(4).slices(2), Size::Finite(2));
        assert_eq!(Size::Finite(0).slices(3), Size::Finite(0));
        assert_eq!(Size::Infinite.slices(3), Size::Infinite);
    }

    #[test]
    fn windows_never_go_negative() {
        assert_eq!(Size::Finite(3).windows(2), Size::Finite(2));
        assert_eq!(Size::Finite(3).windows(3), Size::Finite(1));
        assert_eq!(Size::Finite(2).windows(5), Size::Finite(0));
        assert_eq!(Size::Unknown.windows(2), Size::Unknown);
    }

    #[test]
    fn lazy_descriptor_is_recomputed() {
        use std::sync::atomic::{AtomicU64, Ordering};
        let counter = Arc::new(AtomicU64::new(0));
        let c = counter.clone();
        let descriptor = SizeDescriptor::lazy(move || {
            Size::Finite(c.fetch_add(1, Ordering::SeqCst))
        });
        assert_eq!(descriptor.resolve(), Size::Finite(0));
        assert_eq!(descriptor.resolve(), Size::Finite(1));
        assert_eq!(SizeDescriptor::Absent.resolve(), Size::Unknown);
        assert_eq!(SizeDescriptor::from(4u64).resolve().finite(), Some(4));
    }
}
