use std::any::Any;
use std::panic;
use std::panic::AssertUnwindSafe;

// Marker carried by the unwind that tears down a cancelled producer. It is
// private so nothing outside this module can construct or match on it.
struct Halt;

/// Unwinds out of the traversal running on the current worker.
///
/// The unwind skips the panic hook, so nothing is printed. It is only ever
/// stopped by [`catch`], which recognizes it by type and reports
/// [`Caught::Halted`] instead of treating it as a failure.
pub(crate) fn halt() -> ! {
    panic::resume_unwind(Box::new(Halt))
}

pub(crate) enum Caught<T> {
    Finished(T),
    Halted,
    Panicked(Box<dyn Any + Send>),
}

/// Runs `f`, separating the halt unwind from ordinary panics.
pub(crate) fn catch<T>(f: impl FnOnce() -> T) -> Caught<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Caught::Finished(value),
        Err(payload) if payload.is::<Halt>() => Caught::Halted,
        Err(payload) => Caught::Panicked(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boom() -> u8 {
        panic!("boom")
    }

    #[test]
    fn halt_is_told_apart_from_panics() {
        assert!(matches!(catch(|| -> u8 { halt() }), Caught::Halted));
        assert!(matches!(catch(boom), Caught::Panicked(_)));
        assert!(matches!(catch(|| 7), Caught::Finished(7)));
    }

    #[test]
    fn halt_unwinds_through_nested_frames() {
        fn deep(n: usize) -> usize {
            if n == 0 { halt() } else { deep(n - 1) + 1 }
        }
        assert!(matches!(catch(|| deep(16)), Caught::Halted));
    }
}
