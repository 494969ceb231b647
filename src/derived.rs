//! Enumerators layered over another enumerator's traversal.
//!
//! A derived enumerator's target is its parent, so it inspects as the parent
//! wrapped in another `#<Enumerator: ...>`. Its traversal runs the parent's
//! traversal, on whatever thread the derived enumerator itself runs on, and
//! reshapes the elements on the way through.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::enumerator::Enumerator;
use crate::enumerator::Inspect;
use crate::enumerator::Invoke;
use crate::enumerator::Source;
use crate::enumerator::invoke;
use crate::error::Error;
use crate::error::ErrorContext;
use crate::error::Failure;
use crate::size::Size;
use crate::size::SizeDescriptor;

impl<Y, I, R> Enumerator<Y, I, R>
where
    Y: Send + 'static,
    I: Send + 'static,
    R: Send + 'static,
{
    /// Pairs each element with its index, counting from `offset`.
    ///
    /// The index wraps around past `i64::MAX`.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use nexter::Enumerator;
    ///
    /// let e = Enumerator::over(Arc::new(vec!["a", "b"])).with_index(5);
    /// assert_eq!(e.next().unwrap(), ("a", 5));
    /// assert_eq!(e.next().unwrap(), ("b", 6));
    /// assert!(e.next().unwrap_err().is_exhausted());
    /// ```
    pub fn with_index(&self, offset: i64) -> Enumerator<(Y, i64), I, R> {
        self.numbered("with_index", vec![Arc::new(offset) as Inspect], offset)
    }

    /// Pairs each element with its index, counting from zero.
    pub fn each_with_index(&self) -> Enumerator<(Y, i64), I, R> {
        self.numbered("each_with_index", Vec::new(), 0)
    }

    /// Calls `f` with each element and its index, counting from `offset`.
    /// What `f` returns is fed back into the traversal for that element.
    pub fn for_each_with_index(
        &self,
        offset: i64,
        mut f: impl FnMut(Y, i64) -> Option<I>,
    ) -> Result<R, Failure> {
        self.eagerly(|source, cx| {
            number(source, offset, cx, |(value, index)| f(value, index))
        })
    }

    /// Pairs each element with a clone of `memo`. The derived traversal
    /// returns the memo when it finishes.
    pub fn with_object<M>(&self, memo: M) -> Enumerator<(Y, M), I, M>
    where
        M: Clone + fmt::Debug + Send + Sync + 'static,
    {
        let parent = self.source().clone();
        let arg = memo.clone();
        let invoke: Invoke<(Y, M), I, M> = invoke(move |out| {
            let (emit, cx) = out.parts();
            pair(&parent, memo.clone(), cx, emit)
        });
        self.derive(
            "each_with_object",
            vec![Arc::new(arg) as Inspect],
            self.derived_size(|size| size),
            invoke,
        )
    }

    /// Calls `f` with each element and the memo, then returns the memo.
    pub fn for_each_with_object<M>(
        &self,
        mut memo: M,
        mut f: impl FnMut(Y, &mut M),
    ) -> Result<M, Failure> {
        self.eagerly(|source, cx| {
            source.traverse(cx, &mut |value| {
                f(value, &mut memo);
                None
            })
        })?;
        Ok(memo)
    }

    /// Groups the elements into chunks of `n`. The last chunk holds whatever
    /// is left and may be shorter.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use nexter::Enumerator;
    ///
    /// let e = Enumerator::over(Arc::new(vec![1, 2, 3, 4, 5]))
    ///     .each_slice(2)
    ///     .unwrap();
    /// assert_eq!(e.size().finite(), Some(3));
    /// assert_eq!(e.next().unwrap(), [1, 2]);
    /// assert_eq!(e.next().unwrap(), [3, 4]);
    /// assert_eq!(e.next().unwrap(), [5]);
    /// ```
    pub fn each_slice(
        &self,
        n: usize,
    ) -> Result<Enumerator<Vec<Y>, I, ()>, Error<R>> {
        if n == 0 {
            return Err(Error::InvalidSize);
        }
        let parent = self.source().clone();
        let invoke: Invoke<Vec<Y>, I, ()> = invoke(move |out| {
            let (emit, cx) = out.parts();
            slices(&parent, n, cx, emit)
        });
        Ok(self.derive(
            "each_slice",
            vec![Arc::new(n) as Inspect],
            self.derived_size(move |size| size.slices(n)),
            invoke,
        ))
    }

    /// Calls `f` with each chunk of `n` elements.
    pub fn for_each_slice(
        &self,
        n: usize,
        mut f: impl FnMut(Vec<Y>),
    ) -> Result<(), Error<R>> {
        if n == 0 {
            return Err(Error::InvalidSize);
        }
        self.eagerly(|source, cx| {
            slices(source, n, cx, |group| {
                f(group);
                None
            })
        })?;
        Ok(())
    }

    fn numbered(
        &self,
        selector: &'static str,
        args: Vec<Inspect>,
        offset: i64,
    ) -> Enumerator<(Y, i64), I, R> {
        let parent = self.source().clone();
        let invoke: Invoke<(Y, i64), I, R> = invoke(move |out| {
            let (emit, cx) = out.parts();
            number(&parent, offset, cx, emit)
        });
        self.derive(selector, args, self.derived_size(|size| size), invoke)
    }

    fn derived_size(
        &self,
        f: impl Fn(Size) -> Size + Send + Sync + 'static,
    ) -> SizeDescriptor {
        let parent = self.source().clone();
        SizeDescriptor::lazy(move || f(parent.size.resolve()))
    }

    fn derive<Y2, R2>(
        &self,
        selector: &'static str,
        args: Vec<Inspect>,
        size: SizeDescriptor,
        invoke: Invoke<Y2, I, R2>,
    ) -> Enumerator<Y2, I, R2> {
        let parent = self.source();
        Enumerator::from_source(Source {
            target: parent.clone(),
            selector: Cow::Borrowed(selector),
            args,
            size,
            invoke,
            random_access: None,
            rewind: parent.rewind.clone(),
            lightweight: parent.lightweight,
            pool: parent.pool.clone(),
        })
    }
}

impl<Y, I, R> Enumerator<Y, I, R>
where
    Y: Clone + Send + 'static,
    I: Send + 'static,
    R: Send + 'static,
{
    /// Slides a window of `n` elements over the traversal, one element at a
    /// time. Fewer than `n` elements produce no windows at all.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use nexter::Enumerator;
    ///
    /// let e = Enumerator::over(Arc::new(vec![1, 2, 3])).each_cons(2).unwrap();
    /// assert_eq!(e.next().unwrap(), [1, 2]);
    /// assert_eq!(e.next().unwrap(), [2, 3]);
    /// assert!(!e.has_next());
    /// ```
    pub fn each_cons(
        &self,
        n: usize,
    ) -> Result<Enumerator<Vec<Y>, I, ()>, Error<R>> {
        if n == 0 {
            return Err(Error::InvalidSize);
        }
        let parent = self.source().clone();
        let invoke: Invoke<Vec<Y>, I, ()> = invoke(move |out| {
            let (emit, cx) = out.parts();
            windows(&parent, n, cx, emit)
        });
        Ok(self.derive(
            "each_cons",
            vec![Arc::new(n) as Inspect],
            self.derived_size(move |size| size.windows(n)),
            invoke,
        ))
    }

    /// Calls `f` with each window of `n` consecutive elements.
    pub fn for_each_cons(
        &self,
        n: usize,
        mut f: impl FnMut(Vec<Y>),
    ) -> Result<(), Error<R>> {
        if n == 0 {
            return Err(Error::InvalidSize);
        }
        self.eagerly(|source, cx| {
            windows(source, n, cx, |window| {
                f(window);
                None
            })
        })?;
        Ok(())
    }
}

fn number<Y, I, R>(
    parent: &Source<Y, I, R>,
    offset: i64,
    cx: &mut ErrorContext,
    mut emit: impl FnMut((Y, i64)) -> Option<I>,
) -> Result<R, Failure> {
    let mut index = offset;
    parent.traverse(cx, &mut |value| {
        let fed = emit((value, index));
        index = index.wrapping_add(1);
        fed
    })
}

fn pair<Y, I, R, M: Clone>(
    parent: &Source<Y, I, R>,
    memo: M,
    cx: &mut ErrorContext,
    mut emit: impl FnMut((Y, M)) -> Option<I>,
) -> Result<M, Failure> {
    parent.traverse(cx, &mut |value| emit((value, memo.clone())))?;
    Ok(memo)
}

// Fed values of the groups are dropped: no single parent element owns them.
fn slices<Y, I, R>(
    parent: &Source<Y, I, R>,
    n: usize,
    cx: &mut ErrorContext,
    mut emit: impl FnMut(Vec<Y>) -> Option<I>,
) -> Result<(), Failure> {
    // `n` may be far larger than the parent ever yields.
    let mut group = Vec::new();
    parent.traverse(cx, &mut |value| {
        group.push(value);
        if group.len() == n {
            emit(std::mem::take(&mut group));
        }
        None
    })?;
    if !group.is_empty() {
        emit(group);
    }
    Ok(())
}

fn windows<Y: Clone, I, R>(
    parent: &Source<Y, I, R>,
    n: usize,
    cx: &mut ErrorContext,
    mut emit: impl FnMut(Vec<Y>) -> Option<I>,
) -> Result<(), Failure> {
    let mut window = VecDeque::new();
    parent.traverse(cx, &mut |value| {
        if window.len() == n {
            window.pop_front();
        }
        window.push_back(value);
        if window.len() == n {
            emit(window.iter().cloned().collect());
        }
        None
    })?;
    Ok(())
}
