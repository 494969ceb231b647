use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::adapter::Adapter;
use crate::adapter::Consumer;
use crate::adapter::Selected;
use crate::adapter::select;
use crate::config::Config;
use crate::error::Error;
use crate::error::ErrorContext;
use crate::error::Failure;
use crate::index_adapter::Indexed;
use crate::index_adapter::RandomAccess;
use crate::iter::Iter;
use crate::pool::WorkerPool;
use crate::size::Size;
use crate::size::SizeDescriptor;
use crate::yielder::Yielder;

/// A push-style traversal, captured with its target.
pub(crate) type Invoke<Y, I, R> = Arc<
    dyn Fn(&mut Yielder<'_, Y, I>) -> Result<R, Failure> + Send + Sync,
>;

pub(crate) fn invoke<Y, I, R, F>(f: F) -> Invoke<Y, I, R>
where
    F: Fn(&mut Yielder<'_, Y, I>) -> Result<R, Failure> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) type Inspect = Arc<dyn fmt::Debug + Send + Sync>;

/// Everything an enumerator knows about what it iterates. Shared by clones
/// and by derived enumerators.
pub(crate) struct Source<Y, I, R> {
    pub(crate) target: Inspect,
    pub(crate) selector: Cow<'static, str>,
    pub(crate) args: Vec<Inspect>,
    pub(crate) size: SizeDescriptor,
    pub(crate) invoke: Invoke<Y, I, R>,
    pub(crate) random_access: Option<Indexed<Y, R>>,
    pub(crate) rewind: Option<Arc<dyn Fn() + Send + Sync>>,
    pub(crate) lightweight: bool,
    pub(crate) pool: Arc<WorkerPool>,
}

impl<Y, I, R> Source<Y, I, R> {
    /// Runs the traversal to completion on the calling thread.
    pub(crate) fn traverse(
        &self,
        cx: &mut ErrorContext,
        sink: &mut dyn FnMut(Y) -> Option<I>,
    ) -> Result<R, Failure> {
        (self.invoke)(&mut Yielder::new(sink, cx))
    }
}

impl<Y, I, R> fmt::Debug for Source<Y, I, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<Enumerator: {:?}:{}", self.target, self.selector)?;
        if !self.args.is_empty() {
            f.write_str("(")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg:?}")?;
            }
            f.write_str(")")?;
        }
        f.write_str(">")
    }
}

struct Cursor<Y, I, R> {
    // Built on first use and thrown away by `rewind`. Dropping a thread
    // adapter cancels its producer.
    adapter: Option<Selected<Y, I, R>>,
    consumer: Consumer<I>,
}

impl<Y, I, R> Default for Cursor<Y, I, R> {
    fn default() -> Self {
        Cursor {
            adapter: None,
            consumer: Consumer::default(),
        }
    }
}

/// An external iterator over a push-style traversal.
///
/// An enumerator wraps a traversal that pushes elements into a callback and
/// lets the caller pull them one at a time with [`next`](Enumerator::next),
/// look ahead with [`peek`](Enumerator::peek), send a value back into the
/// traversal with [`feed`](Enumerator::feed), and start over with
/// [`rewind`](Enumerator::rewind).
///
/// * `Y` is the element type.
/// * `I` is the type of values fed back into the traversal. Each element's
///   `yield_value` call returns the value fed for it.
/// * `R` is what the traversal returns when it finishes, reported by
///   [`Error::Exhausted`].
///
/// ```
/// use nexter::Enumerator;
/// use nexter::Yielder;
///
/// let e: Enumerator<&str, (), &str> = Enumerator::from_fn(|y: &mut Yielder<_>| {
///     y.yield_value("x");
///     y.yield_value("y");
///     Ok("done")
/// });
/// assert_eq!(e.next().unwrap(), "x");
/// assert_eq!(e.peek().unwrap(), "y");
/// assert_eq!(e.next().unwrap(), "y");
/// assert_eq!(e.next().unwrap_err().into_result(), Some("done"));
/// ```
///
/// Unless the source is random access and iterated plainly, the traversal
/// runs on a worker thread from a [`WorkerPool`], suspended between elements.
/// Dropping or rewinding the enumerator unwinds the traversal and releases
/// the worker.
///
/// All operations take `&self`; an enumerator can be shared between threads,
/// and each operation on it is atomic with respect to the others.
pub struct Enumerator<Y, I = (), R = ()> {
    source: Arc<Source<Y, I, R>>,
    cursor: Mutex<Cursor<Y, I, R>>,
}

/// Configures an [`Enumerator`] over a target.
///
/// The target is what the enumerator reports in its inspection string and
/// what the traversal closure receives. The selector and arguments are kept
/// for inspection and for choosing how the enumerator iterates.
///
/// ```
/// use std::sync::Arc;
/// use nexter::Enumerator;
///
/// let words = Arc::new(String::from("a bb ccc"));
/// let e: Enumerator<usize> = Enumerator::builder(words)
///     .selector("each_len")
///     .size(3u64)
///     .build(|text: &String, y| {
///         for word in text.split(' ') {
///             y.yield_value(word.len());
///         }
///         Ok(())
///     });
/// assert_eq!(e.size().finite(), Some(3));
/// assert_eq!(e.next().unwrap(), 1);
/// assert_eq!(e.to_string(), r#"#<Enumerator: "a bb ccc":each_len>"#);
/// ```
pub struct Builder<T> {
    target: Arc<T>,
    selector: Cow<'static, str>,
    args: Vec<Inspect>,
    size: SizeDescriptor,
    rewind: Option<Arc<dyn Fn() + Send + Sync>>,
    lightweight: Option<bool>,
    pool: Option<Arc<WorkerPool>>,
}

impl<T> Builder<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    pub fn new(target: Arc<T>) -> Self {
        Builder {
            target,
            selector: Cow::Borrowed("each"),
            args: Vec::new(),
            size: SizeDescriptor::Absent,
            rewind: None,
            lightweight: None,
            pool: None,
        }
    }

    /// Names the iteration method. Defaults to `"each"`.
    pub fn selector(mut self, selector: impl Into<Cow<'static, str>>) -> Self {
        self.selector = selector.into();
        self
    }

    /// Appends an argument of the iteration method.
    pub fn arg(mut self, arg: impl fmt::Debug + Send + Sync + 'static) -> Self {
        self.args.push(Arc::new(arg));
        self
    }

    pub fn size(mut self, size: impl Into<SizeDescriptor>) -> Self {
        self.size = size.into();
        self
    }

    /// Registers a hook that [`Enumerator::rewind`] calls on the target.
    ///
    /// The hook runs after the enumerator's lock is released, so it may call
    /// back into the enumerator being rewound.
    pub fn rewind_with(
        mut self,
        hook: impl Fn(&T) + Send + Sync + 'static,
    ) -> Self {
        let target = self.target.clone();
        self.rewind = Some(Arc::new(move || hook(&*target)));
        self
    }

    /// Overrides [`Config::lightweight`] for this enumerator.
    pub fn lightweight(mut self, lightweight: bool) -> Self {
        self.lightweight = Some(lightweight);
        self
    }

    /// Runs the traversal on `pool` instead of [`WorkerPool::global`].
    pub fn pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Builds an enumerator whose traversal is `traversal`, called with the
    /// target and a [`Yielder`] each time iteration starts.
    pub fn build<Y, I, R, F>(self, traversal: F) -> Enumerator<Y, I, R>
    where
        Y: 'static,
        I: 'static,
        R: 'static,
        F: Fn(&T, &mut Yielder<'_, Y, I>) -> Result<R, Failure>
            + Send
            + Sync
            + 'static,
    {
        let target = self.target.clone();
        let invoke = invoke(move |out| traversal(&*target, out));
        self.finish(invoke, None)
    }

    /// Builds an enumerator that reads the target by position. Its size
    /// defaults to the target's current length.
    pub fn build_indexed<Y>(mut self) -> Enumerator<Y>
    where
        T: RandomAccess<Y>,
        Y: 'static,
    {
        if let SizeDescriptor::Absent = self.size {
            let target = self.target.clone();
            self.size = SizeDescriptor::lazy(move || Size::from(target.len()));
        }
        let target = self.target.clone();
        let invoke = invoke(move |out| {
            let mut index = 0;
            while let Some(value) = target.get(index) {
                out.yield_value(value);
                index += 1;
            }
            Ok(())
        });
        let indexed = Indexed {
            seq: self.target.clone(),
            finish: Arc::new(|| ()),
        };
        self.finish(invoke, Some(indexed))
    }

    fn finish<Y, I, R>(
        self,
        invoke: Invoke<Y, I, R>,
        random_access: Option<Indexed<Y, R>>,
    ) -> Enumerator<Y, I, R> {
        let config = Config::global();
        Enumerator::from_source(Source {
            target: self.target,
            selector: self.selector,
            args: self.args,
            size: self.size,
            invoke,
            random_access,
            rewind: self.rewind,
            lightweight: self.lightweight.unwrap_or(config.lightweight),
            pool: self.pool.unwrap_or_else(WorkerPool::global),
        })
    }
}

impl<T: fmt::Debug> fmt::Debug for Builder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("target", &self.target)
            .field("selector", &self.selector)
            .field("args", &self.args)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

// Inspection target of enumerators built from a bare closure.
struct Generator;

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("#<Generator>")
    }
}

impl Enumerator<(), (), ()> {
    /// Starts configuring an enumerator over `target`.
    pub fn builder<T>(target: Arc<T>) -> Builder<T>
    where
        T: fmt::Debug + Send + Sync + 'static,
    {
        Builder::new(target)
    }
}

impl<Y> Enumerator<Y>
where
    Y: Clone + Send + 'static,
{
    /// An enumerator over a random-access sequence.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use nexter::Enumerator;
    ///
    /// let e = Enumerator::over(Arc::new(vec![1, 2, 3]));
    /// assert_eq!(e.size().finite(), Some(3));
    /// assert_eq!(e.next().unwrap(), 1);
    /// assert_eq!(e.to_string(), "#<Enumerator: [1, 2, 3]:each>");
    /// ```
    pub fn over<T>(target: Arc<T>) -> Self
    where
        T: RandomAccess<Y> + fmt::Debug + 'static,
    {
        Builder::new(target).build_indexed()
    }

    /// An enumerator over the iterators `make` returns. Each traversal,
    /// including the first after every rewind, calls `make` again.
    pub fn from_iter<F, It>(make: F) -> Self
    where
        F: Fn() -> It + Send + Sync + 'static,
        It: IntoIterator<Item = Y>,
    {
        Builder::new(Arc::new(Generator)).build(move |_, out| {
            out.yield_all(make());
            Ok(())
        })
    }
}

impl<Y, I, R> Enumerator<Y, I, R>
where
    Y: Send + 'static,
    I: Send + 'static,
    R: Send + 'static,
{
    /// An enumerator over a traversal that is not tied to a target.
    pub fn from_fn<F>(traversal: F) -> Self
    where
        F: Fn(&mut Yielder<'_, Y, I>) -> Result<R, Failure>
            + Send
            + Sync
            + 'static,
    {
        Builder::new(Arc::new(Generator)).build(move |_, out| traversal(out))
    }
}

impl<Y, I, R> Enumerator<Y, I, R> {
    pub(crate) fn from_source(source: Source<Y, I, R>) -> Self {
        Enumerator {
            source: Arc::new(source),
            cursor: Mutex::new(Cursor::default()),
        }
    }

    pub(crate) fn source(&self) -> &Arc<Source<Y, I, R>> {
        &self.source
    }

    /// The name of the iteration method, such as `"each"`.
    pub fn selector(&self) -> &str {
        &self.source.selector
    }

    /// Resolves the size descriptor. Lazy sizes are computed again on every
    /// call.
    pub fn size(&self) -> Size {
        self.source.size.resolve()
    }

    /// The failure most recently raised on this enumerator's consumer side,
    /// including failures replayed by [`next`](Enumerator::next).
    pub fn last_error(&self) -> Option<Failure> {
        self.cursor.lock().consumer.errors.last().cloned()
    }

    /// A snapshot of the consumer's error context.
    pub fn error_context(&self) -> ErrorContext {
        self.cursor.lock().consumer.errors.clone()
    }
}

impl<Y, I, R> Enumerator<Y, I, R>
where
    Y: Clone + Send + 'static,
    I: Send + 'static,
    R: Clone + Send + 'static,
{
    fn with_adapter<T>(
        &self,
        f: impl FnOnce(&mut Selected<Y, I, R>, &mut Consumer<I>) -> T,
    ) -> T {
        let mut cursor = self.cursor.lock();
        let Cursor { adapter, consumer } = &mut *cursor;
        let adapter = adapter.get_or_insert_with(|| select(&self.source));
        f(adapter, consumer)
    }

    /// Returns the next element and advances past it.
    ///
    /// After the last element this returns [`Error::Exhausted`] carrying the
    /// traversal's return value, or [`Error::Failed`] if the traversal
    /// failed, and keeps returning it until the enumerator is rewound.
    pub fn next(&self) -> Result<Y, Error<R>> {
        self.with_adapter(|adapter, consumer| adapter.next(consumer))
    }

    /// Returns the next element without advancing. Fails exactly as
    /// [`next`](Enumerator::next) would.
    pub fn peek(&self) -> Result<Y, Error<R>> {
        self.with_adapter(|adapter, consumer| adapter.peek(consumer))
    }

    /// Returns `true` if [`next`](Enumerator::next) would return an element.
    /// This may run the traversal up to its next element.
    pub fn has_next(&self) -> bool {
        self.with_adapter(|adapter, consumer| adapter.has_next(consumer))
    }

    /// Sets the value the traversal's current `yield_value` call returns
    /// when the traversal is resumed.
    ///
    /// The value is delivered by the next [`next`](Enumerator::next) or
    /// [`peek`](Enumerator::peek) that resumes the traversal. Feeding again
    /// before that fails with [`Error::FeedAlreadySet`].
    pub fn feed(&self, value: I) -> Result<(), Error<R>> {
        self.with_adapter(|adapter, consumer| {
            adapter.start(consumer)?;
            if consumer.feed.is_some() {
                return Err(Error::FeedAlreadySet);
            }
            consumer.feed = Some(value);
            Ok(())
        })
    }

    /// Starts iteration over from the beginning.
    ///
    /// Releases the running traversal, drops any pending fed value, then
    /// calls the target's rewind hook if one was registered.
    pub fn rewind(&self) -> &Self {
        {
            let mut cursor = self.cursor.lock();
            if let Some(mut adapter) = cursor.adapter.take() {
                adapter.shutdown();
            }
            cursor.consumer.feed = None;
        }
        if let Some(hook) = &self.source.rewind {
            hook();
        }
        self
    }

    /// Iterates the remaining elements as a Rust iterator.
    pub fn iter(&self) -> Iter<'_, Y, I, R> {
        Iter::new(self)
    }
}

impl<Y, I, R> Enumerator<Y, I, R> {
    /// Runs the whole traversal on the calling thread, calling `f` for each
    /// element. Whatever `f` returns is what the traversal's `yield_value`
    /// returns. Independent of [`next`](Enumerator::next) and friends.
    pub fn each(&self, mut f: impl FnMut(Y) -> Option<I>) -> Result<R, Failure> {
        self.traverse_eagerly(&mut f)
    }

    /// Like [`each`](Enumerator::each), for callbacks that feed nothing back.
    pub fn for_each(&self, mut f: impl FnMut(Y)) -> Result<R, Failure> {
        self.traverse_eagerly(&mut |value| {
            f(value);
            None
        })
    }

    fn traverse_eagerly(
        &self,
        sink: &mut dyn FnMut(Y) -> Option<I>,
    ) -> Result<R, Failure> {
        self.eagerly(|source, cx| source.traverse(cx, sink))
    }

    /// Runs `run` against the source with the consumer's error context, on
    /// the calling thread.
    pub(crate) fn eagerly<T>(
        &self,
        run: impl FnOnce(&Source<Y, I, R>, &mut ErrorContext) -> T,
    ) -> T {
        // The traversal may call back into this enumerator, so the lock is
        // not held while it runs.
        let mut cx = self.cursor.lock().consumer.errors.clone();
        let result = run(&self.source, &mut cx);
        self.cursor.lock().consumer.errors = cx;
        result
    }
}

/// A copy shares the source but starts at the beginning, with nothing fed.
impl<Y, I, R> Clone for Enumerator<Y, I, R> {
    fn clone(&self) -> Self {
        Enumerator {
            source: self.source.clone(),
            cursor: Mutex::new(Cursor::default()),
        }
    }
}

impl<Y, I, R> fmt::Debug for Enumerator<Y, I, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.source, f)
    }
}

impl<Y, I, R> fmt::Display for Enumerator<Y, I, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.source, f)
    }
}
