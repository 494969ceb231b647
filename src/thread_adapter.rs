use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use crossbeam_channel::select;

use crate::adapter::Adapter;
use crate::adapter::Consumer;
use crate::enumerator::Invoke;
use crate::error::Error;
use crate::error::ErrorContext;
use crate::error::Failure;
use crate::pool::WorkerPool;
use crate::suspend::Suspend;
use crate::termination::Termination;
use crate::unwind;
use crate::unwind::Caught;
use crate::void::Void;
use crate::yielder::Yielder;

/// Where the producer is in its traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum ProducerState {
    NotStarted = 0,
    Running = 1,
    /// Offering an element or the termination to the consumer.
    BeforeHandoff = 2,
    /// Handed an element over and waiting to be resumed.
    AwaitingResume = 3,
    Terminated = 4,
}

impl ProducerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ProducerState::NotStarted,
            1 => ProducerState::Running,
            2 => ProducerState::BeforeHandoff,
            3 => ProducerState::AwaitingResume,
            _ => ProducerState::Terminated,
        }
    }
}

/// Flags shared between one producer and the adapter that started it.
#[derive(Debug)]
struct Shared {
    alive: AtomicBool,
    state: AtomicU8,
}

impl Shared {
    fn new() -> Self {
        Shared {
            alive: AtomicBool::new(true),
            state: AtomicU8::new(ProducerState::NotStarted as u8),
        }
    }

    fn alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn state(&self) -> ProducerState {
        ProducerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn enter(&self, state: ProducerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

/// The consumer's ends of the rendezvous with a running producer.
struct Link<Y, I, R> {
    yields: Receiver<Suspend<Y, R>>,
    resume: Sender<Option<I>>,
    // Never sent on. Dropping it wakes the producer wherever it blocks.
    cancel: Sender<Void>,
    // The producer has handed over an element and waits to be resumed.
    suspended: bool,
}

/// Runs the traversal on a pool worker and hands its elements over one at a
/// time.
///
/// Every handoff is a rendezvous on a zero-capacity channel, so the producer
/// never runs ahead of the consumer: after handing over an element it blocks
/// until the consumer asks for the next one, and that request carries the
/// value fed for the element, if any.
pub(crate) struct ThreadAdapter<Y, I, R> {
    invoke: Invoke<Y, I, R>,
    pool: Arc<WorkerPool>,
    shared: Arc<Shared>,
    link: Option<Link<Y, I, R>>,
    peeked: Option<Y>,
    done: Option<Termination<R>>,
}

impl<Y, I, R> ThreadAdapter<Y, I, R> {
    pub(crate) fn new(invoke: Invoke<Y, I, R>, pool: Arc<WorkerPool>) -> Self {
        ThreadAdapter {
            invoke,
            pool,
            shared: Arc::new(Shared::new()),
            link: None,
            peeked: None,
            done: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn producer_state(&self) -> ProducerState {
        self.shared.state()
    }

    /// Stops the producer, wherever it is, and releases its worker.
    fn cancel(&mut self) {
        self.shared.alive.store(false, Ordering::SeqCst);
        let Some(link) = self.link.take() else {
            return;
        };
        let Link {
            yields,
            resume,
            cancel,
            ..
        } = link;
        let state = self.shared.state();
        // First interrupt: wakes a producer blocked on either handoff.
        drop(cancel);
        // Second interrupt: a producer that raced past its liveness check
        // finds both of its channels disconnected.
        drop(yields);
        drop(resume);
        tracing::trace!(?state, "cancelled enumerator producer");
    }
}

impl<Y, I, R> ThreadAdapter<Y, I, R>
where
    Y: Send + 'static,
    I: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Pulls the next element or the termination into the local cache.
    fn fill(&mut self, consumer: &mut Consumer<I>) -> Result<(), Error<R>> {
        if self.peeked.is_some() || self.done.is_some() {
            return Ok(());
        }
        self.launch(consumer)?;
        let Some(link) = self.link.as_mut() else {
            return Err(Error::Interrupted);
        };
        if link.suspended {
            link.suspended = false;
            if link.resume.send(consumer.feed.take()).is_err() {
                return Err(Error::Interrupted);
            }
        }
        match link.yields.recv() {
            Ok(Suspend::Yield(value)) => {
                link.suspended = true;
                self.peeked = Some(value);
            }
            Ok(Suspend::Return(termination)) => {
                self.done = Some(termination);
                // The producer has finished; its channels are no longer used.
                self.link = None;
            }
            Err(_) => return Err(Error::Interrupted),
        }
        Ok(())
    }

    fn launch(&mut self, consumer: &Consumer<I>) -> Result<(), Error<R>> {
        if self.link.is_some() || self.done.is_some() {
            return Ok(());
        }
        let (yield_tx, yield_rx) = crossbeam_channel::bounded(0);
        let (resume_tx, resume_rx) = crossbeam_channel::bounded(0);
        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded(0);
        let producer = Producer {
            invoke: self.invoke.clone(),
            shared: self.shared.clone(),
            yields: yield_tx,
            resume: resume_rx,
            cancel: cancel_rx,
            errors: consumer.errors.clone(),
        };
        self.pool
            .submit(Box::new(move || producer.run()))
            .map_err(|err| {
                tracing::warn!(%err, "no worker available for enumerator");
                Error::ResourceExhausted(err.to_string())
            })?;
        self.link = Some(Link {
            yields: yield_rx,
            resume: resume_tx,
            cancel: cancel_tx,
            suspended: false,
        });
        Ok(())
    }

    fn replay(&self, consumer: &mut Consumer<I>) -> Error<R> {
        match &self.done {
            Some(termination) => termination.replay(&mut consumer.errors),
            None => Error::Interrupted,
        }
    }
}

impl<Y, I, R> Adapter<Y, I, R> for ThreadAdapter<Y, I, R>
where
    Y: Clone + Send + 'static,
    I: Send + 'static,
    R: Clone + Send + 'static,
{
    fn next(&mut self, consumer: &mut Consumer<I>) -> Result<Y, Error<R>> {
        self.fill(consumer)?;
        match self.peeked.take() {
            Some(value) => Ok(value),
            None => Err(self.replay(consumer)),
        }
    }

    fn peek(&mut self, consumer: &mut Consumer<I>) -> Result<Y, Error<R>> {
        self.fill(consumer)?;
        match &self.peeked {
            Some(value) => Ok(value.clone()),
            None => Err(self.replay(consumer)),
        }
    }

    fn has_next(&mut self, consumer: &mut Consumer<I>) -> bool {
        self.fill(consumer).is_ok() && self.peeked.is_some()
    }

    fn start(&mut self, consumer: &Consumer<I>) -> Result<(), Error<R>> {
        self.launch(consumer)
    }

    fn shutdown(&mut self) {
        self.cancel();
        self.shared = Arc::new(Shared::new());
        self.peeked = None;
        self.done = None;
    }
}

impl<Y, I, R> Drop for ThreadAdapter<Y, I, R> {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// The worker's side of the rendezvous.
struct Producer<Y, I, R> {
    invoke: Invoke<Y, I, R>,
    shared: Arc<Shared>,
    yields: Sender<Suspend<Y, R>>,
    resume: Receiver<Option<I>>,
    cancel: Receiver<Void>,
    errors: ErrorContext,
}

impl<Y, I, R> Producer<Y, I, R> {
    fn run(self) {
        if !self.shared.alive() {
            // Cancelled before the worker picked the traversal up.
            self.shared.enter(ProducerState::Terminated);
            return;
        }
        self.shared.enter(ProducerState::Running);
        tracing::trace!("enumerator producer started");
        // Raises on the worker go to a copy and never reach the consumer.
        let mut errors = self.errors.clone();
        let outcome = unwind::catch(|| {
            let mut sink = |value: Y| self.hand_over(value);
            (self.invoke)(&mut Yielder::new(&mut sink, &mut errors))
        });
        let termination = match outcome {
            Caught::Finished(Ok(result)) => Termination::Exhausted(result),
            Caught::Finished(Err(failure)) => Termination::Failed(failure),
            Caught::Panicked(payload) => {
                Termination::Failed(Failure::from_panic(payload))
            }
            Caught::Halted => {
                self.shared.enter(ProducerState::Terminated);
                tracing::trace!("enumerator producer halted");
                return;
            }
        };
        if self.shared.alive() {
            self.shared.enter(ProducerState::BeforeHandoff);
            select! {
                send(self.yields, Suspend::Return(termination)) -> _ => {},
                recv(self.cancel) -> _ => {},
            }
        }
        self.shared.enter(ProducerState::Terminated);
        tracing::trace!("enumerator producer finished");
    }

    /// Offers one element, then blocks until the consumer resumes the
    /// traversal. Does not return if the enumerator is cancelled meanwhile.
    fn hand_over(&self, value: Y) -> Option<I> {
        if !self.shared.alive() {
            unwind::halt();
        }
        self.shared.enter(ProducerState::BeforeHandoff);
        select! {
            send(self.yields, Suspend::Yield(value)) -> sent => {
                if sent.is_err() {
                    unwind::halt();
                }
            },
            recv(self.cancel) -> _ => unwind::halt(),
        }
        if !self.shared.alive() {
            unwind::halt();
        }
        self.shared.enter(ProducerState::AwaitingResume);
        let fed = select! {
            recv(self.resume) -> fed => match fed {
                Ok(fed) => fed,
                Err(_) => unwind::halt(),
            },
            recv(self.cancel) -> _ => unwind::halt(),
        };
        self.shared.enter(ProducerState::Running);
        fed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::enumerator::invoke;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;
    use std::time::Instant;

    fn pool() -> Arc<WorkerPool> {
        Arc::new(WorkerPool::new(
            PoolConfig::default().with_thread_name("adapter-test"),
        ))
    }

    fn eventually(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        condition()
    }

    // Sets its flag when dropped, which is how a test sees a traversal's
    // frames being released.
    struct Released(Arc<AtomicBool>);

    impl Drop for Released {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn counting(
        produced: Arc<AtomicUsize>,
        released: Arc<AtomicBool>,
    ) -> ThreadAdapter<usize, (), &'static str> {
        let traversal: Invoke<usize, (), &'static str> = invoke(move |out| {
            let _guard = Released(released.clone());
            for i in 0..3 {
                produced.fetch_add(1, Ordering::SeqCst);
                out.yield_value(i);
            }
            Ok("done")
        });
        ThreadAdapter::new(traversal, pool())
    }

    #[test]
    fn producer_waits_between_elements() {
        let produced = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicBool::new(false));
        let mut adapter = counting(produced.clone(), released.clone());
        let mut consumer = Consumer::default();
        assert_eq!(adapter.next(&mut consumer).unwrap(), 0);
        assert!(eventually(
            || adapter.producer_state() == ProducerState::AwaitingResume
        ));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(produced.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.next(&mut consumer).unwrap(), 1);
        assert_eq!(adapter.next(&mut consumer).unwrap(), 2);
        let err = adapter.next(&mut consumer).unwrap_err();
        assert_eq!(err.into_result(), Some("done"));
        assert!(eventually(
            || adapter.producer_state() == ProducerState::Terminated
        ));
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn cancel_while_awaiting_resume_releases_the_traversal() {
        let produced = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicBool::new(false));
        let mut adapter = counting(produced.clone(), released.clone());
        let mut consumer = Consumer::default();
        adapter.next(&mut consumer).unwrap();
        let shared = adapter.shared.clone();
        adapter.shutdown();
        assert!(eventually(|| released.load(Ordering::SeqCst)));
        assert!(eventually(|| shared.state() == ProducerState::Terminated));
        assert_eq!(produced.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_before_first_handoff_releases_the_traversal() {
        let produced = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicBool::new(false));
        let mut adapter = counting(produced.clone(), released.clone());
        let consumer = Consumer::default();
        adapter.start(&consumer).unwrap();
        assert!(eventually(
            || adapter.producer_state() == ProducerState::BeforeHandoff
        ));
        let shared = adapter.shared.clone();
        adapter.shutdown();
        assert!(eventually(|| released.load(Ordering::SeqCst)));
        assert!(eventually(|| shared.state() == ProducerState::Terminated));
    }

    #[test]
    fn cancel_while_offering_the_termination() {
        let traversal: Invoke<u8, (), u8> = invoke(|_| Ok(7));
        let mut adapter = ThreadAdapter::new(traversal, pool());
        adapter.start(&Consumer::default()).unwrap();
        assert!(eventually(
            || adapter.producer_state() == ProducerState::BeforeHandoff
        ));
        let shared = adapter.shared.clone();
        drop(adapter);
        assert!(eventually(|| shared.state() == ProducerState::Terminated));
    }

    #[test]
    fn fed_value_reaches_the_producer() {
        let (seen_tx, seen_rx) = crossbeam_channel::unbounded();
        let traversal: Invoke<u8, &'static str, ()> = invoke(move |out| {
            seen_tx.send(out.yield_value(1)).ok();
            seen_tx.send(out.yield_value(2)).ok();
            Ok(())
        });
        let mut adapter = ThreadAdapter::new(traversal, pool());
        let mut consumer = Consumer::default();
        adapter.start(&consumer).unwrap();
        consumer.feed = Some("one");
        assert_eq!(adapter.next(&mut consumer).unwrap(), 1);
        // Still pending: the producer only resumes on the following request.
        assert_eq!(consumer.feed, Some("one"));
        assert_eq!(adapter.next(&mut consumer).unwrap(), 2);
        assert_eq!(seen_rx.recv().unwrap(), Some("one"));
        assert!(adapter.next(&mut consumer).unwrap_err().is_exhausted());
        assert_eq!(seen_rx.recv().unwrap(), None);
    }

    #[test]
    fn cancel_before_the_worker_starts_skips_the_traversal() {
        let invoked = Arc::new(AtomicBool::new(false));
        let flag = invoked.clone();
        let traversal: Invoke<u8, (), ()> = invoke(move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        let (yields, _yields_rx) = crossbeam_channel::bounded(0);
        let (_resume_tx, resume) = crossbeam_channel::bounded(0);
        let (_cancel_tx, cancel) = crossbeam_channel::bounded(0);
        let shared = Arc::new(Shared::new());
        shared.alive.store(false, Ordering::SeqCst);
        Producer {
            invoke: traversal,
            shared: shared.clone(),
            yields,
            resume,
            cancel,
            errors: ErrorContext::new(),
        }
        .run();
        assert!(!invoked.load(Ordering::SeqCst));
        assert_eq!(shared.state(), ProducerState::Terminated);
    }

    #[test]
    fn cancel_while_running_halts_at_the_next_yield() {
        let (computing_tx, computing_rx) = crossbeam_channel::bounded(1);
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(1);
        let released = Arc::new(AtomicBool::new(false));
        let guard = released.clone();
        let handed_over = Arc::new(AtomicBool::new(false));
        let flag = handed_over.clone();
        let traversal: Invoke<u8, (), ()> = invoke(move |out| {
            let _guard = Released(guard.clone());
            computing_tx.send(()).ok();
            gate_rx.recv().ok();
            out.yield_value(1);
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        let mut adapter = ThreadAdapter::new(traversal, pool());
        adapter.start(&Consumer::default()).unwrap();
        computing_rx.recv().unwrap();
        assert_eq!(adapter.producer_state(), ProducerState::Running);
        let shared = adapter.shared.clone();
        adapter.shutdown();
        gate_tx.send(()).unwrap();
        assert!(eventually(|| released.load(Ordering::SeqCst)));
        assert!(eventually(|| shared.state() == ProducerState::Terminated));
        assert!(!handed_over.load(Ordering::SeqCst));
    }

    #[test]
    fn failure_is_recorded_once_on_the_consumer() {
        let traversal: Invoke<u8, (), ()> = invoke(|out| {
            out.raise("ignored", "rescued inside the traversal");
            Err(out.raise("boom", "it broke"))
        });
        let mut adapter = ThreadAdapter::new(traversal, pool());
        let mut consumer = Consumer::default();
        let before = consumer.errors.raise("earlier", "before start");
        let err = adapter.next(&mut consumer).unwrap_err();
        let failure = err.failure().unwrap().clone();
        assert!(failure.is("boom"));
        assert_eq!(consumer.errors.raised(), 2);
        assert!(consumer.errors.last().unwrap().same_raise(&failure));
        assert!(!before.same_raise(&failure));

        let again = adapter.peek(&mut consumer).unwrap_err();
        assert!(again.failure().unwrap().same_raise(&failure));
        assert_eq!(consumer.errors.raised(), 2);
    }

    #[test]
    fn consumer_raises_after_launch_survive_the_replay() {
        let traversal: Invoke<u8, (), ()> = invoke(|out| {
            out.yield_value(1);
            Err(out.raise("boom", "it broke"))
        });
        let mut adapter = ThreadAdapter::new(traversal, pool());
        let mut consumer = Consumer::default();
        assert_eq!(adapter.next(&mut consumer).unwrap(), 1);
        let meanwhile = consumer.errors.raise("local", "raised by the consumer");
        let failure = adapter.next(&mut consumer).unwrap_err();
        assert!(failure.failure().unwrap().is("boom"));
        assert_eq!(consumer.errors.raised(), 2);
        assert!(!meanwhile.same_raise(failure.failure().unwrap()));
    }
}
