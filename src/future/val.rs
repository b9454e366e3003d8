//! The future value and its completer.
//!
//! Each future owns a core holding a write-once outcome, a completion signal
//! and, behind a mutex, the link to at most one continuation. Completing the
//! outcome and deciding whether a continuation runs now or later both happen
//! under that mutex, so a continuation observes the same final outcome no
//! matter when it was attached. User code never runs while the mutex is held.

use std::{fmt, mem, thread};
use std::thread::ThreadId;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use log::{trace, warn};
use crate::{Either, Error};
use crate::run::{Run, ThreadRun};
use crate::sync::Signal;
use super::cancel::CancelHook;
use super::outcome::{Outcome, OutcomeCell};

/// Executor shared by a future and every continuation chained from it.
pub(crate) type Runner = Arc<dyn Run + Send + Sync>;

/// Work to run once a parent future's outcome is final.
///
/// Dropping a continuation without running it rejects the future it feeds
/// with `Error::Abandoned`.
pub(crate) trait Continue<T>: Send {
    /// Runs the continuation, returning the work it unblocked.
    fn run(self: Box<Self>, res: &Result<T, Error>) -> Option<Step>;

    /// Drops the continuation, leaving the future it feeds pending.
    fn detach(self: Box<Self>);
}

pub(crate) type Continuation<T> = Box<dyn Continue<T>>;

/// Continuation work unblocked by completing a future.
///
/// Completing a future hands back the next link's work instead of running
/// it, and `drive` runs the links in a loop, so the length of a chain is not
/// bounded by the stack.
pub(crate) struct Step(Box<dyn FnOnce() -> Option<Step> + Send>);

impl Step {
    pub(crate) fn new<F>(f: F) -> Step
        where F: FnOnce() -> Option<Step> + Send + 'static
    {
        Step(Box::new(f))
    }
}

/// Runs `next` and everything it unblocks on the calling thread.
pub(crate) fn drive(mut next: Option<Step>) {
    while let Some(Step(f)) = next {
        next = f();
    }
}

/// Returns a pending future along with the completer that completes it.
///
/// Continuations attached after completion run on a new thread.
pub fn pair<T>() -> (Future<T>, Completer<T>) {
    let core = Arc::new(Core::new(default_runner(), None));

    let f = Future::new(core.clone());
    let c = Completer::new(core);

    (f, c)
}

/// A value which becomes available at some point, or the error explaining
/// why it could not be produced.
///
/// Handles are cheap to clone and all refer to the same value.
pub struct Future<T> {
    pub(crate) core: Arc<Core<T>>,
}

impl<T> Future<T> {
    // Initializes a new Future with the given core
    pub(crate) fn new(core: Arc<Core<T>>) -> Future<T> {
        Future { core }
    }

    /// Whether or not the outcome is final.
    pub fn is_complete(&self) -> bool {
        self.core.outcome.is_final()
    }
}

impl<T: Send + Sync + 'static> Future<T> {
    /// Creates a future and starts `producer` on a new thread.
    pub fn create<F>(producer: F) -> Future<T>
        where F: FnOnce(Completer<T>) + Send + 'static
    {
        Future::start(default_runner(), producer)
    }

    /// Creates a future and hands `producer` to `runner`. Continuations
    /// chained from the returned future use the same runner.
    pub fn create_on<R, F>(runner: R, producer: F) -> Future<T>
        where R: Run + Send + Sync + 'static,
              F: FnOnce(Completer<T>) + Send + 'static,
    {
        Future::start(Arc::new(runner), producer)
    }

    /// Returns an already resolved future.
    pub fn resolved(val: T) -> Future<T> {
        let (f, c) = pair();
        c.resolve(val);
        f
    }

    /// Returns an already rejected future.
    pub fn rejected(err: Error) -> Future<T> {
        let (f, c) = pair();
        c.reject(err);
        f
    }

    fn start<F>(runner: Runner, producer: F) -> Future<T>
        where F: FnOnce(Completer<T>) + Send + 'static
    {
        let core = Arc::new(Core::new(runner.clone(), None));
        let mut completer = Completer::new(core.clone());

        runner.run(Box::new(move || {
            let core = completer.core.clone();

            // A panic unwinding through the producer is caught below, which
            // rejects with the panic's own message.
            completer.caught_on = Some(thread::current().id());

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || producer(completer))) {
                let err = Error::from_panic(payload);
                warn!("future producer panicked; err={}", err);
                core.complete(Err(err));
            }
        }));

        Future::new(core)
    }
}

impl<T: Clone> Future<T> {
    /// Blocks until the outcome is final and returns it.
    ///
    /// Any number of threads may collect the same future; all observe the
    /// same outcome.
    pub fn collect(&self) -> Result<T, Error> {
        loop {
            if let Some(res) = self.core.outcome.get() {
                return res.clone();
            }

            self.core.signal.wait();
        }
    }

    /// Returns the outcome if it is final, without blocking.
    pub fn try_collect(&self) -> Option<Result<T, Error>> {
        self.core.outcome.get().cloned()
    }

    /// Blocks until the outcome is final or the timeout elapses.
    pub fn collect_timeout(&self, timeout: Duration) -> Option<Result<T, Error>> {
        self.core.signal.wait_timeout(timeout);
        self.try_collect()
    }

    /// Snapshot of the current outcome.
    pub fn outcome(&self) -> Outcome<T> {
        self.core.outcome.snapshot()
    }

    pub fn to_result(&self) -> Result<T, Error> {
        self.collect()
    }

    /// Blocks for the outcome, placing a failure on the left.
    pub fn to_either(&self) -> Either<Error, T> {
        self.collect().into()
    }

    /// Blocks for the outcome, discarding a failure.
    pub fn to_option(&self) -> Option<T> {
        self.collect().ok()
    }
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Future<T> {
        Future::new(self.core.clone())
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let state = match self.core.outcome.get() {
            None => "pending",
            Some(Ok(_)) => "resolved",
            Some(Err(_)) => "rejected",
        };

        write!(fmt, "Future {{ {} }}", state)
    }
}

/// Completes a future.
///
/// Only the first call to `resolve` or `reject` has an effect. Dropping the
/// completer before either is called rejects the future.
pub struct Completer<T> {
    pub(crate) core: Arc<Core<T>>,
    // Thread on which a producer wrapper catches panics for this completer
    caught_on: Option<ThreadId>,
}

impl<T> Completer<T> {
    // Initializes a new Completer with the given core
    fn new(core: Arc<Core<T>>) -> Completer<T> {
        Completer { core, caught_on: None }
    }

    /// Resolves the future with `val`. Returns false if the future was
    /// already complete.
    pub fn resolve(&self, val: T) -> bool {
        self.core.complete(Ok(val))
    }

    /// Rejects the future with `err`. Returns false if the future was
    /// already complete.
    pub fn reject(&self, err: Error) -> bool {
        self.core.complete(Err(err))
    }

    /// Completes the future from a `Result`.
    pub fn complete(&self, res: Result<T, Error>) -> bool {
        self.core.complete(res)
    }

    pub fn is_complete(&self) -> bool {
        self.core.outcome.is_final()
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if self.core.outcome.is_final() {
            return;
        }

        let err = if thread::panicking() {
            if self.caught_on == Some(thread::current().id()) {
                // The producer wrapper rejects with the payload
                return;
            }

            Error::Panicked("producer panicked".to_string())
        } else {
            Error::Abandoned
        };

        if self.core.complete(Err(err)) {
            trace!("completer dropped before completion");
        }
    }
}

impl<T> fmt::Debug for Completer<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "Completer")
    }
}

pub(crate) struct Core<T> {
    pub(crate) state: Mutex<State<T>>,
    pub(crate) outcome: OutcomeCell<T>,
    pub(crate) signal: Signal,
    pub(crate) runner: Runner,
}

pub(crate) struct State<T> {
    pub(crate) link: Link<T>,
    pub(crate) on_cancel: Option<CancelHook>,
}

/// The continuation slot of a future.
pub(crate) enum Link<T> {
    // No continuation attached yet
    Vacant,
    // Waiting for the outcome
    Attached(Continuation<T>),
    // Handed off to run
    Fired,
    // Cancelled before the continuation ran
    Severed,
}

impl<T> Core<T> {
    pub(crate) fn new(runner: Runner, on_cancel: Option<CancelHook>) -> Core<T> {
        Core {
            state: Mutex::new(State {
                link: Link::Vacant,
                on_cancel,
            }),
            outcome: OutcomeCell::new(),
            signal: Signal::new(),
            runner,
        }
    }

    /// Stores the final outcome, wakes observers and then runs the attached
    /// continuation, if any, on the calling thread.
    pub(crate) fn complete(&self, res: Result<T, Error>) -> bool {
        let next = match self.settle(res) {
            Some(next) => next,
            None => return false,
        };

        if let (Some(next), Some(res)) = (next, self.outcome.get()) {
            drive(next.run(res));
        }

        true
    }

    /// Stores the final outcome and wakes observers. The attached
    /// continuation is handed back rather than run. Returns `None` if the
    /// outcome was already final.
    pub(crate) fn settle(&self, res: Result<T, Error>) -> Option<Option<Continuation<T>>> {
        let (next, hook) = {
            let mut state = self.lock();

            if !self.outcome.put(res) {
                trace!("future already complete; ignoring");
                return None;
            }

            let next = match mem::replace(&mut state.link, Link::Vacant) {
                Link::Attached(next) => {
                    state.link = Link::Fired;
                    Some(next)
                }
                other => {
                    state.link = other;
                    None
                }
            };

            // Cancelling a complete future does nothing
            (next, state.on_cancel.take())
        };

        trace!("future complete; has_continuation={}", next.is_some());

        drop(hook);
        self.signal.fire();

        Some(next)
    }

    // Nothing is left half-updated under the lock, so poisoning is ignored.
    pub(crate) fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn default_runner() -> Runner {
    Arc::new(ThreadRun::default())
}
