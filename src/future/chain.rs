//! Continuations: `then`, `catch` and `finally`.
//!
//! Attaching returns a new child future right away. If the parent is already
//! complete the child's work is handed to the parent's runner; otherwise it
//! is stored in the parent's link and run by whichever thread completes the
//! parent. The choice is made under the parent's lock, the same lock that
//! guards completion.

use std::sync::Arc;
use std::panic::{self, AssertUnwindSafe};
use log::{debug, warn};
use crate::Error;
use super::cancel;
use super::val::{drive, Continuation, Continue, Core, Future, Link, Step};

impl<T: Clone + Send + Sync + 'static> Future<T> {
    /// Runs `f` with the value once this future resolves.
    ///
    /// A rejection skips `f` and is passed on to the returned future
    /// unchanged.
    pub fn then<U, F>(&self, f: F) -> Future<U>
        where U: Send + Sync + 'static,
              F: FnOnce(T) -> Result<U, Error> + Send + 'static,
    {
        self.attach(move |res| res.and_then(f))
    }

    /// Runs `f` with the error once this future rejects.
    ///
    /// A resolved value skips `f` and is passed on unchanged.
    pub fn catch<F>(&self, f: F) -> Future<T>
        where F: FnOnce(Error) -> Result<T, Error> + Send + 'static
    {
        self.attach(move |res| res.or_else(f))
    }

    /// Runs `f` with the outcome, whichever way it went.
    pub fn finally<U, F>(&self, f: F) -> Future<U>
        where U: Send + Sync + 'static,
              F: FnOnce(Result<T, Error>) -> Result<U, Error> + Send + 'static,
    {
        self.attach(f)
    }

    fn attach<U, F>(&self, step: F) -> Future<U>
        where U: Send + Sync + 'static,
              F: FnOnce(Result<T, Error>) -> Result<U, Error> + Send + 'static,
    {
        let child = Arc::new(Core::new(
            self.core.runner.clone(),
            Some(cancel::upstream(&self.core))));

        let next: Continuation<T> = Box::new(Stage {
            child: Some(child.clone()),
            step: Some(step),
        });

        let mut state = self.core.lock();

        let refused = match state.link {
            Link::Vacant => None,
            Link::Attached(..) | Link::Fired => Some(Error::AlreadyChained),
            Link::Severed => Some(Error::Cancelled),
        };

        if let Some(err) = refused {
            drop(state);
            debug!("refusing continuation; err={}", err);

            // The child never becomes part of the chain
            child.complete(Err(err));
            return Future::new(child);
        }

        match self.core.outcome.get() {
            Some(res) => {
                state.link = Link::Fired;
                drop(state);

                debug!("parent complete; running continuation now");

                let res = res.clone();
                // If the runner drops the task, the stage rejects the child
                self.core.runner.run(Box::new(move || drive(next.run(&res))));
            }
            None => {
                debug!("parent pending; deferring continuation");
                state.link = Link::Attached(next);
            }
        }

        Future::new(child)
    }
}

// Applies `step` to the parent's outcome and completes `child` with the
// result. A panicking step rejects the child.
struct Stage<U, F> {
    child: Option<Arc<Core<U>>>,
    step: Option<F>,
}

impl<T, U, F> Continue<T> for Stage<U, F>
    where T: Clone + Send + Sync + 'static,
          U: Send + Sync + 'static,
          F: FnOnce(Result<T, Error>) -> Result<U, Error> + Send + 'static,
{
    fn run(mut self: Box<Self>, res: &Result<T, Error>) -> Option<Step> {
        let child = self.child.take()?;
        let step = self.step.take()?;
        let res = res.clone();

        let out = match panic::catch_unwind(AssertUnwindSafe(move || step(res))) {
            Ok(out) => out,
            Err(payload) => {
                let err = Error::from_panic(payload);
                warn!("continuation handler panicked; err={}", err);
                Err(err)
            }
        };

        // The child's own continuation is returned, not called
        let next = child.settle(out).flatten()?;

        Some(Step::new(move || {
            child.outcome.get().and_then(|res| next.run(res))
        }))
    }

    fn detach(mut self: Box<Self>) {
        self.child = None;
    }
}

impl<U, F> Drop for Stage<U, F> {
    fn drop(&mut self) {
        if let Some(child) = self.child.take() {
            if child.complete(Err(Error::Abandoned)) {
                debug!("continuation dropped before running");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;
    use crate::{pair, Error, Future, Inline, Run, Task};

    fn on_small_stack<F: FnOnce() + Send + 'static>(f: F) {
        thread::Builder::new()
            .stack_size(512 * 1024)
            .spawn(f)
            .unwrap()
            .join()
            .unwrap();
    }

    // Drops every task it is handed
    struct Discard;

    impl Run for Discard {
        fn run(&self, _: Task) {}
    }

    #[test]
    pub fn test_then_before_complete() {
        let (f, c) = pair::<u32>();
        let next = f.then(|v| Ok(v * 2));

        assert!(!next.is_complete());
        c.resolve(2);

        // Deferred continuations run on the completing thread
        assert!(next.is_complete());
        assert_eq!(next.collect().unwrap(), 4);
    }

    #[test]
    pub fn test_then_after_complete() {
        let f = Future::create_on(Inline, |c| {
            c.resolve(2u32);
        });

        let next = f.then(|v| Ok(v * 2));

        // Inline runner runs the continuation during attach
        assert!(next.is_complete());
        assert_eq!(next.collect().unwrap(), 4);
    }

    #[test]
    pub fn test_then_changes_type() {
        let f = Future::resolved(12u32);
        let next = f.then(|v| Ok(format!("v={}", v)));

        assert_eq!(next.collect().unwrap(), "v=12");
    }

    #[test]
    pub fn test_then_skipped_on_rejection() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c2 = calls.clone();
        let f = Future::<u32>::rejected(Error::msg("E"));

        let next = f.then(move |v| {
            c2.fetch_add(1, Ordering::SeqCst);
            Ok(v)
        });

        assert_eq!(next.collect().unwrap_err().to_string(), "E");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    pub fn test_catch_skipped_on_resolve() {
        let f = Future::resolved(1u32);
        let next = f.catch(|_| Ok(99));

        assert_eq!(next.collect().unwrap(), 1);
    }

    #[test]
    pub fn test_handler_failure_rejects_child() {
        let f = Future::resolved(1u32);
        let next = f.then(|_| Err::<u32, _>(Error::msg("handler failed")));

        assert_eq!(next.collect().unwrap_err().to_string(), "handler failed");
    }

    #[test]
    pub fn test_handler_panic_rejects_child() {
        let (f, c) = pair::<u32>();
        let next = f.then(|_| -> Result<u32, Error> { panic!("bad handler") });

        c.resolve(1);

        let err = next.collect().unwrap_err();
        assert!(err.is_panic());
        assert_eq!(err.to_string(), "panicked: bad handler");
    }

    #[test]
    pub fn test_second_attach_is_rejected() {
        let (f, c) = pair::<u32>();
        let first = f.then(|v| Ok(v + 1));
        let second = f.then(|v| Ok(v + 2));

        assert!(matches!(second.collect(), Err(Error::AlreadyChained)));

        c.resolve(1);
        assert_eq!(first.collect().unwrap(), 2);
    }

    #[test]
    pub fn test_second_attach_after_complete_is_rejected() {
        let f = Future::resolved(1u32);
        let first = f.then(|v| Ok(v + 1));
        let second = f.catch(|_| Ok(0));

        assert_eq!(first.collect().unwrap(), 2);
        assert!(matches!(second.collect(), Err(Error::AlreadyChained)));
    }

    #[test]
    pub fn test_handler_may_collect_parent() {
        let (f, c) = pair::<u32>();
        let parent = f.clone();
        let next = f.then(move |v| {
            let again = parent.collect()?;
            Ok(v + again)
        });

        c.resolve(3);
        assert_eq!(next.collect().unwrap(), 6);
    }

    #[test]
    pub fn test_handler_may_chain_onto_child() {
        let (f, c) = pair::<u32>();
        let (tx, rx) = std::sync::mpsc::channel();
        let next = f.then(|v| Ok(v + 1));
        let observer = next.clone();

        thread::spawn(move || {
            tx.send(observer.then(|v| Ok(v * 10)).collect()).unwrap();
        });

        thread::sleep(Duration::from_millis(20));
        c.resolve(1);

        assert_eq!(rx.recv().unwrap().unwrap(), 20);
    }

    #[test]
    pub fn test_long_deferred_chain_resolves() {
        on_small_stack(|| {
            let (root, c) = pair::<u64>();
            let mut f = root.then(|x| Ok(x + 1));

            for _ in 1..10_000 {
                f = f.then(|x| Ok(x + 1));
            }

            assert!(!f.is_complete());
            c.resolve(0);

            assert_eq!(f.collect().unwrap(), 10_000);
        });
    }

    #[test]
    pub fn test_long_deferred_chain_rejected_by_dropped_completer() {
        on_small_stack(|| {
            let (root, c) = pair::<u64>();
            let mut f = root.catch(|_| Err(Error::msg("recovered nothing")));

            for _ in 1..10_000 {
                f = f.then(|x| Ok(x + 1));
            }

            drop(c);

            assert_eq!(f.collect().unwrap_err().to_string(), "recovered nothing");
        });
    }

    #[test]
    pub fn test_dropped_task_rejects_child() {
        let root = Future::create_on(Discard, |c| {
            c.resolve(1u32);
        });

        // The producer was dropped along with its task
        assert!(matches!(root.collect(), Err(Error::Abandoned)));

        // Had it run, the handler would have recovered
        let next = root.catch(|_| Ok(5));
        assert!(matches!(next.collect(), Err(Error::Abandoned)));
    }
}
