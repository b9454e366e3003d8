//! Cancellation of continuation chains.
//!
//! A continuation's core holds a hook that cancels its parent through a weak
//! reference, so cancelling any link walks the chain up to the root
//! producer's own hook.

use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use log::{debug, trace, warn};
use crate::Error;
use super::val::{Completer, Core, Future, Link};

pub(crate) type CancelHook = Box<dyn FnOnce() + Send + 'static>;

/// A hook that cancels `parent`, if it is still alive.
pub(crate) fn upstream<T>(parent: &Arc<Core<T>>) -> CancelHook
    where T: Send + Sync + 'static
{
    let parent = Arc::downgrade(parent);

    Box::new(move || {
        if let Some(parent) = parent.upgrade() {
            parent.cancel();
        }
    })
}

impl<T> Core<T> {
    /// Severs the continuation link and runs the cancel hook. Does nothing
    /// once the outcome is final or if already cancelled.
    pub(crate) fn cancel(&self) -> bool {
        let (detached, hook) = {
            let mut state = self.lock();

            if self.outcome.is_final() {
                trace!("cancel after completion; ignoring");
                return false;
            }

            if let Link::Severed = state.link {
                return false;
            }

            (mem::replace(&mut state.link, Link::Severed), state.on_cancel.take())
        };

        debug!("cancelling future; had_continuation={}", matches!(detached, Link::Attached(..)));

        // The detached continuation is dropped without running, and without
        // rejecting the future it feeds
        if let Link::Attached(next) = detached {
            next.detach();
        }

        if let Some(hook) = hook {
            run_hook(hook);
        }

        true
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        matches!(self.lock().link, Link::Severed)
    }

    /// Replaces the cancel hook. The hook runs right away if the future was
    /// already cancelled and is dropped if the future is complete.
    pub(crate) fn set_cancel_hook(&self, hook: CancelHook) {
        {
            let mut state = self.lock();

            if self.outcome.is_final() {
                return;
            }

            if !matches!(state.link, Link::Severed) {
                state.on_cancel = Some(hook);
                return;
            }
        }

        run_hook(hook);
    }
}

impl<T> Future<T> {
    /// Cancels the chain this future belongs to.
    ///
    /// A continuation attached to this future that has not run yet never
    /// will, and cancellation propagates to every pending future upstream,
    /// ending at the root producer's hook. Cancellation neither resolves nor
    /// rejects anything, and has no effect on a future that is already
    /// complete. Continuations attached after cancellation are rejected with
    /// `Error::Cancelled`.
    pub fn cancel(&self) {
        self.core.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.core.is_cancelled()
    }
}

impl<T> Completer<T> {
    /// Registers `hook` to run when the future is cancelled.
    ///
    /// Replaces any previously registered hook.
    pub fn on_cancel<F>(&self, hook: F)
        where F: FnOnce() + Send + 'static
    {
        self.core.set_cancel_hook(Box::new(hook));
    }

    pub fn is_cancelled(&self) -> bool {
        self.core.is_cancelled()
    }
}

fn run_hook(hook: CancelHook) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(hook)) {
        warn!("cancel hook panicked; err={}", Error::from_panic(payload));
    }
}
