use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// One-shot broadcast. Any number of threads may wait for the signal; once
/// fired it stays fired and every current and future waiter is released.
pub struct Signal {
    // true once fired
    fired: Mutex<bool>,
    condvar: Condvar,
}

impl Signal {
    pub fn new() -> Signal {
        Signal {
            fired: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Fires the signal. Firing again has no effect.
    pub fn fire(&self) {
        let mut fired = self.lock();

        if !*fired {
            *fired = true;
            self.condvar.notify_all();
        }
    }

    #[cfg(test)]
    pub fn is_fired(&self) -> bool {
        *self.lock()
    }

    /// Blocks the calling thread until the signal fires.
    pub fn wait(&self) {
        let mut fired = self.lock();

        // Loop to guard against spurious wakeups
        while !*fired {
            fired = self.condvar.wait(fired)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until the signal fires or the timeout elapses. Returns whether
    /// the signal fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut fired = self.lock();

        while !*fired {
            let now = Instant::now();

            if now >= deadline {
                return false;
            }

            fired = self.condvar.wait_timeout(fired, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        true
    }

    // The guarded bool is always consistent, so a poisoned lock is still
    // safe to use.
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.fired.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
