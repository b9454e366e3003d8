use std::sync::OnceLock;
use crate::Error;
use self::Outcome::*;

/// The state of a future's value.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Pending,
    Resolved(T),
    Rejected(Error),
}

impl<T> Outcome<T> {
    pub fn is_pending(&self) -> bool {
        matches!(*self, Pending)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self, Resolved(..))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(*self, Rejected(..))
    }

    /// Returns the final result, or `None` while pending.
    pub fn into_result(self) -> Option<Result<T, Error>> {
        match self {
            Pending => None,
            Resolved(v) => Some(Ok(v)),
            Rejected(e) => Some(Err(e)),
        }
    }
}

impl<T> From<Result<T, Error>> for Outcome<T> {
    fn from(res: Result<T, Error>) -> Outcome<T> {
        match res {
            Ok(v) => Resolved(v),
            Err(e) => Rejected(e),
        }
    }
}

/// Write-once storage for a final outcome.
///
/// Writes are serialized by the owning future's lock. Once written, the value
/// never changes and may be read from any thread without locking.
pub struct OutcomeCell<T> {
    value: OnceLock<Result<T, Error>>,
}

impl<T> OutcomeCell<T> {
    pub fn new() -> OutcomeCell<T> {
        OutcomeCell { value: OnceLock::new() }
    }

    /// Stores the final result. Returns false, dropping `res`, if a result
    /// was already stored.
    pub fn put(&self, res: Result<T, Error>) -> bool {
        self.value.set(res).is_ok()
    }

    pub fn get(&self) -> Option<&Result<T, Error>> {
        self.value.get()
    }

    pub fn is_final(&self) -> bool {
        self.value.get().is_some()
    }
}

impl<T: Clone> OutcomeCell<T> {
    pub fn snapshot(&self) -> Outcome<T> {
        match self.get() {
            Some(res) => res.clone().into(),
            None => Pending,
        }
    }
}
