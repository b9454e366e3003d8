use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// The failure side of a future's outcome.
///
/// Outcomes may be observed any number of times, so the error is cheap to
/// clone and shares the underlying cause.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The producer or a continuation handler failed.
    #[error("{0}")]
    Failed(Arc<dyn StdError + Send + Sync + 'static>),

    /// The producer or a continuation handler panicked.
    #[error("panicked: {0}")]
    Panicked(String),

    /// A continuation was attached to a future that already had one.
    #[error("future already has a continuation attached")]
    AlreadyChained,

    /// A continuation was attached after the future's link was cancelled.
    #[error("future was cancelled")]
    Cancelled,

    /// The completer was dropped before the future was completed.
    #[error("completer dropped without completing the future")]
    Abandoned,
}

impl Error {
    pub fn new<E>(err: E) -> Error
        where E: StdError + Send + Sync + 'static
    {
        Error::Failed(Arc::new(err))
    }

    /// Creates a failure from a plain message.
    pub fn msg<M>(msg: M) -> Error
        where M: fmt::Display + fmt::Debug + Send + Sync + 'static
    {
        Error::new(Message(msg))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(*self, Error::Cancelled)
    }

    pub fn is_panic(&self) -> bool {
        matches!(*self, Error::Panicked(..))
    }

    /// Converts a payload caught by `catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Error {
        let msg = if let Some(s) = payload.downcast_ref::<&'static str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };

        Error::Panicked(msg)
    }
}

struct Message<M>(M);

impl<M: fmt::Debug> fmt::Debug for Message<M> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.0, fmt)
    }
}

impl<M: fmt::Display> fmt::Display for Message<M> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, fmt)
    }
}

impl<M: fmt::Display + fmt::Debug> StdError for Message<M> {}
