//! Single-assignment futures with ordered continuations and cooperative
//! cancellation.
//!
//! A `Future` is created with a producer that runs on its own execution
//! context and eventually resolves or rejects it. Consumers chain `then`,
//! `catch` and `finally` continuations, each returning a new future, and may
//! block on the outcome with `collect`. A continuation behaves the same
//! whether it is attached before, during or after the producer completes.
//!
//! ```
//! use promissory::Future;
//!
//! let f = Future::create(|c| {
//!     c.resolve(2);
//! });
//!
//! let res = f.then(|x| Ok(x * 2))
//!     .then(|x| Ok(x + 1))
//!     .collect();
//!
//! assert_eq!(res.unwrap(), 5);
//! ```

pub use either::Either;
pub use error::Error;
pub use future::{pair, Completer, Future, Outcome};
pub use run::{Inline, Run, Task, ThreadRun, ThreadRunBuilder};

pub mod either;
pub mod future;
pub mod run;
mod error;
mod sync;
