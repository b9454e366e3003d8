pub use self::outcome::Outcome;
pub use self::val::{pair, Future, Completer};

mod cancel;
mod chain;
mod outcome;
mod val;
