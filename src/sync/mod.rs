pub use self::signal::Signal;

mod signal;
