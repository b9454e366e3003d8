use std::{fmt, io, thread};
use log::warn;

/// A unit of work handed to an executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait Run {
    /// Runs the task on the underlying executor.
    ///
    /// This uses a boxed `Task` rather than a generic `FnOnce` so that
    /// `Run` is object safe.
    fn run(&self, task: Task);
}

/// Runs every task on a freshly spawned thread.
///
/// This is the default execution context for futures.
#[derive(Clone, Default)]
pub struct ThreadRun {
    name: Option<String>,
    stack_size: Option<usize>,
}

impl ThreadRun {
    pub fn builder() -> ThreadRunBuilder {
        ThreadRunBuilder { inner: ThreadRun::default() }
    }

    fn spawn(&self, task: Task) -> io::Result<()> {
        let mut builder = thread::Builder::new();

        if let Some(ref name) = self.name {
            builder = builder.name(name.clone());
        }

        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }

        builder.spawn(task).map(|_| ())
    }
}

impl Run for ThreadRun {
    fn run(&self, task: Task) {
        if let Err(e) = self.spawn(task) {
            // The task was dropped along with the failed spawn. Any completer
            // or continuation it owned rejects its future on drop.
            warn!("failed to spawn thread for task; err={}", e);
        }
    }
}

impl fmt::Debug for ThreadRun {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("ThreadRun")
            .field("name", &self.name)
            .field("stack_size", &self.stack_size)
            .finish()
    }
}

pub struct ThreadRunBuilder {
    inner: ThreadRun,
}

impl ThreadRunBuilder {
    /// Names the threads spawned for tasks.
    pub fn name<S: Into<String>>(mut self, name: S) -> ThreadRunBuilder {
        self.inner.name = Some(name.into());
        self
    }

    pub fn stack_size(mut self, size: usize) -> ThreadRunBuilder {
        self.inner.stack_size = Some(size);
        self
    }

    pub fn build(self) -> ThreadRun {
        self.inner
    }
}

/// Runs every task immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl Run for Inline {
    fn run(&self, task: Task) {
        task()
    }
}
