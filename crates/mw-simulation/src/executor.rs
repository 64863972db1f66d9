use std::io;
use std::thread;

/// Runs a background unit of work alongside the caller's foreground work.
pub trait TaskExecutor: Send + Sync + std::fmt::Debug {
    /// Worker threads available besides the caller. Zero means the scheduler
    /// must run sequentially.
    fn worker_count(&self) -> usize;

    /// Run `background` on a worker while `foreground` runs on the calling
    /// thread. Returns once both have finished. A panic in either is
    /// propagated to the caller. Fails without running either closure if
    /// the background work can't be started.
    fn run_with_background(
        &self,
        background: &mut (dyn FnMut() + Send),
        foreground: &mut dyn FnMut(),
    ) -> io::Result<()>;
}

/// Runs the background work on a scoped OS thread.
#[derive(Debug, Clone)]
pub struct ThreadExecutor {
    workers: usize,
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadExecutor {
    /// Detect the worker count: available parallelism minus the caller.
    pub fn new() -> Self {
        let workers = thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(0);
        Self { workers }
    }

    /// Report a fixed worker count instead of detecting it.
    pub fn with_workers(workers: usize) -> Self {
        Self { workers }
    }
}

impl TaskExecutor for ThreadExecutor {
    fn worker_count(&self) -> usize {
        self.workers
    }

    fn run_with_background(
        &self,
        background: &mut (dyn FnMut() + Send),
        foreground: &mut dyn FnMut(),
    ) -> io::Result<()> {
        thread::scope(|scope| {
            let handle = thread::Builder::new()
                .name("mw-background".into())
                .spawn_scoped(scope, background)?;
            foreground();
            if let Err(payload) = handle.join() {
                std::panic::resume_unwind(payload);
            }
            Ok(())
        })
    }
}

/// Has no workers. Runs the background work first, then the foreground,
/// on the calling thread. Only usable for work that never waits on the
/// other half, which is why the scheduler runs sequentially with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl TaskExecutor for InlineExecutor {
    fn worker_count(&self) -> usize {
        0
    }

    fn run_with_background(
        &self,
        background: &mut (dyn FnMut() + Send),
        foreground: &mut dyn FnMut(),
    ) -> io::Result<()> {
        background();
        foreground();
        Ok(())
    }
}
