use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Why a lane could not pass a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendezvousError {
    /// The other lane gave up.
    Aborted,
    /// The lanes arrived at different checkpoints.
    Mismatch {
        /// Checkpoint the waiting lane presented.
        expected: usize,
        /// Checkpoint the arriving lane presented.
        found: usize,
    },
}

#[derive(Debug, Default)]
struct State {
    /// Checkpoint the first arriving lane is waiting at.
    waiting: Option<usize>,
    generation: u64,
    aborted: bool,
}

/// A two-party checkpoint that can be aborted.
///
/// Neither party passes checkpoint `n` until the other one has reached
/// checkpoint `n` as well. After [`abort`](Rendezvous::abort), every
/// current and future wait fails, so a lane that errors or panics never
/// leaves its counterpart blocked.
#[derive(Debug, Default)]
pub struct Rendezvous {
    state: Mutex<State>,
    arrived: Condvar,
}

impl Rendezvous {
    /// A fresh rendezvous with no lane waiting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the other party reaches the same checkpoint.
    pub fn wait(&self, checkpoint: usize) -> Result<(), RendezvousError> {
        let mut state = self.lock();
        if state.aborted {
            return Err(RendezvousError::Aborted);
        }

        match state.waiting {
            Some(expected) if expected != checkpoint => {
                state.aborted = true;
                self.arrived.notify_all();
                Err(RendezvousError::Mismatch {
                    expected,
                    found: checkpoint,
                })
            }
            Some(_) => {
                state.waiting = None;
                state.generation += 1;
                self.arrived.notify_all();
                Ok(())
            }
            None => {
                state.waiting = Some(checkpoint);
                let generation = state.generation;
                while state.generation == generation && !state.aborted {
                    state = self
                        .arrived
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                if state.generation == generation {
                    Err(RendezvousError::Aborted)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Release the other party with an error, now and at every later checkpoint.
    pub fn abort(&self) {
        let mut state = self.lock();
        state.aborted = true;
        self.arrived.notify_all();
    }

    /// True once either party has aborted.
    pub fn is_aborted(&self) -> bool {
        self.lock().aborted
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Aborts the rendezvous if the owning lane unwinds.
pub(crate) struct AbortOnUnwind<'a>(pub(crate) &'a Rendezvous);

impl Drop for AbortOnUnwind<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.abort();
        }
    }
}
