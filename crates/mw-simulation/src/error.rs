use mw_core::{CoreError, EntityId};

use crate::graph::Lane;

/// Alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

/// Alias for `Result<T, ScheduleError>`.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Errors raised while a simulation runs.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// An entity id did not resolve.
    #[error("entity not found in simulation: {0}")]
    EntityNotFound(EntityId),

    /// An entity store operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The system graph or lane layout is invalid.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// A configuration value is out of range or unreadable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Save state JSON could not be read or written.
    #[error("invalid save state: {0}")]
    SaveState(#[from] serde_json::Error),

    /// A save state names an item the catalog does not know.
    #[error("unknown spawn item: {0}")]
    UnknownSpawnItem(String),

    /// A system panicked while holding the world lock.
    #[error("world lock poisoned")]
    WorldPoisoned,

    /// The counterpart lane failed, so this lane stopped at a checkpoint.
    #[error("{lane} lane aborted at checkpoint {checkpoint}")]
    LaneAborted {
        /// The lane that stopped.
        lane: Lane,
        /// Checkpoint it was waiting at.
        checkpoint: usize,
    },

    /// A system failed during its update.
    #[error("system error in {system}: {message}")]
    SystemError {
        /// Name of the failing system.
        system: String,
        /// What went wrong.
        message: String,
    },
}

impl SimError {
    /// Shorthand for a failure inside a named system.
    pub fn system(system: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SystemError {
            system: system.into(),
            message: message.into(),
        }
    }
}

/// Configuration errors in a system graph or lane layout.
///
/// These are detected before any tick runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// Two systems share a name.
    #[error("system registered twice: {0}")]
    DuplicateSystem(String),

    /// A constraint or layout names a system that was never registered.
    #[error("ordering constraint refers to unknown system: {0}")]
    UnknownSystem(String),

    /// The ordering constraints form a cycle.
    #[error("contradictory ordering between systems: {}", .0.join(", "))]
    ContradictoryOrdering(Vec<String>),

    /// The lanes of a layout pass different numbers of checkpoints.
    #[error("asymmetric checkpoints: main lane has {main}, background lane has {background}")]
    AsymmetricCheckpoints {
        /// Checkpoints on the main lane.
        main: usize,
        /// Checkpoints on the background lane.
        background: usize,
    },

    /// A registered system is not placed in the layout.
    #[error("system missing from layout: {0}")]
    MissingFromLayout(String),

    /// A system is placed twice.
    #[error("system appears more than once in layout: {0}")]
    DuplicateInLayout(String),

    /// A system is laid out on the other lane than declared.
    #[error("system {system} is declared for the {declared} lane but laid out on the {found} lane")]
    WrongLane {
        /// The misplaced system.
        system: String,
        /// Lane from its node.
        declared: Lane,
        /// Lane it was laid out on.
        found: Lane,
    },

    /// A hand layout breaks an ordering constraint.
    #[error("layout runs {after} before {before}, but {before} must run first")]
    ConstraintViolated {
        /// System that must run first.
        before: String,
        /// System that must run later.
        after: String,
    },

    /// The lanes reached different checkpoints at a rendezvous.
    #[error("lanes met at different checkpoints: {expected} and {found}")]
    CheckpointMismatch {
        /// Checkpoint the first lane waited at.
        expected: usize,
        /// Checkpoint the second lane arrived at.
        found: usize,
    },

    /// Threaded mode was forced but the executor has no workers.
    #[error("threaded execution requested but the executor has no worker threads")]
    NoWorkers,
}
