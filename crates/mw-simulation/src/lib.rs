//! Fixed-step system scheduling and procedural spawning for Microbe World.
//!
//! Systems are declared in a [`graph::SystemGraph`] with a lane and
//! ordering constraints, compiled into a [`graph::CompiledSchedule`], and run
//! once per tick by a [`scheduler::Scheduler`]: the main lane on the calling
//! thread, the background lane on a worker, meeting at numbered checkpoints.
//! Without a worker the same plan runs sequentially.
//!
//! The [`spawn`] module keeps content alive around a moving reference point.

/// Simulation clock for tracking ticks and elapsed time.
pub mod clock;
/// Configuration types for simulation runs.
pub mod config;
/// Shared world and per-tick context passed to systems.
pub mod context;
/// Error types for the simulation crate.
pub mod error;
/// Simulation event types and the event log.
pub mod event;
/// Runs the background lane next to the caller.
pub mod executor;
/// System declarations, lane layouts and the schedule compiler.
pub mod graph;
/// Two-party checkpoint barrier.
pub mod rendezvous;
/// Executes a compiled schedule each tick.
pub mod scheduler;
/// Top-level simulation orchestrator.
pub mod simulation;
/// Procedural spawn/despawn manager.
pub mod spawn;
/// The trait that all simulation systems implement.
pub mod system;
/// Concrete systems and the standard graph.
pub mod systems;

/// Re-export of [`clock::SimClock`].
pub use clock::SimClock;
/// Re-exports of [`config::SimConfig`], [`config::SpawnConfig`] and [`config::ExecutionPreference`].
pub use config::{ExecutionPreference, SimConfig, SpawnConfig};
/// Re-exports of the shared world and tick context.
pub use context::{SharedWorld, TickContext, TickInput};
/// Re-exports of [`error::SimError`], [`error::ScheduleError`] and their result aliases.
pub use error::{ScheduleError, ScheduleResult, SimError, SimResult};
/// Re-exports of [`event::EventLog`], [`event::SimEvent`], and [`event::SimEventKind`].
pub use event::{EventLog, SimEvent, SimEventKind};
/// Re-exports of the executors.
pub use executor::{InlineExecutor, TaskExecutor, ThreadExecutor};
/// Re-exports of the graph types.
pub use graph::{CompiledSchedule, Lane, LaneLayout, SystemGraph, SystemNode};
/// Re-exports of [`scheduler::Scheduler`] and [`scheduler::ExecutionMode`].
pub use scheduler::{ExecutionMode, Scheduler};
/// Re-exports of [`simulation::Simulation`] and [`simulation::TickSummary`].
pub use simulation::{Simulation, TickSummary};
/// Re-export of [`spawn::SpawnSystem`].
pub use spawn::SpawnSystem;
/// Re-export of [`system::System`].
pub use system::System;
