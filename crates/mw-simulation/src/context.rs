use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use glam::Vec3;
use mw_core::World;

use crate::error::{SimError, SimResult};
use crate::event::{EventLog, SimEvent, SimEventKind};

/// The entity store shared by both lanes during a tick.
///
/// Systems in different lanes may lock it concurrently. Systems that touch
/// the same entities must be in one lane or separated by a checkpoint.
#[derive(Debug, Default)]
pub struct SharedWorld {
    inner: RwLock<World>,
}

impl SharedWorld {
    /// Wrap `world` for sharing between lanes.
    pub fn new(world: World) -> Self {
        Self {
            inner: RwLock::new(world),
        }
    }

    /// Shared read access.
    pub fn read(&self) -> SimResult<RwLockReadGuard<'_, World>> {
        self.inner.read().map_err(|_| SimError::WorldPoisoned)
    }

    /// Exclusive write access.
    pub fn write(&self) -> SimResult<RwLockWriteGuard<'_, World>> {
        self.inner.write().map_err(|_| SimError::WorldPoisoned)
    }

    /// Direct access when no tick is running.
    pub fn get_mut(&mut self) -> SimResult<&mut World> {
        self.inner.get_mut().map_err(|_| SimError::WorldPoisoned)
    }

    /// Take the world back out.
    pub fn into_inner(self) -> SimResult<World> {
        self.inner.into_inner().map_err(|_| SimError::WorldPoisoned)
    }
}

/// Inputs that are valid for a single tick only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInput {
    /// Where the player is this tick, if there is one.
    pub player_position: Option<Vec3>,
    /// Whether AI-driven systems should run.
    pub run_ai: bool,
}

impl Default for TickInput {
    fn default() -> Self {
        Self {
            player_position: None,
            run_ai: true,
        }
    }
}

impl TickInput {
    /// Input with the player at `position` and AI enabled.
    pub fn at(position: Vec3) -> Self {
        Self {
            player_position: Some(position),
            ..Self::default()
        }
    }
}

/// Shared context passed to each system during a tick.
///
/// Both lanes hold the same context, so everything reachable from it is
/// either immutable or behind a lock.
pub struct TickContext<'a> {
    tick: u64,
    delta: f32,
    world: &'a SharedWorld,
    input: &'a TickInput,
    events: &'a Mutex<EventLog>,
}

impl<'a> TickContext<'a> {
    /// `delta` must already be sanitized.
    pub fn new(
        tick: u64,
        delta: f32,
        world: &'a SharedWorld,
        input: &'a TickInput,
        events: &'a Mutex<EventLog>,
    ) -> Self {
        Self {
            tick,
            delta,
            world,
            input,
            events,
        }
    }

    /// Index of the current tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Seconds this tick covers. Zero for degenerate ticks.
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// False when the tick was requested with a zero, negative or NaN delta.
    /// Time-dependent systems should do nothing in that case.
    pub fn time_advances(&self) -> bool {
        self.delta > 0.0
    }

    /// Per-tick input.
    pub fn input(&self) -> &TickInput {
        self.input
    }

    /// Read the shared world.
    pub fn world(&self) -> SimResult<RwLockReadGuard<'a, World>> {
        self.world.read()
    }

    /// Write to the shared world.
    pub fn world_mut(&self) -> SimResult<RwLockWriteGuard<'a, World>> {
        self.world.write()
    }

    /// Emit a simulation event at the current tick.
    pub fn emit(&self, kind: SimEventKind, description: impl Into<String>) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SimEvent::new(self.tick, kind, description));
    }
}

impl std::fmt::Debug for TickContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickContext")
            .field("tick", &self.tick)
            .field("delta", &self.delta)
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}
