use mw_core::World;

use crate::context::TickContext;
use crate::error::SimResult;
use crate::simulation::TickSummary;

/// A simulation subsystem that runs each tick.
///
/// Where a system runs (lane and order) is declared separately through a
/// [`SystemNode`](crate::graph::SystemNode). Systems in different lanes run
/// concurrently, so a system only reaches shared state through the
/// [`TickContext`].
pub trait System: Send + std::fmt::Debug {
    /// Human-readable name for this system.
    fn name(&self) -> &str;

    /// Called once per tick.
    fn update(&mut self, ctx: &TickContext<'_>) -> SimResult<()>;

    /// Called after every tick, once both lanes have finished. Runs for
    /// zero-delta ticks too.
    fn post_step(&mut self, _world: &World, _summary: &TickSummary) {}

    /// Support downcasting to concrete types for cross-system communication.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Support downcasting to concrete types for cross-system communication.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
