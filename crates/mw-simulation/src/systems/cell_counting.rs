use mw_core::{EntityKind, World};

use crate::context::TickContext;
use crate::error::SimResult;
use crate::simulation::TickSummary;
use crate::system::System;

/// Counts live microbe cells once both lanes are done with a tick.
///
/// The count is taken in `post_step`, which also runs for ticks that didn't
/// advance time.
#[derive(Debug, Default)]
pub struct CellCountingSystem {
    last_count: usize,
    last_tick: Option<u64>,
}

impl CellCountingSystem {
    /// A counter that has not counted yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells seen by the last count.
    pub fn last_count(&self) -> usize {
        self.last_count
    }

    /// Tick of the last completed count.
    pub fn last_tick(&self) -> Option<u64> {
        self.last_tick
    }
}

impl System for CellCountingSystem {
    fn name(&self) -> &str {
        "cell_counting"
    }

    fn update(&mut self, _ctx: &TickContext<'_>) -> SimResult<()> {
        Ok(())
    }

    fn post_step(&mut self, world: &World, summary: &TickSummary) {
        self.last_count = world
            .query()
            .kind(EntityKind::Microbe)
            .with(|c| c.cell.is_some())
            .count();
        self.last_tick = Some(summary.tick);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
