use mw_core::hex_radius;

use crate::context::TickContext;
use crate::error::SimResult;
use crate::system::System;

/// Refreshes the cached hex count and radius of every cell body.
#[derive(Debug, Default)]
pub struct OrganelleComponentFetchSystem;

impl System for OrganelleComponentFetchSystem {
    fn name(&self) -> &str {
        "organelle_component_fetch"
    }

    fn update(&mut self, ctx: &TickContext<'_>) -> SimResult<()> {
        let mut world = ctx.world_mut()?;
        for cell in world
            .all_entities_mut()
            .filter_map(|entity| entity.components.cell.as_mut())
        {
            cell.hex_count = cell.hexes.len();
            cell.radius = hex_radius(&cell.hexes);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
