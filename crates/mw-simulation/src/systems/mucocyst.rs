use mw_core::component::MicrobeState;

use crate::context::TickContext;
use crate::error::SimResult;
use crate::system::System;

/// Keeps each microbe's invulnerability in sync with its shield state.
///
/// Colony members are skipped; their leader decides for the whole colony.
#[derive(Debug, Default)]
pub struct MucocystSystem {
    god_mode: bool,
}

impl MucocystSystem {
    /// Shield system with the given god mode.
    pub fn new(god_mode: bool) -> Self {
        Self { god_mode }
    }

    /// True when every microbe is invulnerable.
    pub fn god_mode(&self) -> bool {
        self.god_mode
    }

    /// Toggle god mode.
    pub fn set_god_mode(&mut self, god_mode: bool) {
        self.god_mode = god_mode;
    }
}

impl System for MucocystSystem {
    fn name(&self) -> &str {
        "mucocyst"
    }

    fn update(&mut self, ctx: &TickContext<'_>) -> SimResult<()> {
        let mut world = ctx.world_mut()?;
        let shieldable = world
            .query()
            .with(|c| c.control.is_some() && c.health.is_some())
            .with(|c| c.attached.is_none())
            .ids();
        for id in shieldable {
            let Some(entity) = world.get_entity_mut(id) else {
                continue;
            };
            let components = &mut entity.components;
            let shielded = components
                .control
                .is_some_and(|control| control.state == MicrobeState::MucocystShield);
            if let Some(health) = components.health.as_mut() {
                health.invulnerable = shielded || self.god_mode;
            }
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
