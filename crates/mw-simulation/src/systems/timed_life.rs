use mw_core::EntityId;

use crate::context::TickContext;
use crate::error::SimResult;
use crate::event::SimEventKind;
use crate::system::System;

/// Counts down [`TimedLifeComponent`](mw_core::component::TimedLifeComponent)s
/// and removes entities whose time ran out.
#[derive(Debug, Default)]
pub struct TimedLifeSystem {
    expired_total: usize,
}

impl TimedLifeSystem {
    /// A system that has expired nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities removed since creation.
    pub fn expired_total(&self) -> usize {
        self.expired_total
    }
}

impl System for TimedLifeSystem {
    fn name(&self) -> &str {
        "timed_life"
    }

    fn update(&mut self, ctx: &TickContext<'_>) -> SimResult<()> {
        if !ctx.time_advances() {
            return Ok(());
        }

        let expired: Vec<EntityId> = {
            let mut world = ctx.world_mut()?;
            let timed = world.query().with(|c| c.timed_life.is_some()).ids();
            let mut expired = Vec::new();
            for id in timed {
                let Some(life) = world
                    .get_entity_mut(id)
                    .and_then(|entity| entity.components.timed_life.as_mut())
                else {
                    continue;
                };
                life.remaining -= ctx.delta();
                if life.remaining <= 0.0 {
                    expired.push(id);
                }
            }
            for &id in &expired {
                world.remove_entity(id)?;
            }
            expired
        };

        self.expired_total += expired.len();
        for entity in expired {
            ctx.emit(SimEventKind::Expired { entity }, format!("{entity} expired"));
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

#[cfg(test)]
mod tests {
    use mw_core::component::TimedLifeComponent;
    use mw_core::{Entity, EntityKind, World};

    use super::*;
    use crate::systems::testing::run_once;

    fn with_life(world: &mut World, remaining: f32) -> EntityId {
        let mut entity = Entity::new(EntityKind::CompoundCloud, "puff");
        entity.components.timed_life = Some(TimedLifeComponent { remaining });
        world.add_entity(entity).unwrap()
    }

    #[test]
    fn expired_entities_are_removed() {
        let mut world = World::new();
        let short = with_life(&mut world, 0.5);
        let long = with_life(&mut world, 3.0);
        let mut system = TimedLifeSystem::new();

        let world = run_once(&mut system, world, 0.5);
        assert!(!world.contains(short));
        let remaining = world.get_entity(long).unwrap().components.timed_life.unwrap();
        assert_eq!(remaining.remaining, 2.5);
        assert_eq!(system.expired_total(), 1);
    }

    #[test]
    fn zero_delta_keeps_timers() {
        let mut world = World::new();
        let id = with_life(&mut world, 0.0001);

        let world = run_once(&mut TimedLifeSystem::new(), world, 0.0);
        assert!(world.contains(id));
    }
}
