use mw_core::EntityKind;

use crate::context::TickContext;
use crate::error::SimResult;
use crate::system::System;

/// Default top speed of a microbe steering on its own, in units per second.
pub const DEFAULT_MICROBE_SPEED: f32 = 5.0;

/// Steers microbes toward their desired direction and integrates velocity
/// into position.
///
/// AI-driven microbes only steer while `run_ai` is set for the tick; the
/// player always does. Nothing moves on ticks where time doesn't advance.
#[derive(Debug)]
pub struct MovementSystem {
    speed: f32,
}

impl Default for MovementSystem {
    fn default() -> Self {
        Self::new(DEFAULT_MICROBE_SPEED)
    }
}

impl MovementSystem {
    /// Movement at `speed` world units per second.
    pub fn new(speed: f32) -> Self {
        Self { speed }
    }

    /// Steering speed.
    pub fn speed(&self) -> f32 {
        self.speed
    }
}

impl System for MovementSystem {
    fn name(&self) -> &str {
        "movement"
    }

    fn update(&mut self, ctx: &TickContext<'_>) -> SimResult<()> {
        if !ctx.time_advances() {
            return Ok(());
        }
        let run_ai = ctx.input().run_ai;
        let mut world = ctx.world_mut()?;

        for entity in world.all_entities_mut() {
            let steers = run_ai || entity.kind == EntityKind::Player;
            let Some(motion) = entity.components.motion.as_mut() else {
                continue;
            };
            if let Some(control) = entity.components.control.as_ref().filter(|_| steers) {
                motion.velocity = control.movement_direction.normalize_or_zero() * self.speed;
            }
            entity.position += motion.velocity * ctx.delta();
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
    use mw_core::component::{MicrobeControlComponent, MotionComponent};
    use mw_core::{Entity, EntityId, Vec3, World};

    use super::*;
    use crate::context::TickInput;
    use crate::systems::testing::{run_once, run_once_with};

    fn drifting(world: &mut World, velocity: Vec3) -> EntityId {
        let mut entity = Entity::new(EntityKind::Chunk, "drifter");
        entity.components.motion = Some(MotionComponent { velocity });
        world.add_entity(entity).unwrap()
    }

    fn steering(world: &mut World, kind: EntityKind, direction: Vec3) -> EntityId {
        let mut entity = Entity::new(kind, "steerer");
        entity.components.motion = Some(MotionComponent::default());
        entity.components.control = Some(MicrobeControlComponent {
            movement_direction: direction,
            ..Default::default()
        });
        world.add_entity(entity).unwrap()
    }

    #[test]
    fn velocity_is_integrated() {
        let mut world = World::new();
        let id = drifting(&mut world, Vec3::new(2.0, 0.0, -1.0));

        let world = run_once(&mut MovementSystem::default(), world, 0.5);
        assert_eq!(world.get_entity(id).unwrap().position, Vec3::new(1.0, 0.0, -0.5));
    }

    #[test]
    fn zero_delta_does_not_move() {
        let mut world = World::new();
        let id = drifting(&mut world, Vec3::X);

        let world = run_once(&mut MovementSystem::default(), world, 0.0);
        assert_eq!(world.get_entity(id).unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn steering_uses_normalized_direction() {
        let mut world = World::new();
        let id = steering(&mut world, EntityKind::Microbe, Vec3::new(0.0, 0.0, 10.0));

        let world = run_once(&mut MovementSystem::new(4.0), world, 1.0);
        assert_eq!(world.get_entity(id).unwrap().position, Vec3::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn ai_steering_pauses_without_run_ai() {
        let mut world = World::new();
        let ai = steering(&mut world, EntityKind::Microbe, Vec3::X);
        let player = steering(&mut world, EntityKind::Player, Vec3::X);
        let input = TickInput {
            run_ai: false,
            ..TickInput::default()
        };

        let world = run_once_with(&mut MovementSystem::new(1.0), world, 1.0, &input);
        assert_eq!(world.get_entity(ai).unwrap().position, Vec3::ZERO);
        assert_eq!(world.get_entity(player).unwrap().position, Vec3::X);
    }
}
