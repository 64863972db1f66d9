pub mod config;
pub mod plan;
pub mod run;

use std::path::Path;

use mw_core::World;
use mw_simulation::spawn::SpawnCatalog;
use mw_simulation::systems::{standard_catalog, standard_graph, standard_spawn_system};
use mw_simulation::{SimConfig, SystemGraph};

/// Read a JSON config file, or fall back to the defaults.
fn load_config(path: Option<&Path>) -> Result<SimConfig, String> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    SimConfig::from_json(&json).map_err(|e| format!("{}: {e}", path.display()))
}

/// The standard catalog and graph for `config`.
fn standard_session(config: &SimConfig) -> Result<(SpawnCatalog, SystemGraph), String> {
    let catalog = standard_catalog().map_err(|e| e.to_string())?;
    let spawn = standard_spawn_system(config, &catalog).map_err(|e| e.to_string())?;
    Ok((catalog, standard_graph(config, spawn)))
}

/// An empty world with just the player in it.
fn standard_world() -> Result<(World, mw_core::EntityId), String> {
    use mw_core::component::{HealthComponent, MicrobeControlComponent, MotionComponent};
    use mw_core::{Entity, EntityKind, Vec3};

    let mut player = Entity::new(EntityKind::Player, "player");
    player.components.health = Some(HealthComponent::new(100.0));
    player.components.motion = Some(MotionComponent::default());
    player.components.control = Some(MicrobeControlComponent {
        movement_direction: Vec3::new(1.0, 0.0, 0.35),
        ..Default::default()
    });

    let mut world = World::new();
    let id = world.add_entity(player).map_err(|e| e.to_string())?;
    Ok((world, id))
}
