//! The concrete systems of a microbe session and the standard graph that
//! wires them together.

mod cell_counting;
mod movement;
mod mucocyst;
mod organelle_fetch;
mod timed_life;

use std::sync::Arc;

use mw_core::{Hex, OrganelleDefinition, OrganelleLayout, PlacedOrganelle};

use crate::config::SimConfig;
use crate::error::SimResult;
use crate::graph::{Lane, LaneLayout, SystemGraph, SystemNode};
use crate::spawn::{ChunkItem, CloudItem, MicrobeItem, SpawnCatalog, SpawnSystem};

pub use cell_counting::CellCountingSystem;
pub use movement::{DEFAULT_MICROBE_SPEED, MovementSystem};
pub use mucocyst::MucocystSystem;
pub use organelle_fetch::OrganelleComponentFetchSystem;
pub use timed_life::TimedLifeSystem;

/// Items of the general spawn bag and how many copies each gets.
const SPAWN_POOL: &[(&str, usize)] = &[
    ("cloud:glucose", 3),
    ("cloud:ammonia", 2),
    ("cloud:phosphates", 2),
    ("chunk:small iron", 1),
    ("chunk:marine snow", 1),
    ("microbe:Primum thrivium", 2),
];

const WANDERER_POOL: &[(&str, usize)] = &[
    ("microbe:Primum thrivium", 1),
    ("microbe:Vesiculus ambulans", 1),
];

/// Every item a standard session can spawn.
pub fn standard_catalog() -> SimResult<SpawnCatalog> {
    let cytoplasm = Arc::new(OrganelleDefinition::cytoplasm());
    let mitochondrion = Arc::new(OrganelleDefinition::new(
        "mitochondrion",
        0.3,
        vec![Hex::ZERO, Hex::new(0, 1)],
    ));

    let mut primum = OrganelleLayout::new();
    primum.add(PlacedOrganelle::new(Arc::clone(&cytoplasm), Hex::ZERO, 0))?;

    let mut vesiculus = OrganelleLayout::new();
    vesiculus.add(PlacedOrganelle::new(Arc::clone(&cytoplasm), Hex::ZERO, 0))?;
    vesiculus.add(PlacedOrganelle::new(cytoplasm, Hex::new(-1, 0), 0))?;
    vesiculus.add(PlacedOrganelle::new(mitochondrion, Hex::new(1, 0), 0))?;

    let mut catalog = SpawnCatalog::new();
    catalog.register(CloudItem::new("glucose", 5000.0));
    catalog.register(CloudItem::new("ammonia", 3000.0));
    catalog.register(CloudItem::new("phosphates", 3000.0));
    catalog.register(ChunkItem::new("small iron", 1.0).with_compound("iron", 20.0));
    catalog.register(
        ChunkItem::new("marine snow", 2.0)
            .with_compound("glucose", 50.0)
            .with_compound("ammonia", 10.0),
    );
    catalog.register(MicrobeItem::new("Primum thrivium", &primum));
    catalog.register(
        MicrobeItem::new("Vesiculus ambulans", &vesiculus)
            .with_hitpoints(150.0)
            .with_colony_size(3),
    );
    Ok(catalog)
}

/// A spawn system seeded from `config` with the standard weighted pools.
pub fn standard_spawn_system(config: &SimConfig, catalog: &SpawnCatalog) -> SimResult<SpawnSystem> {
    let mut spawn = SpawnSystem::new(config.spawn.clone(), config.seed)?;
    for &(key, copies) in SPAWN_POOL {
        let item = catalog.resolve(key)?;
        for _ in 0..copies {
            spawn.add_spawn_item(Arc::clone(&item));
        }
    }
    for &(key, copies) in WANDERER_POOL {
        let item = catalog.resolve(key)?;
        for _ in 0..copies {
            spawn.add_wanderer_item(Arc::clone(&item));
        }
    }
    Ok(spawn)
}

/// The standard two-lane graph:
///
/// - main: organelle fetch, then movement and spawning
/// - background: mucocyst shields and timed life, then cell counting
pub fn standard_graph(config: &SimConfig, spawn: SpawnSystem) -> SystemGraph {
    let mut graph = SystemGraph::new();
    graph
        .add(
            SystemNode::main("organelle_component_fetch"),
            OrganelleComponentFetchSystem,
        )
        .add(
            SystemNode::background("mucocyst")
                .after("organelle_component_fetch")
                .before("movement"),
            MucocystSystem::new(config.god_mode),
        )
        .add(SystemNode::main("movement"), MovementSystem::default())
        .add(SystemNode::background("timed_life"), TimedLifeSystem::new())
        .add(SystemNode::main("spawn").after("timed_life"), spawn)
        .add(
            SystemNode::background("cell_counting").after("spawn"),
            CellCountingSystem::new(),
        );
    graph
}

/// A hand-written layout for [`standard_graph`], with a closing checkpoint
/// after the last segment.
pub fn standard_layout() -> LaneLayout {
    LaneLayout::new()
        .segment(Lane::Main, ["organelle_component_fetch"])
        .checkpoint(Lane::Main)
        .segment(Lane::Main, ["movement", "spawn"])
        .checkpoint(Lane::Main)
        .checkpoint(Lane::Background)
        .segment(Lane::Background, ["mucocyst", "timed_life"])
        .checkpoint(Lane::Background)
        .segment(Lane::Background, ["cell_counting"])
}
