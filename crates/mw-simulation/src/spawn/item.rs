use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use mw_core::component::{
    AttachedComponent, CellComponent, ChunkComponent, CloudComponent, HealthComponent,
    MicrobeControlComponent, MotionComponent,
};
use mw_core::{
    CoreResult, Entity, EntityId, EntityKind, Hex, OrganelleLayout, PositionedOrganelle, World,
    hex_radius,
};

use crate::error::{SimError, SimResult};

/// A template that can be turned into live entities.
///
/// Items are immutable and shared between bags, so realizing one must not
/// change it.
pub trait SpawnItem: Send + Sync + fmt::Debug {
    /// Stable identifier, used to persist bags.
    fn key(&self) -> &str;

    /// Create the item's entities at `position`. Returns their IDs; the
    /// caller starts tracking them.
    fn realize(&self, position: Vec3, world: &mut World) -> CoreResult<Vec<EntityId>>;
}

/// A floating chunk that releases compounds as it dissolves.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkItem {
    key: String,
    /// Entity name given to spawned chunks.
    pub name: String,
    /// Radius of the chunk.
    pub size: f32,
    /// Compounds released on dissolving.
    pub compounds: BTreeMap<String, f32>,
}

impl ChunkItem {
    /// A chunk without compounds.
    pub fn new(name: impl Into<String>, size: f32) -> Self {
        let name = name.into();
        Self {
            key: format!("chunk:{name}"),
            name,
            size,
            compounds: BTreeMap::new(),
        }
    }

    /// Add a compound released by the chunk.
    pub fn with_compound(mut self, compound: impl Into<String>, amount: f32) -> Self {
        self.compounds.insert(compound.into(), amount);
        self
    }
}

impl SpawnItem for ChunkItem {
    fn key(&self) -> &str {
        &self.key
    }

    fn realize(&self, position: Vec3, world: &mut World) -> CoreResult<Vec<EntityId>> {
        let mut entity = Entity::new(EntityKind::Chunk, self.name.clone()).at(position);
        entity.components.chunk = Some(ChunkComponent {
            size: self.size,
            compounds: self.compounds.clone(),
        });
        Ok(vec![world.add_entity(entity)?])
    }
}

/// A cloud of one dissolved compound.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudItem {
    key: String,
    /// Compound name.
    pub compound: String,
    /// Amount placed in each cloud.
    pub amount: f32,
}

impl CloudItem {
    /// A cloud of `amount` units of `compound`.
    pub fn new(compound: impl Into<String>, amount: f32) -> Self {
        let compound = compound.into();
        Self {
            key: format!("cloud:{compound}"),
            compound,
            amount,
        }
    }
}

impl SpawnItem for CloudItem {
    fn key(&self) -> &str {
        &self.key
    }

    fn realize(&self, position: Vec3, world: &mut World) -> CoreResult<Vec<EntityId>> {
        let mut entity =
            Entity::new(EntityKind::CompoundCloud, format!("{} cloud", self.compound)).at(position);
        entity.components.cloud = Some(CloudComponent {
            compound: self.compound.clone(),
            amount: self.amount,
        });
        Ok(vec![world.add_entity(entity)?])
    }
}

/// An AI-controlled cell of one species, optionally spawned as a colony.
#[derive(Debug, Clone, PartialEq)]
pub struct MicrobeItem {
    key: String,
    /// Species name, also the entity name.
    pub species: String,
    /// Hexes covered by the species' organelles.
    pub hexes: Vec<Hex>,
    /// Hitpoints of each cell.
    pub max_hitpoints: f32,
    /// Cells created per spawn. The first one leads the others.
    pub colony_size: usize,
}

impl MicrobeItem {
    /// A single cell of `species` shaped like `layout`.
    pub fn new<T: PositionedOrganelle>(species: impl Into<String>, layout: &OrganelleLayout<T>) -> Self {
        let species = species.into();
        Self {
            key: format!("microbe:{species}"),
            species,
            hexes: layout.occupied_hexes(),
            max_hitpoints: 100.0,
            colony_size: 1,
        }
    }

    /// Set the hitpoints of each cell.
    pub fn with_hitpoints(mut self, max_hitpoints: f32) -> Self {
        self.max_hitpoints = max_hitpoints;
        self
    }

    /// Spawn colonies of `colony_size` cells. Clamped to at least one.
    pub fn with_colony_size(mut self, colony_size: usize) -> Self {
        self.colony_size = colony_size.max(1);
        self
    }

    fn cell(&self, position: Vec3, leader: Option<EntityId>) -> Entity {
        let mut entity = Entity::new(EntityKind::Microbe, self.species.clone()).at(position);
        let components = &mut entity.components;
        components.health = Some(HealthComponent::new(self.max_hitpoints));
        components.control = Some(MicrobeControlComponent::default());
        components.motion = Some(MotionComponent::default());
        components.cell = Some(CellComponent {
            species: self.species.clone(),
            hexes: self.hexes.clone(),
            ..CellComponent::default()
        });
        components.attached = leader.map(|leader| AttachedComponent { leader });
        entity
    }
}

impl SpawnItem for MicrobeItem {
    fn key(&self) -> &str {
        &self.key
    }

    fn realize(&self, position: Vec3, world: &mut World) -> CoreResult<Vec<EntityId>> {
        let leader = world.add_entity(self.cell(position, None))?;
        let mut ids = vec![leader];

        let spacing = 2.0 * hex_radius(&self.hexes);
        for i in 1..self.colony_size {
            let offset = Vec3::new(spacing * i as f32, 0.0, 0.0);
            ids.push(world.add_entity(self.cell(position + offset, Some(leader)))?);
        }
        Ok(ids)
    }
}

/// Registry of spawn items by key. Restoring a saved spawn state looks
/// items up here.
#[derive(Debug, Clone, Default)]
pub struct SpawnCatalog {
    items: BTreeMap<String, Arc<dyn SpawnItem>>,
}

impl SpawnCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item and return the shared handle to put in bags.
    /// An item with the same key is replaced.
    pub fn register(&mut self, item: impl SpawnItem + 'static) -> Arc<dyn SpawnItem> {
        let item: Arc<dyn SpawnItem> = Arc::new(item);
        self.items.insert(item.key().to_string(), Arc::clone(&item));
        item
    }

    /// Item by key.
    pub fn get(&self, key: &str) -> Option<Arc<dyn SpawnItem>> {
        self.items.get(key).cloned()
    }

    /// Item by key; unknown keys are an error.
    pub fn resolve(&self, key: &str) -> SimResult<Arc<dyn SpawnItem>> {
        self.get(key)
            .ok_or_else(|| SimError::UnknownSpawnItem(key.to_string()))
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// Number of registered items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use mw_core::{OrganelleDefinition, PlacedOrganelle};

    use super::*;

    fn two_hex_layout() -> OrganelleLayout<PlacedOrganelle> {
        let cytoplasm = Arc::new(OrganelleDefinition::cytoplasm());
        let mut layout = OrganelleLayout::new();
        layout
            .add(PlacedOrganelle::new(Arc::clone(&cytoplasm), Hex::ZERO, 0))
            .unwrap();
        layout
            .add(PlacedOrganelle::new(cytoplasm, Hex::new(1, 0), 0))
            .unwrap();
        layout
    }

    #[test]
    fn chunk_realizes_one_entity() {
        let mut world = World::new();
        let item = ChunkItem::new("iron", 3.0).with_compound("iron", 20.0);
        let ids = item.realize(Vec3::new(1.0, 0.0, 2.0), &mut world).unwrap();
        assert_eq!(ids.len(), 1);

        let chunk = world.get_entity(ids[0]).unwrap();
        assert_eq!(chunk.kind, EntityKind::Chunk);
        assert_eq!(chunk.position, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(chunk.components.chunk.as_ref().unwrap().compounds["iron"], 20.0);
        assert_eq!(item.key(), "chunk:iron");
    }

    #[test]
    fn cloud_realizes_compound_cloud() {
        let mut world = World::new();
        let ids = CloudItem::new("glucose", 5000.0)
            .realize(Vec3::ZERO, &mut world)
            .unwrap();
        let cloud = world.get_entity(ids[0]).unwrap();
        assert_eq!(cloud.kind, EntityKind::CompoundCloud);
        assert_eq!(cloud.components.cloud.as_ref().unwrap().compound, "glucose");
    }

    #[test]
    fn microbe_colony_members_follow_leader() {
        let mut world = World::new();
        let item = MicrobeItem::new("Primum thrivium", &two_hex_layout()).with_colony_size(3);
        assert_eq!(item.hexes.len(), 2);

        let ids = item.realize(Vec3::ZERO, &mut world).unwrap();
        assert_eq!(ids.len(), 3);

        let leader = world.get_entity(ids[0]).unwrap();
        assert!(leader.components.attached.is_none());
        assert!(leader.components.health.is_some());

        for member in &ids[1..] {
            let member = world.get_entity(*member).unwrap();
            assert_eq!(member.components.attached.unwrap().leader, ids[0]);
            assert!(member.position.x > 0.0);
        }
    }

    #[test]
    fn catalog_resolves_registered_items() {
        let mut catalog = SpawnCatalog::new();
        catalog.register(CloudItem::new("ammonia", 100.0));
        catalog.register(ChunkItem::new("small iron", 1.0));

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.resolve("cloud:ammonia").unwrap().key(), "cloud:ammonia");
        assert!(matches!(
            catalog.resolve("cloud:oxytoxy"),
            Err(SimError::UnknownSpawnItem(_))
        ));
    }
}
