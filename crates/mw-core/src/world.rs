use std::collections::{BTreeMap, BTreeSet};

use crate::entity::{Entity, EntityId, EntityKind};
use crate::error::{CoreError, CoreResult};
use crate::query::QueryBuilder;

/// The central entity store. Owns all entities and their group memberships.
///
/// Iteration is always in ID order, so anything that walks the world
/// (despawn sweeps, counting systems, reports) is deterministic.
#[derive(Debug, Clone)]
pub struct World {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u64,

    // Indexes
    by_kind: BTreeMap<EntityKind, BTreeSet<EntityId>>,
    groups: BTreeMap<String, BTreeSet<EntityId>>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// An empty world.
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
            by_kind: BTreeMap::new(),
            groups: BTreeMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Entity CRUD
    // -----------------------------------------------------------------------

    /// Add an entity to the world. Returns the entity's ID.
    ///
    /// Entities built with [`Entity::new`] get a fresh ID. An entity that
    /// already carries an ID keeps it, unless that ID is taken.
    pub fn add_entity(&mut self, mut entity: Entity) -> CoreResult<EntityId> {
        if entity.id.is_assigned() {
            if self.entities.contains_key(&entity.id) {
                return Err(CoreError::DuplicateEntity(entity.id));
            }
            self.next_id = self.next_id.max(entity.id.0 + 1);
        } else {
            entity.id = EntityId(self.next_id);
            self.next_id += 1;
        }

        let id = entity.id;
        self.by_kind
            .entry(entity.kind.clone())
            .or_default()
            .insert(id);
        for group in &entity.groups {
            self.groups.entry(group.clone()).or_default().insert(id);
        }
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Get a reference to an entity by ID.
    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    ///
    /// Group membership can't be changed through this reference; use
    /// [`add_to_group`](Self::add_to_group) instead.
    pub fn get_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// True if an entity with this id exists.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Remove an entity and release its group memberships.
    pub fn remove_entity(&mut self, id: EntityId) -> CoreResult<Entity> {
        let entity = self
            .entities
            .remove(&id)
            .ok_or(CoreError::EntityNotFound(id))?;

        if let Some(ids) = self.by_kind.get_mut(&entity.kind) {
            ids.remove(&id);
        }
        for group in &entity.groups {
            if let Some(ids) = self.groups.get_mut(group) {
                ids.remove(&id);
            }
        }
        Ok(entity)
    }

    // -----------------------------------------------------------------------
    // Groups
    // -----------------------------------------------------------------------

    /// Put an entity in a group. Returns false if it already was a member.
    pub fn add_to_group(&mut self, id: EntityId, group: &str) -> CoreResult<bool> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(CoreError::EntityNotFound(id))?;
        if entity.is_in_group(group) {
            return Ok(false);
        }
        entity.groups.push(group.to_string());
        self.groups.entry(group.to_string()).or_default().insert(id);
        Ok(true)
    }

    /// Take an entity out of a group. Returns false if it wasn't a member.
    pub fn remove_from_group(&mut self, id: EntityId, group: &str) -> CoreResult<bool> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(CoreError::EntityNotFound(id))?;
        let before = entity.groups.len();
        entity.groups.retain(|g| g != group);
        if entity.groups.len() == before {
            return Ok(false);
        }
        if let Some(ids) = self.groups.get_mut(group) {
            ids.remove(&id);
        }
        Ok(true)
    }

    /// IDs of the members of a group, in ID order.
    pub fn ids_in_group(&self, group: &str) -> Vec<EntityId> {
        self.groups
            .get(group)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Members of a group, in ID order.
    pub fn entities_in_group<'a>(&'a self, group: &str) -> impl Iterator<Item = &'a Entity> + use<'a> {
        self.groups
            .get(group)
            .into_iter()
            .flatten()
            .filter_map(|id| self.entities.get(id))
    }

    /// Number of entities in a group.
    pub fn group_len(&self, group: &str) -> usize {
        self.groups.get(group).map_or(0, BTreeSet::len)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Get all entities of a specific kind.
    pub fn entities_by_kind(&self, kind: &EntityKind) -> Vec<&Entity> {
        self.by_kind
            .get(kind)
            .map(|ids| ids.iter().filter_map(|id| self.entities.get(id)).collect())
            .unwrap_or_default()
    }

    /// Iterate over all entities in ID order.
    pub fn all_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Iterate mutably over all entities in ID order.
    pub fn all_entities_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// All entity ids, ascending.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Number of entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of entities per kind. Kinds with no entities are omitted.
    pub fn entity_counts_by_kind(&self) -> BTreeMap<EntityKind, usize> {
        self.by_kind
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(kind, ids)| (kind.clone(), ids.len()))
            .collect()
    }

    /// Start building a query.
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }
}
