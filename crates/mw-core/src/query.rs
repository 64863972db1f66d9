use crate::component::ComponentSet;
use crate::entity::{Entity, EntityId, EntityKind};
use crate::world::World;

/// A builder for filtering and searching entities in a world.
pub struct QueryBuilder<'w> {
    world: &'w World,
    kind_filter: Option<EntityKind>,
    group_filters: Vec<String>,
    name_contains: Option<String>,
    component_filters: Vec<fn(&ComponentSet) -> bool>,
    limit: Option<usize>,
    offset: usize,
}

impl<'w> QueryBuilder<'w> {
    /// A query over every entity in `world`.
    pub fn new(world: &'w World) -> Self {
        Self {
            world,
            kind_filter: None,
            group_filters: Vec::new(),
            name_contains: None,
            component_filters: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    /// Filter by entity kind.
    pub fn kind(mut self, kind: EntityKind) -> Self {
        self.kind_filter = Some(kind);
        self
    }

    /// Filter to members of a group. Repeated calls require all groups.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group_filters.push(group.into());
        self
    }

    /// Filter to entities whose name contains the given substring (case-insensitive).
    pub fn name_contains(mut self, s: impl Into<String>) -> Self {
        self.name_contains = Some(s.into().to_lowercase());
        self
    }

    /// Filter on component presence, e.g. `.with(|c| c.health.is_some())`.
    pub fn with(mut self, predicate: fn(&ComponentSet) -> bool) -> Self {
        self.component_filters.push(predicate);
        self
    }

    /// Limit the number of results.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, n: usize) -> Self {
        self.offset = n;
        self
    }

    /// Execute the query and return matching entities in ID order.
    pub fn execute(self) -> Vec<&'w Entity> {
        let matching = self
            .world
            .all_entities()
            .filter(|e| self.matches(e))
            .skip(self.offset);
        match self.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }

    /// IDs of matching entities in ascending order, for callers that go on
    /// to mutate the world.
    pub fn ids(self) -> Vec<EntityId> {
        self.execute().into_iter().map(|e| e.id).collect()
    }

    /// Count matching entities without collecting them.
    pub fn count(self) -> usize {
        self.world
            .all_entities()
            .filter(|e| self.matches(e))
            .count()
    }

    fn matches(&self, entity: &Entity) -> bool {
        if let Some(ref kind) = self.kind_filter
            && entity.kind != *kind
        {
            return false;
        }

        if !self.group_filters.iter().all(|g| entity.is_in_group(g)) {
            return false;
        }

        if let Some(ref s) = self.name_contains
            && !entity.name.to_lowercase().contains(s)
        {
            return false;
        }

        self.component_filters
            .iter()
            .all(|predicate| predicate(&entity.components))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{HealthComponent, SpawnedComponent};
    use crate::entity::SPAWNED_GROUP;

    fn test_world() -> World {
        let mut world = World::new();

        let mut player = Entity::new(EntityKind::Player, "Player Cell");
        player.components.health = Some(HealthComponent::new(100.0));
        world.add_entity(player).unwrap();

        let mut rival = Entity::new(EntityKind::Microbe, "Rival Cell").in_group(SPAWNED_GROUP);
        rival.components.health = Some(HealthComponent::new(50.0));
        rival.components.spawned = Some(SpawnedComponent {
            despawn_radius: 10.0,
        });
        world.add_entity(rival).unwrap();

        let mut chunk = Entity::new(EntityKind::Chunk, "Iron Chunk").in_group(SPAWNED_GROUP);
        chunk.components.spawned = Some(SpawnedComponent {
            despawn_radius: 10.0,
        });
        world.add_entity(chunk).unwrap();

        world
    }

    #[test]
    fn query_by_kind() {
        let world = test_world();
        let results = world.query().kind(EntityKind::Microbe).execute();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Rival Cell");
    }

    #[test]
    fn query_by_group_and_component() {
        let world = test_world();
        let results = world
            .query()
            .group(SPAWNED_GROUP)
            .with(|c| c.health.is_some())
            .execute();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].kind, EntityKind::Microbe);
    }

    #[test]
    fn query_ids_follow_entity_order() {
        let world = test_world();
        let ids = world.query().group(SPAWNED_GROUP).ids();
        assert_eq!(ids.len(), 2);
        assert!(ids[0] < ids[1]);
        assert_eq!(ids, world.ids_in_group(SPAWNED_GROUP));
    }

    #[test]
    fn query_by_name_contains() {
        let world = test_world();
        assert_eq!(world.query().name_contains("cell").count(), 2);
    }

    #[test]
    fn query_with_limit_and_offset() {
        let world = test_world();
        assert_eq!(world.query().execute().len(), 3);
        assert_eq!(world.query().limit(2).execute().len(), 2);

        let offset = world.query().offset(1).limit(1).execute();
        assert_eq!(offset.len(), 1);
        assert_eq!(offset[0].name, "Rival Cell");
    }
}
