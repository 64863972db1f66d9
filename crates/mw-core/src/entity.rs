use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::component::ComponentSet;

/// Group that marks entities owned by the spawn/despawn manager.
pub const SPAWNED_GROUP: &str = "spawned";

/// Unique identifier for every entity in the world.
///
/// IDs are handed out by [`World`](crate::World) in increasing order, so
/// sorting by ID yields creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Placeholder carried by entities that have not been added to a world yet.
    pub const UNASSIGNED: Self = Self(0);

    /// Returns true if a world has assigned this ID.
    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of an entity. Extensible via `Custom(String)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A single cell, AI controlled or the player.
    Microbe,
    /// A floating chunk of material that dissolves into compounds.
    Chunk,
    /// A cloud of a dissolved compound.
    CompoundCloud,
    /// The player-controlled reference entity.
    Player,
    /// Anything else.
    Custom(String),
}

impl EntityKind {
    /// Parse a kind from its display name. Unknown names become `Custom`.
    pub fn parse(s: &str) -> Self {
        match s {
            "microbe" => Self::Microbe,
            "chunk" => Self::Chunk,
            "compound_cloud" | "cloud" => Self::CompoundCloud,
            "player" => Self::Player,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Microbe => write!(f, "microbe"),
            Self::Chunk => write!(f, "chunk"),
            Self::CompoundCloud => write!(f, "compound_cloud"),
            Self::Player => write!(f, "player"),
            Self::Custom(s) => write!(f, "{s}"),
        }
    }
}

/// Core entity struct. Every simulated object is an Entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Identifier, assigned when the entity is added to a world.
    pub id: EntityId,
    /// The kind (type) of this entity.
    pub kind: EntityKind,
    /// Display name, not required to be unique.
    pub name: String,
    /// World-space position. Gameplay happens on the x/z plane.
    pub position: Vec3,
    /// Typed component data attached to this entity.
    pub components: ComponentSet,
    pub(crate) groups: Vec<String>,
}

impl Entity {
    /// Create a new entity at the origin.
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            kind,
            name: name.into(),
            position: Vec3::ZERO,
            components: ComponentSet::default(),
            groups: Vec::new(),
        }
    }

    /// Set the starting position.
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Add a group before the entity is inserted into a world.
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        let group = group.into();
        if !self.groups.contains(&group) {
            self.groups.push(group);
        }
        self
    }

    /// Groups this entity belongs to.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Returns true if the entity is a member of `group`.
    pub fn is_in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Position projected onto the gameplay plane (y = 0).
    pub fn planar_position(&self) -> Vec3 {
        Vec3::new(self.position.x, 0.0, self.position.z)
    }
}
