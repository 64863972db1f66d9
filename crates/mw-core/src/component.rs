use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::hex::Hex;

/// The set of typed components attached to an entity.
/// Entities can hold any combination; systems select on presence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentSet {
    /// Despawn data, present on entities the spawn system tracks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawned: Option<SpawnedComponent>,
    /// Hitpoints and damage immunity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthComponent>,
    /// Behaviour state and steering input of a microbe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control: Option<MicrobeControlComponent>,
    /// Current velocity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion: Option<MotionComponent>,
    /// Countdown to automatic removal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timed_life: Option<TimedLifeComponent>,
    /// Organelle hexes of a cell body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell: Option<CellComponent>,
    /// Colony membership.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached: Option<AttachedComponent>,
    /// Chunk properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<ChunkComponent>,
    /// Compound cloud contents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud: Option<CloudComponent>,
}

// ---------------------------------------------------------------------------
// Spawn tracking
// ---------------------------------------------------------------------------

/// Data the despawn sweep needs for an entity it tracks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnedComponent {
    /// Distance beyond which the entity may be reclaimed.
    pub despawn_radius: f32,
}

// ---------------------------------------------------------------------------
// Microbes
// ---------------------------------------------------------------------------

/// Hitpoints of a living entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthComponent {
    /// Current hitpoints.
    pub hitpoints: f32,
    /// Hitpoints at full health.
    pub max_hitpoints: f32,
    /// Set by the mucocyst system each tick.
    pub invulnerable: bool,
}

impl HealthComponent {
    /// Full health, not invulnerable.
    pub fn new(max_hitpoints: f32) -> Self {
        Self {
            hitpoints: max_hitpoints,
            max_hitpoints,
            invulnerable: false,
        }
    }

    /// True once hitpoints reach zero.
    pub fn is_dead(&self) -> bool {
        self.hitpoints <= 0.0
    }
}

/// Behaviour state a microbe is currently in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MicrobeState {
    /// Moving and feeding.
    #[default]
    Normal,
    /// Trying to bind to a colony.
    Binding,
    /// Trying to engulf something.
    Engulf,
    /// Leaving a colony.
    Unbinding,
    /// Covered in a protective mucus shell; cannot be damaged.
    MucocystShield,
}

/// Steering input for a microbe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MicrobeControlComponent {
    /// Current behaviour state.
    pub state: MicrobeState,
    /// Desired movement direction (not normalized).
    pub movement_direction: Vec3,
}

/// Linear motion on the x/z plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionComponent {
    /// World units per second.
    pub velocity: Vec3,
}

/// Removes the entity after `remaining` seconds of simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedLifeComponent {
    /// Seconds left.
    pub remaining: f32,
}

/// Body of a cell: the hexes its organelles occupy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellComponent {
    /// Species the cell belongs to.
    pub species: String,
    /// Occupied hexes, relative to the cell centre.
    pub hexes: Vec<Hex>,
    /// Cached from `hexes` by the organelle fetch system.
    pub hex_count: usize,
    /// Cached from `hexes` by the organelle fetch system.
    pub radius: f32,
}

/// Membership in a colony led by another entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedComponent {
    /// Entity leading the colony.
    pub leader: EntityId,
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// A floating chunk of material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkComponent {
    /// Radius of the chunk.
    pub size: f32,
    /// Compounds released when the chunk dissolves.
    pub compounds: BTreeMap<String, f32>,
}

/// A cloud of a single compound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudComponent {
    /// Compound name.
    pub compound: String,
    /// Amount of the compound held.
    pub amount: f32,
}
