use glam::Vec3;
use mw_core::EntityId;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

use crate::error::SimResult;
use crate::spawn::GridCell;

/// A placement waiting to be realized, with its item stored by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPlacement {
    /// Key of the queued item.
    pub item: String,
    /// Where it will appear.
    pub position: Vec3,
}

/// Everything needed to resume spawning exactly where it stopped.
///
/// Items are stored by [`key`](crate::spawn::SpawnItem::key) and looked up
/// in a [`SpawnCatalog`](crate::spawn::SpawnCatalog) on load. The RNG state
/// is included, so a restored system makes the same draws the saved one
/// would have made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnSaveState {
    /// Seconds simulated.
    pub elapsed: f32,
    /// Seconds since the last wanderer.
    pub wanderer_timer: f32,
    /// Full pool of the general bag, in insertion order.
    pub spawn_pool: Vec<String>,
    /// What is left of the general bag's current pass, in draw order.
    pub spawn_bag: Vec<String>,
    /// Full pool of the wanderer bag.
    pub wanderer_pool: Vec<String>,
    /// What is left of the wanderer bag's current pass.
    pub wanderer_bag: Vec<String>,
    /// Oldest first.
    pub visited: Vec<GridCell>,
    /// Queued placements, next first.
    pub pending: Vec<PendingPlacement>,
    /// Last entity the despawn sweep removed.
    pub despawn_cursor: Option<EntityId>,
    /// Random generator state.
    pub rng: ChaCha12Rng,
}

impl SpawnSaveState {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a state written by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
