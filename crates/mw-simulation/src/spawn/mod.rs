//! Procedural spawning around a moving reference point.
//!
//! The world is divided into square grid cells. Each cell near the
//! reference triggers one spawn event the first time it is seen; items are
//! drawn from shuffled [`SpawnBag`]s, queued, and realized a few per step.
//! Tracked entities that leave the window around the reference are
//! despawned under a per-step budget.

mod bag;
mod grid;
mod item;
mod state;
mod system;

pub use bag::SpawnBag;
pub use grid::{DespawnWindow, GridCell, VisitedCells};
pub use item::{ChunkItem, CloudItem, MicrobeItem, SpawnCatalog, SpawnItem};
pub use state::{PendingPlacement, SpawnSaveState};
pub use system::{SpawnReport, SpawnSystem};
