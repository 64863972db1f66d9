//! Core types for Microbe World: entities, components, and the entity store.
//!
//! This crate is the data model every simulation system operates on. It has
//! no knowledge of scheduling, threading, or randomness: a [`World`] can be
//! built and inspected programmatically, and entities serialize to JSON.
//!
//! The [`hex`] and [`layout`] modules hold the axial hex geometry used to
//! describe cell bodies and the organelle layout that enforces
//! non-overlapping placement.

/// Typed component data (spawn tracking, health, motion, cell bodies, etc.).
pub mod component;
/// Entity types, identifiers, and group names.
pub mod entity;
/// Error types used throughout the crate.
pub mod error;
/// Axial hex coordinates and conversions.
pub mod hex;
/// Organelle layouts on a hex grid.
pub mod layout;
/// Query builder for filtering entities.
pub mod query;
/// The entity store that owns all entities and their group memberships.
pub mod world;

/// Re-export core entity types.
pub use entity::{Entity, EntityId, EntityKind};
/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export hex coordinates.
pub use hex::Hex;
/// Re-export layout types.
pub use layout::{
    OrganelleDefinition, OrganelleLayout, PlacedOrganelle, PositionedOrganelle, hex_radius,
};
/// Re-export the entity store.
pub use world::World;

/// Re-export of the vector type used for world positions.
pub use glam::Vec3;
