use crate::entity::EntityId;
use crate::hex::Hex;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur when manipulating the entity store or a layout.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The requested entity ID does not exist in the world.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// An entity with this ID is already stored.
    #[error("entity already exists: {0}")]
    DuplicateEntity(EntityId),

    /// An organelle would overlap an already placed one.
    #[error("organelle \"{name}\" can't be placed at {position}")]
    OrganelleOverlap {
        /// Name of the organelle definition.
        name: String,
        /// The requested anchor hex.
        position: Hex,
    },

    /// A generic validation error with a descriptive message.
    #[error("validation error: {0}")]
    Validation(String),
}
