//! Error types for the simulation core.

use marchlands_world::WorldError;

use crate::actions::ActionError;
use crate::provider::ProviderError;

/// Errors that can surface from a session operation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Another operation is already in flight.
    #[error("another operation is already in progress")]
    Busy,

    /// The operation needs a living player character.
    #[error("no character has been created yet")]
    NoCharacter,

    /// No pending choice or offer is waiting on the player.
    #[error("nothing is awaiting your decision")]
    NothingPending,

    /// A player action was rejected; the message is player-facing.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// A world lookup failed.
    #[error(transparent)]
    World(#[from] WorldError),

    /// The content provider failed or returned garbage.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Configuration is invalid or unreadable.
    #[error("config error: {0}")]
    Config(String),

    /// A save document failed to serialize or deserialize.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}
