//! Error types for world-state access.

use marchlands_types::{CompanionId, LocationId, LordId};

/// Errors raised by [`crate::WorldState`] accessors.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A location id does not exist on the map.
    #[error("unknown location: {id}")]
    UnknownLocation {
        /// The id that failed to resolve.
        id: LocationId,
    },

    /// A lord id does not exist.
    #[error("unknown lord: {id}")]
    UnknownLord {
        /// The id that failed to resolve.
        id: LordId,
    },

    /// A companion id does not exist.
    #[error("unknown companion: {id}")]
    UnknownCompanion {
        /// The id that failed to resolve.
        id: CompanionId,
    },
}
