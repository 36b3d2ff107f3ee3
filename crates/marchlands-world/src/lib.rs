//! Geography, content templates, and aggregate state for the Marchlands
//! simulation.
//!
//! # Modules
//!
//! - [`templates`] -- Hand-authored starting content and def tables
//! - [`world`] -- The [`WorldState`] aggregate with symmetric diplomacy
//!   accessors
//! - [`snapshot`] -- The single-document save format
//! - [`error`] -- World lookup errors

pub mod error;
pub mod snapshot;
pub mod templates;
pub mod world;

pub use error::WorldError;
pub use snapshot::{RestoredSession, SaveGame};
pub use world::WorldState;
