//! The Marchlands simulation core.
//!
//! Deterministic daily-tick engines (markets, diplomacy, lords, upkeep)
//! around a [`session::Session`] that owns one campaign, plus the
//! [`provider::GenerativeProvider`] seam for narrated content. Everything
//! here is pure state-in, state-out; persistence and transport live with
//! the callers.

pub mod actions;
pub mod battle;
pub mod config;
pub mod delegate;
pub mod diplomacy;
pub mod error;
pub mod lords;
pub mod market;
pub mod progression;
pub mod provider;
pub mod session;
pub mod skill;
pub mod tick;
pub mod travel;
pub mod upkeep;

#[cfg(test)]
pub(crate) mod testutil;

pub use actions::ActionError;
pub use config::SimConfig;
pub use error::EngineError;
pub use provider::{GenerativeProvider, ProviderError, ProviderReply, StubProvider};
pub use session::{Session, TravelOutcome};
