//! Shared type definitions for the Marchlands simulation.
//!
//! This crate is the single source of truth for all types used across the
//! Marchlands workspace.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe slug wrappers for authored and generated entities
//! - [`enums`] -- Closed content catalogs (goods, units, skills, factions)
//! - [`structs`] -- Core entity structs (player, lords, locations, quests)

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    BattleOutcome, CharacterBackground, EnterpriseKind, EquipmentSlot, FactionId, GoodId, ItemId,
    LocationStatus, LogKind, QuestKind, QuestStatus, SkillId, StockId, UnitId,
};
pub use ids::{CompanionId, LocationId, LordId, QuestId};
pub use structs::{
    AiLord, BattleResult, Companion, Enterprise, EventChoice, ForcedBattle, GeneratedCharacter,
    Location, LocationOwner, LogEntry, LogEvent, MarketGood, Player, Quest, QuestUpdate,
    TokenUsage, TravelEvent,
};
