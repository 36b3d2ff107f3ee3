//! The generative-content provider boundary.
//!
//! Everything narrated rather than simulated (characters, battles,
//! quests, rumors, road events) comes through the [`GenerativeProvider`]
//! trait. The engine treats the provider as untrusted: any failure or
//! malformed reply degrades the calling operation instead of corrupting
//! state, and rate limiting is distinct so the delegate can stand down.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use marchlands_types::{
    BattleResult, CharacterBackground, FactionId, GeneratedCharacter, LocationId, Quest,
    TravelEvent, UnitId,
};

/// Errors from the content provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider could not be reached or answered with an error.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider is rate limiting; callers should stop hammering it.
    #[error("provider rate limited")]
    RateLimited,

    /// The reply parsed but failed shape or id validation.
    #[error("malformed provider payload: {0}")]
    Malformed(String),
}

/// A provider reply: the payload, if one validated, and the tokens spent
/// getting it.
#[derive(Debug, Clone)]
pub struct ProviderReply<T> {
    /// The validated payload; `None` when the provider had nothing usable.
    pub data: Option<T>,
    /// Tokens consumed by the call.
    pub tokens: u64,
}

impl<T> ProviderReply<T> {
    /// A reply carrying nothing, costing nothing.
    pub const fn empty() -> Self {
        Self {
            data: None,
            tokens: 0,
        }
    }
}

/// Everything the provider needs to adjudicate a battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleRequest {
    /// Name of the opposing party.
    pub enemy_name: String,
    /// Size of the opposing party.
    pub enemy_size: u32,
    /// The player's fit troops.
    pub army: BTreeMap<UnitId, u32>,
    /// Names of companions riding with the player.
    pub companion_names: Vec<String>,
    /// Player level, for flavor and scaling.
    pub player_level: u32,
    /// Effective tactics level.
    pub tactics: u32,
    /// Effective surgery level (converts deaths to wounds).
    pub surgery: u32,
    /// Additive companion looting bonus (richer loot).
    pub looting: u32,
    /// The active quest's hunted party, if the fight might touch it.
    pub quest_enemy_name: Option<String>,
}

/// Everything the provider needs to write a quest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestRequest {
    /// Settlement where the quest is offered.
    pub location_name: String,
    /// Who gives the quest.
    pub giver: String,
    /// Faction whose standing the quest affects.
    pub faction_id: FactionId,
    /// Other settlements a delivery could target, id and display name.
    pub destinations: Vec<(LocationId, String)>,
    /// Player renown, for scaling the offer.
    pub player_renown: u32,
}

/// Everything the provider needs to narrate a road event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelEventRequest {
    /// Settlement left behind.
    pub from_name: String,
    /// Settlement ahead.
    pub to_name: String,
    /// Player gold, so stakes stay sensible.
    pub player_gold: u32,
    /// Player troops, fit and wounded.
    pub player_troops: u32,
}

/// The generative-content provider.
///
/// Implementations call out to a model; [`StubProvider`] answers nothing
/// and keeps the simulation fully offline.
pub trait GenerativeProvider {
    /// Whether this provider can actually produce content.
    ///
    /// Offline stubs return false, which disables optional content such
    /// as road events rather than failing operations.
    fn is_live(&self) -> bool;

    /// Check the provider's credentials with a minimal call.
    fn verify(&self) -> impl Future<Output = Result<bool, ProviderError>>;

    /// Write a new character for the chosen background.
    fn generate_character(
        &self,
        background: CharacterBackground,
    ) -> impl Future<Output = Result<ProviderReply<GeneratedCharacter>, ProviderError>>;

    /// Adjudicate a battle.
    fn simulate_battle(
        &self,
        request: &BattleRequest,
    ) -> impl Future<Output = Result<ProviderReply<BattleResult>, ProviderError>>;

    /// Write a quest offer.
    fn generate_quest(
        &self,
        request: &QuestRequest,
    ) -> impl Future<Output = Result<ProviderReply<Quest>, ProviderError>>;

    /// Where the hunted bounty party moved. Must name a real settlement
    /// from `candidates` or nothing.
    fn bounty_destination(
        &self,
        quest: &Quest,
        candidates: &[LocationId],
    ) -> impl Future<Output = Result<ProviderReply<Option<LocationId>>, ProviderError>>;

    /// A line of tavern gossip.
    fn tavern_rumor(
        &self,
        location_name: &str,
    ) -> impl Future<Output = Result<ProviderReply<String>, ProviderError>>;

    /// A happening on the road.
    fn travel_event(
        &self,
        request: &TravelEventRequest,
    ) -> impl Future<Output = Result<ProviderReply<TravelEvent>, ProviderError>>;
}

/// An offline provider that produces no content.
///
/// Useful for tests and for playing the pure simulation without a model:
/// every call succeeds with an empty reply, so callers take their
/// no-content paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubProvider;

impl GenerativeProvider for StubProvider {
    fn is_live(&self) -> bool {
        false
    }

    async fn verify(&self) -> Result<bool, ProviderError> {
        Ok(false)
    }

    async fn generate_character(
        &self,
        _background: CharacterBackground,
    ) -> Result<ProviderReply<GeneratedCharacter>, ProviderError> {
        Ok(ProviderReply::empty())
    }

    async fn simulate_battle(
        &self,
        _request: &BattleRequest,
    ) -> Result<ProviderReply<BattleResult>, ProviderError> {
        Ok(ProviderReply::empty())
    }

    async fn generate_quest(
        &self,
        _request: &QuestRequest,
    ) -> Result<ProviderReply<Quest>, ProviderError> {
        Ok(ProviderReply::empty())
    }

    async fn bounty_destination(
        &self,
        _quest: &Quest,
        _candidates: &[LocationId],
    ) -> Result<ProviderReply<Option<LocationId>>, ProviderError> {
        Ok(ProviderReply::empty())
    }

    async fn tavern_rumor(
        &self,
        _location_name: &str,
    ) -> Result<ProviderReply<String>, ProviderError> {
        Ok(ProviderReply::empty())
    }

    async fn travel_event(
        &self,
        _request: &TravelEventRequest,
    ) -> Result<ProviderReply<TravelEvent>, ProviderError> {
        Ok(ProviderReply::empty())
    }
}
