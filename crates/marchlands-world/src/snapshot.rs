//! The single-document save format.
//!
//! A [`SaveGame`] serializes the entire campaign. Optional sections carry
//! serde defaults so older or trimmed documents still load; a document
//! missing the player or the current location fails to deserialize and is
//! treated as corrupt by the caller.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use marchlands_types::{
    AiLord, Companion, CompanionId, FactionId, Location, LocationId, LogEntry, LordId, Player,
    TokenUsage,
};

use crate::templates;
use crate::world::WorldState;

const fn default_day() -> u64 {
    1
}

/// A complete campaign snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveGame {
    /// The player character. Required; absence makes the document corrupt.
    pub player: Player,
    /// Where the player currently stands. Required.
    pub current_location_id: LocationId,
    /// Current day.
    #[serde(default = "default_day")]
    pub day: u64,
    /// All settlements.
    #[serde(default = "templates::starting_locations")]
    pub locations: BTreeMap<LocationId, Location>,
    /// All lords.
    #[serde(default = "templates::starting_lords")]
    pub lords: BTreeMap<LordId, AiLord>,
    /// All companions.
    #[serde(default = "templates::starting_companions")]
    pub companions: BTreeMap<CompanionId, Companion>,
    /// War table; defaults to the day-one belligerents.
    #[serde(default = "templates::initial_wars")]
    pub wars: BTreeMap<FactionId, BTreeSet<FactionId>>,
    /// Relation table; defaults to the day-one standings.
    #[serde(default = "templates::initial_relations")]
    pub faction_relations: BTreeMap<FactionId, BTreeMap<FactionId, f64>>,
    /// Game log history.
    #[serde(default)]
    pub log: Vec<LogEntry>,
    /// Next log id to assign.
    #[serde(default)]
    pub log_id_counter: u64,
    /// Whether the delegate was running when the game was saved.
    #[serde(default)]
    pub delegated: bool,
    /// Provider token accounting.
    #[serde(default)]
    pub token_usage: TokenUsage,
}

impl SaveGame {
    /// Capture a snapshot from live state.
    pub fn capture(
        world: &WorldState,
        player: &Player,
        current_location_id: &LocationId,
        log: &[LogEntry],
        log_id_counter: u64,
        delegated: bool,
        token_usage: TokenUsage,
    ) -> Self {
        Self {
            player: player.clone(),
            current_location_id: current_location_id.clone(),
            day: world.day,
            locations: world.locations.clone(),
            lords: world.lords.clone(),
            companions: world.companions.clone(),
            wars: world.wars().clone(),
            faction_relations: world.relations().clone(),
            log: log.to_vec(),
            log_id_counter,
            delegated,
            token_usage,
        }
    }

    /// Split the snapshot back into a world and the session-owned pieces.
    pub fn restore(self) -> (WorldState, RestoredSession) {
        let world = WorldState::from_parts(
            self.day,
            self.locations,
            self.lords,
            self.companions,
            self.wars,
            self.faction_relations,
        );
        let session = RestoredSession {
            player: self.player,
            current_location_id: self.current_location_id,
            log: self.log,
            log_id_counter: self.log_id_counter,
            delegated: self.delegated,
            token_usage: self.token_usage,
        };
        (world, session)
    }
}

/// The session-owned half of a restored snapshot.
#[derive(Debug, Clone)]
pub struct RestoredSession {
    /// The player character.
    pub player: Player,
    /// Where the player stands.
    pub current_location_id: LocationId,
    /// Game log history.
    pub log: Vec<LogEntry>,
    /// Next log id to assign.
    pub log_id_counter: u64,
    /// Whether delegation was active.
    pub delegated: bool,
    /// Provider token accounting.
    pub token_usage: TokenUsage,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::float_cmp)]

    use super::*;
    use marchlands_types::CharacterBackground;

    fn test_player() -> Player {
        Player {
            name: "Aeric".into(),
            backstory: "A wanderer.".into(),
            background: CharacterBackground::Nomad,
            gold: 1200,
            renown: 15,
            level: 1,
            xp: 0,
            skill_points: 1,
            skills: BTreeMap::new(),
            unit_experience: BTreeMap::new(),
            faction_id: None,
            army: BTreeMap::new(),
            wounded_army: BTreeMap::new(),
            inventory: BTreeMap::new(),
            equipment: BTreeMap::new(),
            active_quest: None,
            faction_relations: BTreeMap::new(),
            companions: Vec::new(),
            enterprises: Vec::new(),
            fiefs: Vec::new(),
            hp: 100,
            is_wounded: false,
        }
    }

    #[test]
    fn full_snapshot_roundtrips() {
        let world = WorldState::new();
        let player = test_player();
        let current = templates::start_location();
        let save = SaveGame::capture(&world, &player, &current, &[], 0, false, TokenUsage::default());

        let json = serde_json::to_string(&save).unwrap();
        let restored: SaveGame = serde_json::from_str(&json).unwrap();
        let (world2, session) = restored.restore();

        assert_eq!(world2.day, world.day);
        assert_eq!(world2.locations, world.locations);
        assert_eq!(session.player, player);
        assert_eq!(session.current_location_id, current);
    }

    #[test]
    fn minimal_document_fills_defaults() {
        let player_json = serde_json::to_string(&test_player()).unwrap();
        let doc = format!(
            "{{\"player\":{player_json},\"current_location_id\":\"westmere\"}}"
        );
        let save: SaveGame = serde_json::from_str(&doc).unwrap();
        assert_eq!(save.day, 1);
        assert_eq!(save.locations, templates::starting_locations());
        assert!(save.log.is_empty());
        assert!(!save.delegated);
        assert_eq!(save.token_usage, TokenUsage::default());
        // The seeded war survives the defaulting path.
        assert!(
            save.wars
                .get(&FactionId::Velhart)
                .unwrap()
                .contains(&FactionId::Norden)
        );
    }

    #[test]
    fn document_without_player_is_corrupt() {
        let doc = "{\"current_location_id\":\"westmere\",\"day\":4}";
        let result: Result<SaveGame, _> = serde_json::from_str(doc);
        assert!(result.is_err());
    }

    #[test]
    fn document_without_location_is_corrupt() {
        let player_json = serde_json::to_string(&test_player()).unwrap();
        let doc = format!("{{\"player\":{player_json}}}");
        let result: Result<SaveGame, _> = serde_json::from_str(&doc);
        assert!(result.is_err());
    }
}
