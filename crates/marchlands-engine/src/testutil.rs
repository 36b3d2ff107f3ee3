//! Shared fixtures for engine tests.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::float_cmp)]

use std::collections::BTreeMap;

use marchlands_types::{CharacterBackground, CompanionId, Player};
use marchlands_world::WorldState;

/// A level-one player with a modest purse and no holdings.
pub fn test_player() -> Player {
    Player {
        name: "Aeric".into(),
        backstory: "A wanderer of the marches.".into(),
        background: CharacterBackground::Nomad,
        gold: 1000,
        renown: 10,
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

/// Put a seeded companion straight into the player's party.
pub fn recruit_companion(world: &mut WorldState, player: &mut Player, slug: &str) {
    let id = CompanionId::from(slug);
    world.companion_mut(&id).unwrap().recruited = true;
    player.companions.push(id);
}
