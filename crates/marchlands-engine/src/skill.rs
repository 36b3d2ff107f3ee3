//! Skill resolution across the player's party.
//!
//! Personal skills read the player's own sheet; party-pooled support
//! skills take the best level among the player and unwounded recruited
//! companions. A wounded character contributes nothing, and a wounded
//! player's own levels are zeroed entirely.

use marchlands_types::{Player, SkillId};
use marchlands_world::WorldState;

/// The level at which a skill applies to the party right now.
pub fn effective_skill(player: &Player, world: &WorldState, skill: SkillId) -> u32 {
    let own = if player.is_wounded {
        0
    } else {
        player.skill(skill)
    };
    if !skill.is_party_pooled() {
        return own;
    }
    party_members(player, world)
        .map(|c| c.skill(skill))
        .fold(own, u32::max)
}

/// Additive companion bonus for trade and looting style skills.
pub fn companion_skill_sum(player: &Player, world: &WorldState, skill: SkillId) -> u32 {
    party_members(player, world)
        .map(|c| c.skill(skill))
        .fold(0, u32::saturating_add)
}

fn party_members<'a>(
    player: &'a Player,
    world: &'a WorldState,
) -> impl Iterator<Item = &'a marchlands_types::Companion> {
    player
        .companions
        .iter()
        .filter_map(|id| world.companions.get(id))
        .filter(|c| c.recruited && !c.is_wounded)
}
