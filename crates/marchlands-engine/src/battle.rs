//! Applying a resolved battle to the campaign.
//!
//! The provider narrates and adjudicates; this module does the
//! bookkeeping. Reported losses and wounds are clamped to the troops the
//! player actually has, so counts stay conserved and never go negative no
//! matter what the payload claims.

use tracing::warn;

use marchlands_types::{
    BattleOutcome, BattleResult, LogEvent, LogKind, Player, QuestKind, QuestStatus, SkillId,
};
use marchlands_world::WorldState;

use crate::config::SimConfig;
use crate::progression::grant_player_xp;
use crate::skill::{companion_skill_sum, effective_skill};

/// Apply a battle result to the player and the world.
pub fn apply_battle(
    world: &mut WorldState,
    player: &mut Player,
    result: &BattleResult,
    config: &SimConfig,
) -> Vec<LogEvent> {
    let mut events = vec![LogEvent::new(LogKind::Battle, result.narrative.clone())];

    // Deaths first, then wounds, each clamped to what is actually there.
    for (unit, reported) in &result.player_losses {
        let have = player.army.get(unit).copied().unwrap_or(0);
        let lost = (*reported).min(have);
        if lost < *reported {
            warn!(unit = unit.as_str(), reported, have, "loss count clamped");
        }
        set_or_prune(player, *unit, have.saturating_sub(lost));
    }
    for (unit, reported) in &result.player_wounded {
        let have = player.army.get(unit).copied().unwrap_or(0);
        let wounded = (*reported).min(have);
        set_or_prune(player, *unit, have.saturating_sub(wounded));
        if wounded > 0 {
            let line = player.wounded_army.entry(*unit).or_insert(0);
            *line = line.saturating_add(wounded);
        }
    }

    match result.outcome {
        BattleOutcome::Victory => {
            player.renown = player.renown.saturating_add(config.progression.victory_renown);
            // Companions with an eye for plunder stretch the take.
            let looting = companion_skill_sum(player, world, SkillId::Looting);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let loot = (f64::from(result.gold_looted) * (1.0 + f64::from(looting) / 100.0))
                .round() as u32;
            player.add_gold(loot);
            events.push(LogEvent::new(
                LogKind::Battle,
                format!(
                    "Victory! You gain {} renown and recover {loot} gold from the field.",
                    config.progression.victory_renown
                ),
            ));
        }
        BattleOutcome::Defeat => {
            player.renown = player
                .renown
                .saturating_sub(config.progression.defeat_renown_penalty);
            events.push(LogEvent::new(
                LogKind::Battle,
                format!(
                    "Defeat. Your renown suffers ({} lost).",
                    config.progression.defeat_renown_penalty
                ),
            ));
        }
        BattleOutcome::Draw => {
            events.push(LogEvent::new(
                LogKind::Battle,
                "Both sides withdraw, bloodied and unbroken.",
            ));
        }
    }

    if result.player_defeated {
        player.wound_to(1);
        for companion_id in player.companions.clone() {
            if let Ok(companion) = world.companion_mut(&companion_id) {
                companion.wound_to(1);
            }
        }
        events.push(LogEvent::new(
            LogKind::Battle,
            "You were struck down and carried from the field by your companions.",
        ));
    }

    // Quest progress reported with the battle.
    if let Some(update) = &result.quest_update {
        events.push(LogEvent::new(LogKind::Quest, update.narrative.clone()));
        if update.completed {
            events.extend(complete_bounty(world, player, config));
        }
    }

    // Survivors split the training xp evenly, then each unit pool is
    // credited per surviving troop.
    let survivors: u32 = player.army.values().sum();
    let party = u32::try_from(player.companions.len()).unwrap_or(u32::MAX);
    let denominator = survivors.saturating_add(party);
    if result.xp_gained > 0 && denominator > 0 {
        let per_survivor = result.xp_gained / denominator;
        if per_survivor > 0 {
            let grants: Vec<_> = player
                .army
                .iter()
                .map(|(unit, count)| (*unit, per_survivor.saturating_mul(*count)))
                .collect();
            for (unit, xp) in grants {
                let pool = player.unit_experience.entry(unit).or_insert(0);
                *pool = pool.saturating_add(xp);
            }
        }
    }

    events.extend(grant_player_xp(
        player,
        result.player_xp_gained,
        &config.progression,
    ));

    events
}

fn set_or_prune(player: &mut Player, unit: marchlands_types::UnitId, count: u32) {
    if count == 0 {
        player.army.remove(&unit);
    } else {
        player.army.insert(unit, count);
    }
}

/// Pay out the active bounty quest.
fn complete_bounty(
    world: &mut WorldState,
    player: &mut Player,
    config: &SimConfig,
) -> Vec<LogEvent> {
    let Some(quest) = player.active_quest.clone() else {
        return Vec::new();
    };
    if quest.kind != QuestKind::Bounty || quest.status != QuestStatus::Active {
        return Vec::new();
    }
    let persuasion = effective_skill(player, world, SkillId::Persuasion);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let reward = (f64::from(quest.reward_gold)
        * (1.0 + f64::from(persuasion) * config.actions.persuasion_rate))
        .round() as u32;
    player.add_gold(reward);
    player.renown = player.renown.saturating_add(quest.reward_renown);
    player.shift_relation(quest.faction_id, config.actions.bounty_relation_bonus);
    player.active_quest = None;

    let mut events = vec![LogEvent::new(
        LogKind::Quest,
        format!(
            "Bounty fulfilled: \"{}\". You collect {reward} gold and {} renown.",
            quest.title, quest.reward_renown
        ),
    )];
    events.extend(grant_player_xp(
        player,
        quest
            .reward_renown
            .saturating_mul(config.progression.quest_xp_per_renown),
        &config.progression,
    ));
    events
}
