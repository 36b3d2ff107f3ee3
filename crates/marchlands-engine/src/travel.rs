//! Arrival bookkeeping and road-event resolution.
//!
//! Moving between settlements is validated by the session; this module
//! handles what happens once the party is committed: the arrival itself,
//! delivery quests that complete at the gate, and the consequences of a
//! travel-event choice.

use tracing::info;

use marchlands_types::{
    ForcedBattle, LocationId, LogEvent, LogKind, Player, QuestKind, QuestStatus, SkillId,
    TravelEvent,
};
use marchlands_world::{WorldError, WorldState};

use crate::config::SimConfig;
use crate::progression::grant_player_xp;
use crate::skill::effective_skill;

/// Complete the party's arrival at a settlement.
///
/// Logs the arrival, warns when the gates belong to a realm the player's
/// faction is at war with, and pays out a delivery quest whose
/// destination this is, provided the goods are actually in the wagons.
pub fn arrive(
    world: &mut WorldState,
    player: &mut Player,
    destination: &LocationId,
    config: &SimConfig,
) -> Result<Vec<LogEvent>, WorldError> {
    let (name, local_faction) = {
        let location = world.location(destination)?;
        (location.name.clone(), location.faction_id)
    };
    info!(destination = destination.as_str(), "arrived");

    let mut events = vec![LogEvent::new(
        LogKind::Travel,
        format!("You arrive at {name}."),
    )];

    if let Some(own) = player.faction_id {
        if world.at_war(own, local_faction) {
            events.push(LogEvent::new(
                LogKind::Travel,
                format!(
                    "{name} flies the banners of {}, an enemy of your faction. Watch yourself.",
                    local_faction.display_name()
                ),
            ));
        }
    }

    events.extend(try_complete_delivery(world, player, destination, config));
    Ok(events)
}

/// Pay out an active delivery quest targeting this settlement, if the
/// cargo is on hand. Arriving short-handed leaves the quest open.
fn try_complete_delivery(
    world: &mut WorldState,
    player: &mut Player,
    here: &LocationId,
    config: &SimConfig,
) -> Vec<LogEvent> {
    let Some(quest) = player.active_quest.clone() else {
        return Vec::new();
    };
    if quest.kind != QuestKind::Delivery || quest.status != QuestStatus::Active {
        return Vec::new();
    }
    if quest.target_location_id.as_ref() != Some(here) {
        return Vec::new();
    }
    let (Some(good), Some(quantity)) = (quest.target_good, quest.target_quantity) else {
        return Vec::new();
    };
    if !player.try_remove_stock(good.into(), quantity) {
        return vec![LogEvent::new(
            LogKind::Quest,
            format!(
                "You reach the destination of \"{}\" without the {quantity} {} promised.",
                quest.title,
                good.display_name()
            ),
        )];
    }

    let persuasion = effective_skill(player, world, SkillId::Persuasion);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let reward = (f64::from(quest.reward_gold)
        * (1.0 + f64::from(persuasion) * config.actions.persuasion_rate))
        .round() as u32;
    player.add_gold(reward);
    player.renown = player.renown.saturating_add(quest.reward_renown);
    player.shift_relation(quest.faction_id, config.actions.delivery_relation_bonus);
    player.active_quest = None;

    let mut events = vec![LogEvent::new(
        LogKind::Quest,
        format!(
            "Delivery complete: \"{}\". You collect {reward} gold and {} renown.",
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

/// What a travel-event choice did to the journey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOutcome {
    /// Events to log.
    pub events: Vec<LogEvent>,
    /// A fight that interrupts the journey; the caller resolves it and
    /// the party does not arrive today.
    pub forced_battle: Option<ForcedBattle>,
}

/// Apply one choice of a travel event to the player.
///
/// Gold, renown, and items clamp at zero rather than going negative; a
/// hit that would drop hp to nothing leaves the player at 1 hp and
/// wounded instead.
pub fn apply_event_choice(
    player: &mut Player,
    event: &TravelEvent,
    choice_index: usize,
) -> Option<ChoiceOutcome> {
    let choice = event.choices.get(choice_index)?;
    let mut events = vec![LogEvent::new(
        LogKind::Event,
        choice.result_narrative.clone(),
    )];

    match u32::try_from(choice.gold_change) {
        Ok(gain) => player.add_gold(gain),
        Err(_) => {
            let loss = u32::try_from(choice.gold_change.unsigned_abs()).unwrap_or(u32::MAX);
            player.gold = player.gold.saturating_sub(loss);
        }
    }
    match u32::try_from(choice.renown_change) {
        Ok(gain) => player.renown = player.renown.saturating_add(gain),
        Err(_) => {
            let loss = u32::try_from(choice.renown_change.unsigned_abs()).unwrap_or(u32::MAX);
            player.renown = player.renown.saturating_sub(loss);
        }
    }
    match u32::try_from(choice.hp_change) {
        Ok(gain) => {
            if gain > 0 {
                player.heal(gain);
            }
        }
        Err(_) => {
            let loss = u32::try_from(choice.hp_change.unsigned_abs()).unwrap_or(u32::MAX);
            let remaining = player.hp.saturating_sub(loss);
            if remaining == 0 {
                player.wound_to(1);
                events.push(LogEvent::new(
                    LogKind::Event,
                    "Your wounds overcome you; you are carried onward, badly hurt.",
                ));
            } else {
                player.hp = remaining;
            }
        }
    }
    for (stock, delta) in &choice.item_changes {
        match u32::try_from(*delta) {
            Ok(gain) => player.add_stock(*stock, gain),
            Err(_) => {
                let loss = u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX);
                let removable = loss.min(player.stock(*stock));
                player.try_remove_stock(*stock, removable);
            }
        }
    }

    Some(ChoiceOutcome {
        events,
        forced_battle: choice.forced_battle.clone(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::float_cmp)]

    use super::*;
    use crate::testutil::test_player;
    use marchlands_types::{
        EventChoice, FactionId, GoodId, QuestId, StockId,
    };
    use std::collections::BTreeMap;

    fn delivery_quest(target: &str) -> marchlands_types::Quest {
        marchlands_types::Quest {
            id: QuestId::from("q-salt"),
            title: "Salt for the Garrison".into(),
            description: String::new(),
            kind: QuestKind::Delivery,
            giver: "Quartermaster Hale".into(),
            faction_id: FactionId::Velhart,
            status: QuestStatus::Active,
            target_location_id: Some(LocationId::from(target)),
            target_good: Some(GoodId::Salt),
            target_quantity: Some(5),
            target_enemy_name: None,
            target_enemy_hint: None,
            reward_gold: 200,
            reward_renown: 5,
        }
    }

    #[test]
    fn arriving_with_the_cargo_completes_the_delivery() {
        let mut world = WorldState::new();
        let mut player = test_player();
        player.active_quest = Some(delivery_quest("caldrith"));
        player.add_stock(StockId::Good(GoodId::Salt), 7);
        let before = player.gold;

        let events = arrive(&mut world, &mut player, &LocationId::from("caldrith"), &SimConfig::default())
            .unwrap();

        assert!(player.active_quest.is_none());
        assert_eq!(player.stock(StockId::Good(GoodId::Salt)), 2);
        assert_eq!(player.gold, before + 200);
        assert_eq!(player.renown, 15);
        assert_eq!(player.xp, 50);
        assert_eq!(player.relation(FactionId::Velhart), 5);
        assert!(events.iter().any(|e| e.message.contains("Delivery complete")));
    }

    #[test]
    fn arriving_without_the_cargo_leaves_the_quest_open() {
        let mut world = WorldState::new();
        let mut player = test_player();
        player.active_quest = Some(delivery_quest("caldrith"));
        player.add_stock(StockId::Good(GoodId::Salt), 3);

        let events = arrive(&mut world, &mut player, &LocationId::from("caldrith"), &SimConfig::default())
            .unwrap();

        assert!(player.active_quest.is_some());
        assert_eq!(player.stock(StockId::Good(GoodId::Salt)), 3);
        assert!(events.iter().any(|e| e.message.contains("without the 5 Salt")));
    }

    #[test]
    fn arriving_elsewhere_does_not_touch_the_quest() {
        let mut world = WorldState::new();
        let mut player = test_player();
        player.active_quest = Some(delivery_quest("caldrith"));
        player.add_stock(StockId::Good(GoodId::Salt), 5);

        arrive(&mut world, &mut player, &LocationId::from("harrowgate"), &SimConfig::default())
            .unwrap();
        assert!(player.active_quest.is_some());
    }

    #[test]
    fn enemy_gates_draw_a_warning() {
        let mut world = WorldState::new();
        let mut player = test_player();
        player.faction_id = Some(FactionId::Velhart);

        // Velhart and Norden start at war; Skellborg is a Norden town.
        let events = arrive(&mut world, &mut player, &LocationId::from("skellborg"), &SimConfig::default())
            .unwrap();
        assert!(events.iter().any(|e| e.message.contains("enemy of your faction")));
    }

    #[test]
    fn choices_apply_their_deltas_and_clamp() {
        let mut player = test_player();
        player.add_stock(StockId::Good(GoodId::Grain), 2);
        let event = TravelEvent {
            title: "A Toll in the Pass".into(),
            narrative: String::new(),
            choices: vec![EventChoice {
                text: "Pay them off".into(),
                result_narrative: "They wave you through.".into(),
                gold_change: -250,
                renown_change: 2,
                hp_change: -30,
                item_changes: [(StockId::Good(GoodId::Grain), -5_i64)].into_iter().collect(),
                forced_battle: None,
            }],
        };
        let outcome = apply_event_choice(&mut player, &event, 0).unwrap();
        assert_eq!(player.gold, 750);
        assert_eq!(player.renown, 12);
        // A bruising toll, but 70 hp is a long way from a sickbed.
        assert_eq!(player.hp, 70);
        assert!(!player.is_wounded);
        // Only the two carried sacks can be lost.
        assert_eq!(player.stock(StockId::Good(GoodId::Grain)), 0);
        assert!(outcome.forced_battle.is_none());
    }

    #[test]
    fn a_hit_that_would_kill_leaves_the_player_wounded_at_one_hp() {
        let mut player = test_player();
        player.hp = 20;
        let event = TravelEvent {
            title: "Rockslide".into(),
            narrative: String::new(),
            choices: vec![EventChoice {
                text: "Scramble clear".into(),
                result_narrative: "The mountain comes down.".into(),
                gold_change: 0,
                renown_change: 0,
                hp_change: -30,
                item_changes: BTreeMap::new(),
                forced_battle: None,
            }],
        };
        let outcome = apply_event_choice(&mut player, &event, 0).unwrap();
        assert_eq!(player.hp, 1);
        assert!(player.is_wounded);
        assert!(
            outcome
                .events
                .iter()
                .any(|e| e.message.contains("wounds overcome you"))
        );
    }

    #[test]
    fn a_forced_battle_is_handed_back_to_the_caller() {
        let mut player = test_player();
        let event = TravelEvent {
            title: "Ambush".into(),
            narrative: String::new(),
            choices: vec![EventChoice {
                text: "Stand and fight".into(),
                result_narrative: "Steel clears its scabbards.".into(),
                gold_change: 0,
                renown_change: 0,
                hp_change: 0,
                item_changes: BTreeMap::new(),
                forced_battle: Some(ForcedBattle {
                    enemy_name: "Hill Bandits".into(),
                    enemy_size: 14,
                }),
            }],
        };
        let outcome = apply_event_choice(&mut player, &event, 0).unwrap();
        assert_eq!(outcome.forced_battle.unwrap().enemy_name, "Hill Bandits");
    }

    #[test]
    fn an_out_of_range_choice_is_rejected() {
        let mut player = test_player();
        let event = TravelEvent {
            title: "Nothing".into(),
            narrative: String::new(),
            choices: Vec::new(),
        };
        assert!(apply_event_choice(&mut player, &event, 0).is_none());
    }
}
