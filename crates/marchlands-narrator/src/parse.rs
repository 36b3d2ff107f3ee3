//! Extraction and validation of untrusted model output.
//!
//! The model answers with text that should be one JSON object but often
//! is not quite: markdown fences, trailing commas, stray prose. Recovery
//! runs multiple strategies before giving up. Whatever parses is then
//! validated strictly against the closed id sets and the ranges the
//! prompt asked for; anything off-shape is a [`ProviderError::Malformed`]
//! and the engine treats it like a failed call.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::warn;

use marchlands_engine::ProviderError;
use marchlands_engine::provider::QuestRequest;
use marchlands_types::{
    BattleOutcome, BattleResult, GeneratedCharacter, LocationId, Quest, QuestId, QuestKind,
    QuestStatus, QuestUpdate, TravelEvent, UnitId,
};
use marchlands_world::templates::BackgroundDef;

// ---------------------------------------------------------------------------
// JSON recovery
// ---------------------------------------------------------------------------

/// Deserialize a raw model response through multiple recovery strategies:
///
/// 1. Direct parse
/// 2. Extract from a markdown code block
/// 3. Strip trailing commas and retry
/// 4. Code block, then strip trailing commas
fn decode<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, ProviderError> {
    let trimmed = raw.trim();

    if let Ok(parsed) = serde_json::from_str::<T>(trimmed) {
        return Ok(parsed);
    }

    if let Some(json_str) = extract_json_from_codeblock(trimmed)
        && let Ok(parsed) = serde_json::from_str::<T>(json_str)
    {
        return Ok(parsed);
    }

    let cleaned = strip_trailing_commas(trimmed);
    if let Ok(parsed) = serde_json::from_str::<T>(&cleaned) {
        return Ok(parsed);
    }

    if let Some(json_str) = extract_json_from_codeblock(trimmed) {
        let cleaned_inner = strip_trailing_commas(json_str);
        match serde_json::from_str::<T>(&cleaned_inner) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => {
                return Err(ProviderError::Malformed(format!(
                    "all parse strategies failed: {e}"
                )));
            }
        }
    }

    match serde_json::from_str::<T>(trimmed) {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ProviderError::Malformed(format!(
            "all parse strategies failed: {e}"
        ))),
    }
}

/// Pull the body out of a ```json or bare ``` fence.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let start = text
        .find("```json")
        .map(|i| {
            let after_tag = i.checked_add(7).unwrap_or(i);
            text.get(after_tag..)
                .and_then(|s| s.find('\n'))
                .and_then(|nl| after_tag.checked_add(nl))
                .and_then(|pos| pos.checked_add(1))
                .unwrap_or(after_tag)
        })
        .or_else(|| {
            text.find("```").map(|i| {
                let after_tag = i.checked_add(3).unwrap_or(i);
                text.get(after_tag..)
                    .and_then(|s| s.find('\n'))
                    .and_then(|nl| after_tag.checked_add(nl))
                    .and_then(|pos| pos.checked_add(1))
                    .unwrap_or(after_tag)
            })
        })?;

    let remaining = text.get(start..)?;
    let end = remaining.find("```")?;
    remaining.get(..end).map(str::trim)
}

/// Strip trailing commas before closing braces and brackets (common model
/// error).
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut i = 0;
    while i < len {
        let c = chars.get(i).copied().unwrap_or(' ');
        if c == ',' {
            let mut j = i.checked_add(1).unwrap_or(i);
            while j < len && chars.get(j).copied().unwrap_or(' ').is_whitespace() {
                j = j.checked_add(1).unwrap_or(j);
            }
            let next = chars.get(j).copied().unwrap_or(' ');
            if next == '}' || next == ']' {
                i = i.checked_add(1).unwrap_or(i);
                continue;
            }
        }
        result.push(c);
        i = i.checked_add(1).unwrap_or(len);
    }

    result
}

// ---------------------------------------------------------------------------
// Characters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawCharacter {
    name: String,
    #[serde(default)]
    backstory: String,
    gold: u32,
    renown: u32,
    #[serde(default)]
    army: BTreeMap<UnitId, u32>,
}

/// Validate a generated character against its background's ranges.
pub fn parse_character(
    raw: &str,
    def: &BackgroundDef,
) -> Result<GeneratedCharacter, ProviderError> {
    let parsed: RawCharacter = decode(raw)?;

    if parsed.name.trim().is_empty() {
        return Err(ProviderError::Malformed("character has no name".to_owned()));
    }
    if !(def.gold_min..=def.gold_max).contains(&parsed.gold) {
        return Err(ProviderError::Malformed(format!(
            "character gold {} outside {}..{}",
            parsed.gold, def.gold_min, def.gold_max
        )));
    }
    if !(def.renown_min..=def.renown_max).contains(&parsed.renown) {
        return Err(ProviderError::Malformed(format!(
            "character renown {} outside {}..{}",
            parsed.renown, def.renown_min, def.renown_max
        )));
    }
    let troops: u32 = parsed
        .army
        .values()
        .fold(0u32, |total, count| total.saturating_add(*count));
    if !(def.troops_min..=def.troops_max).contains(&troops) {
        return Err(ProviderError::Malformed(format!(
            "character army of {troops} outside {}..{}",
            def.troops_min, def.troops_max
        )));
    }

    let army: BTreeMap<UnitId, u32> = parsed
        .army
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect();

    Ok(GeneratedCharacter {
        name: parsed.name.trim().to_owned(),
        backstory: parsed.backstory,
        gold: parsed.gold,
        renown: parsed.renown,
        army,
    })
}

// ---------------------------------------------------------------------------
// Battles
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawBattle {
    narrative: String,
    outcome: BattleOutcome,
    #[serde(default)]
    player_losses: BTreeMap<UnitId, u32>,
    #[serde(default)]
    player_wounded: BTreeMap<UnitId, u32>,
    #[serde(default)]
    player_defeated: bool,
    #[serde(default)]
    enemy_losses: u32,
    #[serde(default)]
    gold_looted: u32,
    #[serde(default)]
    xp_gained: u32,
    #[serde(default)]
    player_xp_gained: u32,
    #[serde(default)]
    quest_update: Option<QuestUpdate>,
}

/// Parse a battle adjudication.
///
/// Unit slugs are validated by the closed [`UnitId`] enum; the engine
/// clamps the reported counts to what the army actually holds, so only
/// shape is checked here.
pub fn parse_battle(raw: &str) -> Result<BattleResult, ProviderError> {
    let parsed: RawBattle = decode(raw)?;

    if parsed.narrative.trim().is_empty() {
        return Err(ProviderError::Malformed(
            "battle has no narrative".to_owned(),
        ));
    }

    Ok(BattleResult {
        narrative: parsed.narrative,
        outcome: parsed.outcome,
        player_losses: parsed.player_losses,
        player_wounded: parsed.player_wounded,
        player_defeated: parsed.player_defeated,
        enemy_losses: parsed.enemy_losses,
        gold_looted: parsed.gold_looted,
        xp_gained: parsed.xp_gained,
        player_xp_gained: parsed.player_xp_gained,
        quest_update: parsed.quest_update,
    })
}

// ---------------------------------------------------------------------------
// Quests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawQuest {
    title: String,
    #[serde(default)]
    description: String,
    kind: QuestKind,
    #[serde(default)]
    target_location_id: Option<LocationId>,
    #[serde(default)]
    target_good: Option<marchlands_types::GoodId>,
    #[serde(default)]
    target_quantity: Option<u32>,
    #[serde(default)]
    target_enemy_name: Option<String>,
    reward_gold: u32,
    reward_renown: u32,
}

/// Reward bounds the quest prompt asks for, per kind.
const BOUNTY_GOLD: std::ops::RangeInclusive<u32> = 200..=800;
const BOUNTY_RENOWN: std::ops::RangeInclusive<u32> = 10..=25;
const DELIVERY_GOLD: std::ops::RangeInclusive<u32> = 100..=300;
const DELIVERY_RENOWN: std::ops::RangeInclusive<u32> = 5..=10;

/// Validate a quest offer and mint the full [`Quest`].
///
/// A delivery must target one of the destinations offered in the request;
/// a bounty must name its hunted party. Rewards outside the asked-for
/// bounds are rejected.
pub fn parse_quest(raw: &str, request: &QuestRequest) -> Result<Quest, ProviderError> {
    let parsed: RawQuest = decode(raw)?;

    if parsed.title.trim().is_empty() {
        return Err(ProviderError::Malformed("quest has no title".to_owned()));
    }

    let (gold_bounds, renown_bounds) = match parsed.kind {
        QuestKind::Bounty => (BOUNTY_GOLD, BOUNTY_RENOWN),
        QuestKind::Delivery => (DELIVERY_GOLD, DELIVERY_RENOWN),
    };
    if !gold_bounds.contains(&parsed.reward_gold) {
        return Err(ProviderError::Malformed(format!(
            "quest gold reward {} outside {gold_bounds:?}",
            parsed.reward_gold
        )));
    }
    if !renown_bounds.contains(&parsed.reward_renown) {
        return Err(ProviderError::Malformed(format!(
            "quest renown reward {} outside {renown_bounds:?}",
            parsed.reward_renown
        )));
    }

    let mut quest = Quest {
        id: mint_quest_id(&parsed.title),
        title: parsed.title,
        description: parsed.description,
        kind: parsed.kind,
        giver: request.giver.clone(),
        faction_id: request.faction_id,
        status: QuestStatus::Active,
        target_location_id: None,
        target_good: None,
        target_quantity: None,
        target_enemy_name: None,
        target_enemy_hint: None,
        reward_gold: parsed.reward_gold,
        reward_renown: parsed.reward_renown,
    };

    match parsed.kind {
        QuestKind::Delivery => {
            let target = parsed.target_location_id.ok_or_else(|| {
                ProviderError::Malformed("delivery quest has no destination".to_owned())
            })?;
            if !request.destinations.iter().any(|(id, _)| *id == target) {
                return Err(ProviderError::Malformed(format!(
                    "delivery destination {target} is not on offer"
                )));
            }
            let quantity = parsed.target_quantity.filter(|q| *q > 0).ok_or_else(|| {
                ProviderError::Malformed("delivery quest has no quantity".to_owned())
            })?;
            let good = parsed.target_good.ok_or_else(|| {
                ProviderError::Malformed("delivery quest has no good".to_owned())
            })?;
            quest.target_location_id = Some(target);
            quest.target_good = Some(good);
            quest.target_quantity = Some(quantity);
        }
        QuestKind::Bounty => {
            let enemy = parsed
                .target_enemy_name
                .filter(|name| !name.trim().is_empty())
                .ok_or_else(|| {
                    ProviderError::Malformed("bounty quest names no enemy".to_owned())
                })?;
            quest.target_enemy_name = Some(enemy);
        }
    }

    Ok(quest)
}

/// Mint a quest id from its title: lowercase alphanumerics joined by
/// hyphens.
fn mint_quest_id(title: &str) -> QuestId {
    let mut slug = String::with_capacity(title.len());
    let mut last_hyphen = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        QuestId::from("quest")
    } else {
        QuestId::from(slug)
    }
}

// ---------------------------------------------------------------------------
// Bounty movement
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawBountyMove {
    #[serde(default)]
    location_id: Option<LocationId>,
}

/// Parse where the hunted party moved.
///
/// A destination that is not among the candidates is discarded as a cold
/// trail rather than rejected, since `null` is a legitimate answer.
pub fn parse_bounty_destination(
    raw: &str,
    candidates: &[LocationId],
) -> Result<Option<LocationId>, ProviderError> {
    let parsed: RawBountyMove = decode(raw)?;
    match parsed.location_id {
        Some(id) if candidates.contains(&id) => Ok(Some(id)),
        Some(id) => {
            warn!(location = id.as_str(), "bounty moved to an unknown town, trail goes cold");
            Ok(None)
        }
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Rumors and road events
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRumor {
    rumor: String,
}

/// Parse a line of tavern gossip.
pub fn parse_rumor(raw: &str) -> Result<String, ProviderError> {
    let parsed: RawRumor = decode(raw)?;
    let rumor = parsed.rumor.trim();
    if rumor.is_empty() {
        return Err(ProviderError::Malformed("rumor is empty".to_owned()));
    }
    Ok(rumor.to_owned())
}

/// Parse a road event.
///
/// Good and item slugs in `item_changes` are validated by the closed
/// stock id set during deserialization. An event needs two or three
/// choices to be playable.
pub fn parse_travel_event(raw: &str) -> Result<TravelEvent, ProviderError> {
    let parsed: TravelEvent = decode(raw)?;
    if !(2..=3).contains(&parsed.choices.len()) {
        return Err(ProviderError::Malformed(format!(
            "road event offers {} choices",
            parsed.choices.len()
        )));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use marchlands_types::{FactionId, GoodId};
    use marchlands_world::templates;

    fn quest_request() -> QuestRequest {
        QuestRequest {
            location_name: "Westmere".to_owned(),
            giver: "Lord Aldmar".to_owned(),
            faction_id: FactionId::Velhart,
            destinations: vec![
                (LocationId::from("caldrith"), "Caldrith".to_owned()),
                (LocationId::from("skellborg"), "Skellborg".to_owned()),
            ],
            player_renown: 40,
        }
    }

    #[test]
    fn decodes_through_a_markdown_fence() {
        let raw = "Here is the gossip:\n```json\n{\"rumor\": \"Grain is short in Caldrith.\"}\n```";
        assert_eq!(parse_rumor(raw).unwrap(), "Grain is short in Caldrith.");
    }

    #[test]
    fn decodes_despite_trailing_commas() {
        let raw = r#"{"rumor": "The river road floods.",}"#;
        assert_eq!(parse_rumor(raw).unwrap(), "The river road floods.");
    }

    #[test]
    fn prose_without_json_is_malformed() {
        assert!(matches!(
            parse_rumor("I cannot answer that."),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn character_outside_background_ranges_is_rejected() {
        let def = templates::background_def(marchlands_types::CharacterBackground::Merchant);
        let raw = format!(
            r#"{{"name": "Osric", "backstory": "A trader.", "gold": {}, "renown": {}, "army": {{"recruit": {}}}}}"#,
            def.gold_max.saturating_mul(10),
            def.renown_min,
            def.troops_min,
        );
        assert!(matches!(
            parse_character(&raw, &def),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn character_within_ranges_passes() {
        let def = templates::background_def(marchlands_types::CharacterBackground::Merchant);
        let raw = format!(
            r#"{{"name": " Osric Tallow ", "gold": {}, "renown": {}, "army": {{"recruit": {}, "footman": 0}}}}"#,
            def.gold_min, def.renown_min, def.troops_min,
        );
        let character = parse_character(&raw, &def).unwrap();
        assert_eq!(character.name, "Osric Tallow");
        assert!(!character.army.contains_key(&UnitId::Footman));
    }

    #[test]
    fn unknown_unit_slug_is_malformed() {
        let raw = r#"{"narrative": "A hard fight.", "outcome": "victory", "player_losses": {"pikeman": 2}}"#;
        assert!(matches!(
            parse_battle(raw),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn battle_defaults_fill_missing_fields() {
        let raw = r#"{"narrative": "They broke at the first charge.", "outcome": "victory"}"#;
        let result = parse_battle(raw).unwrap();
        assert_eq!(result.outcome, BattleOutcome::Victory);
        assert_eq!(result.gold_looted, 0);
        assert!(result.quest_update.is_none());
    }

    #[test]
    fn delivery_to_an_unoffered_town_is_rejected() {
        let raw = r#"{"title": "Salt for Miren", "kind": "delivery",
            "target_location_id": "miren", "target_good": "salt",
            "target_quantity": 5, "reward_gold": 200, "reward_renown": 7}"#;
        assert!(matches!(
            parse_quest(raw, &quest_request()),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn valid_delivery_is_minted_with_the_giver() {
        let raw = r#"{"title": "Salt for the Garrison!", "description": "The garrison wants salt.",
            "kind": "delivery", "target_location_id": "caldrith", "target_good": "salt",
            "target_quantity": 5, "reward_gold": 200, "reward_renown": 7}"#;
        let quest = parse_quest(raw, &quest_request()).unwrap();
        assert_eq!(quest.id.as_str(), "salt-for-the-garrison");
        assert_eq!(quest.giver, "Lord Aldmar");
        assert_eq!(quest.status, QuestStatus::Active);
        assert_eq!(quest.target_good, Some(GoodId::Salt));
    }

    #[test]
    fn bounty_reward_out_of_bounds_is_rejected() {
        let raw = r#"{"title": "The Red Company", "kind": "bounty",
            "target_enemy_name": "the Red Company", "reward_gold": 5000, "reward_renown": 15}"#;
        assert!(matches!(
            parse_quest(raw, &quest_request()),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn bounty_keeps_the_trail_cold_until_sought() {
        let raw = r#"{"title": "The Red Company", "kind": "bounty",
            "target_enemy_name": "the Red Company", "reward_gold": 400, "reward_renown": 15}"#;
        let quest = parse_quest(raw, &quest_request()).unwrap();
        assert!(quest.target_location_id.is_none());
        assert_eq!(quest.target_enemy_name.as_deref(), Some("the Red Company"));
    }

    #[test]
    fn bounty_move_to_an_unknown_town_goes_cold() {
        let candidates = vec![LocationId::from("caldrith")];
        let raw = r#"{"location_id": "atlantis"}"#;
        assert_eq!(parse_bounty_destination(raw, &candidates).unwrap(), None);

        let raw = r#"{"location_id": "caldrith"}"#;
        assert_eq!(
            parse_bounty_destination(raw, &candidates).unwrap(),
            Some(LocationId::from("caldrith"))
        );
    }

    #[test]
    fn one_choice_road_event_is_rejected() {
        let raw = r#"{"title": "A Toll", "narrative": "A chain bars the bridge.",
            "choices": [{"text": "Pay", "result_narrative": "You pay.", "gold_change": -20}]}"#;
        assert!(matches!(
            parse_travel_event(raw),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn road_event_with_stock_changes_parses() {
        let raw = r#"{"title": "An Overturned Cart", "narrative": "A merchant's cart lies in the ford.",
            "choices": [
                {"text": "Help him", "result_narrative": "He pays in goods.",
                 "item_changes": {"salt": 2}},
                {"text": "Ride past", "result_narrative": "You keep the road."}
            ]}"#;
        let event = parse_travel_event(raw).unwrap();
        assert_eq!(event.choices.len(), 2);
    }
}
