//! Core entity structs for the Marchlands simulation.
//!
//! All state is plain serializable data keyed by `BTreeMap` so iteration
//! and save documents are deterministic. Counts are unsigned and mutated
//! through saturating helpers; zero-count entries are pruned at the
//! mutation sites.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::enums::{
    BattleOutcome, CharacterBackground, EnterpriseKind, EquipmentSlot, FactionId, GoodId, ItemId,
    LocationStatus, LogKind, QuestKind, QuestStatus, SkillId, StockId, UnitId,
};
use crate::ids::{CompanionId, LocationId, LordId, QuestId};

// ---------------------------------------------------------------------------
// Ownership
// ---------------------------------------------------------------------------

/// Who holds a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationOwner {
    /// The player holds it as a fief.
    Player,
    /// An AI lord holds it.
    Lord(LordId),
}

impl LocationOwner {
    /// Whether the player is the holder.
    pub const fn is_player(&self) -> bool {
        matches!(self, Self::Player)
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A productive workshop owned by the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enterprise {
    /// What the workshop produces.
    pub kind: EnterpriseKind,
    /// The town it stands in.
    pub location_id: LocationId,
}

/// The player character and everything they carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Character name.
    pub name: String,
    /// Generated backstory paragraph.
    pub backstory: String,
    /// Background chosen at creation.
    pub background: CharacterBackground,
    /// Gold on hand.
    pub gold: u32,
    /// Reputation; gates army size, faction membership, and fiefs.
    pub renown: u32,
    /// Character level.
    pub level: u32,
    /// Experience toward the next level.
    pub xp: u32,
    /// Unspent skill points.
    pub skill_points: u32,
    /// Learned skill levels.
    pub skills: BTreeMap<SkillId, u32>,
    /// Training-xp pools per unit type, spent on upgrades.
    pub unit_experience: BTreeMap<UnitId, u32>,
    /// Sworn faction, if any.
    pub faction_id: Option<FactionId>,
    /// Fighting-fit troops by unit type.
    pub army: BTreeMap<UnitId, u32>,
    /// Wounded troops recovering by unit type.
    pub wounded_army: BTreeMap<UnitId, u32>,
    /// Goods and items carried, by count.
    pub inventory: BTreeMap<StockId, u32>,
    /// Worn equipment by slot.
    pub equipment: BTreeMap<EquipmentSlot, ItemId>,
    /// The one quest currently accepted, if any.
    pub active_quest: Option<Quest>,
    /// Standing with each faction, clamped to [-100, 100].
    pub faction_relations: BTreeMap<FactionId, i32>,
    /// Companions sworn to the party.
    pub companions: Vec<CompanionId>,
    /// Workshops owned across the map.
    pub enterprises: Vec<Enterprise>,
    /// Settlements held as fiefs.
    pub fiefs: Vec<LocationId>,
    /// Hit points, 0..=100.
    pub hp: u32,
    /// Set when wounded; cleared only at full hp.
    pub is_wounded: bool,
}

impl Player {
    /// Total troops, fit and wounded.
    pub fn total_troops(&self) -> u32 {
        let fit: u32 = self.army.values().sum();
        let hurt: u32 = self.wounded_army.values().sum();
        fit.saturating_add(hurt)
    }

    /// Learned level of a skill, zero if unlearned.
    pub fn skill(&self, skill: SkillId) -> u32 {
        self.skills.get(&skill).copied().unwrap_or(0)
    }

    /// Standing with a faction, zero if never met.
    pub fn relation(&self, faction: FactionId) -> i32 {
        self.faction_relations.get(&faction).copied().unwrap_or(0)
    }

    /// Shift standing with a faction, clamped to [-100, 100].
    pub fn shift_relation(&mut self, faction: FactionId, delta: i32) {
        let current = self.relation(faction);
        let shifted = current.saturating_add(delta).clamp(-100, 100);
        self.faction_relations.insert(faction, shifted);
    }

    /// Add gold, saturating at the type bound.
    pub fn add_gold(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }

    /// Spend gold if the purse covers it; reports whether it did.
    pub fn try_spend_gold(&mut self, amount: u32) -> bool {
        match self.gold.checked_sub(amount) {
            Some(rest) => {
                self.gold = rest;
                true
            }
            None => false,
        }
    }

    /// Count of a carried good or item.
    pub fn stock(&self, stock: StockId) -> u32 {
        self.inventory.get(&stock).copied().unwrap_or(0)
    }

    /// Add to an inventory line.
    pub fn add_stock(&mut self, stock: StockId, count: u32) {
        if count == 0 {
            return;
        }
        let line = self.inventory.entry(stock).or_insert(0);
        *line = line.saturating_add(count);
    }

    /// Remove from an inventory line if enough is carried; prunes empty
    /// lines and reports whether the removal happened.
    pub fn try_remove_stock(&mut self, stock: StockId, count: u32) -> bool {
        let have = self.stock(stock);
        match have.checked_sub(count) {
            Some(0) => {
                self.inventory.remove(&stock);
                true
            }
            Some(rest) => {
                self.inventory.insert(stock, rest);
                true
            }
            None => false,
        }
    }

    /// Add fit troops of a unit type.
    pub fn add_troops(&mut self, unit: UnitId, count: u32) {
        if count == 0 {
            return;
        }
        let line = self.army.entry(unit).or_insert(0);
        *line = line.saturating_add(count);
    }

    /// Apply a wound: drop hp to at most the given value and mark wounded.
    pub fn wound_to(&mut self, hp: u32) {
        self.hp = self.hp.min(hp);
        self.is_wounded = true;
    }

    /// Heal by an amount, capping at 100 and clearing the wound at full hp.
    pub fn heal(&mut self, amount: u32) {
        self.hp = self.hp.saturating_add(amount).min(100);
        if self.hp >= 100 {
            self.is_wounded = false;
        }
    }
}

// ---------------------------------------------------------------------------
// Companions and lords
// ---------------------------------------------------------------------------

/// A named hero recruitable in a tavern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Companion {
    /// Stable identifier.
    pub id: CompanionId,
    /// Given name.
    pub name: String,
    /// Short biography shown at recruitment.
    pub backstory: String,
    /// Skill levels contributed to the party.
    pub skills: BTreeMap<SkillId, u32>,
    /// Hiring price in gold.
    pub cost: u32,
    /// Tavern where the companion waits when unrecruited.
    pub location_id: LocationId,
    /// Worn equipment by slot.
    #[serde(default)]
    pub equipment: BTreeMap<EquipmentSlot, ItemId>,
    /// Hit points, 0..=100.
    pub hp: u32,
    /// Set when wounded; a wounded companion contributes no skills.
    pub is_wounded: bool,
    /// Whether the companion has joined the player's party.
    #[serde(default)]
    pub recruited: bool,
}

impl Companion {
    /// Level of a skill, zero if the companion lacks it.
    pub fn skill(&self, skill: SkillId) -> u32 {
        self.skills.get(&skill).copied().unwrap_or(0)
    }

    /// Heal by an amount, capping at 100 and clearing the wound at full hp.
    pub fn heal(&mut self, amount: u32) {
        self.hp = self.hp.saturating_add(amount).min(100);
        if self.hp >= 100 {
            self.is_wounded = false;
        }
    }

    /// Apply a wound: drop hp to at most the given value and mark wounded.
    pub fn wound_to(&mut self, hp: u32) {
        self.hp = self.hp.min(hp);
        self.is_wounded = true;
    }
}

/// An AI-controlled lord marching an army around the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiLord {
    /// Stable identifier.
    pub id: LordId,
    /// Styled name, e.g. "Jarl Sigvald".
    pub name: String,
    /// Sworn faction.
    pub faction_id: FactionId,
    /// Retinue by unit type.
    pub army: BTreeMap<UnitId, u32>,
    /// Settlement the lord currently stands at.
    pub current_location_id: LocationId,
    /// Whether the lord is off the map recovering from defeat.
    pub is_defeated: bool,
    /// Day the lord returns; pinned far in the future when eliminated.
    pub defeated_until_day: u64,
}

impl AiLord {
    /// Troops in the retinue.
    pub fn troop_count(&self) -> u32 {
        self.army.values().sum()
    }
}

// ---------------------------------------------------------------------------
// Locations and markets
// ---------------------------------------------------------------------------

/// One market row: a good and its current price multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketGood {
    /// The traded good.
    pub good: GoodId,
    /// Current price multiplier, within [0.3, 3.0].
    pub multiplier: f64,
}

impl MarketGood {
    /// Current unit price in gold.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn price(&self) -> u32 {
        (f64::from(self.good.base_price()) * self.multiplier).round() as u32
    }
}

/// A settlement on the world map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Stable identifier.
    pub id: LocationId,
    /// Settlement name.
    pub name: String,
    /// Flavor description.
    pub description: String,
    /// Current holder.
    pub owner: LocationOwner,
    /// Realm the settlement belongs to.
    pub faction_id: FactionId,
    /// Settlements reachable in one day's travel.
    pub connected_to: BTreeSet<LocationId>,
    /// Levies available for recruitment.
    pub recruits_available: u32,
    /// Map x coordinate.
    pub x: i32,
    /// Map y coordinate.
    pub y: i32,
    /// Market rows, kept sorted by good display name.
    pub market: Vec<MarketGood>,
    /// Troops garrisoned by the holder.
    pub garrison: BTreeMap<UnitId, u32>,
    /// Taxes waiting for the holder to collect.
    pub accumulated_taxes: u32,
    /// Functioning or sacked.
    pub status: LocationStatus,
    /// Day a sacked settlement recovers.
    pub looted_until_day: u64,
    /// Goods produced locally.
    pub production: BTreeSet<GoodId>,
}

impl Location {
    /// Current multiplier for a good, 1.0 when the market lacks the row.
    pub fn multiplier(&self, good: GoodId) -> f64 {
        self.market
            .iter()
            .find(|row| row.good == good)
            .map_or(1.0, |row| row.multiplier)
    }

    /// Whether the settlement is currently sacked.
    pub const fn is_looted(&self) -> bool {
        matches!(self.status, LocationStatus::Looted)
    }
}

// ---------------------------------------------------------------------------
// Quests
// ---------------------------------------------------------------------------

/// A commission taken from a settlement's hall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    /// Provider-minted identifier.
    pub id: QuestId,
    /// Short title.
    pub title: String,
    /// Full brief.
    pub description: String,
    /// Bounty or delivery.
    pub kind: QuestKind,
    /// Who commissioned it.
    pub giver: String,
    /// Faction whose standing the quest affects.
    pub faction_id: FactionId,
    /// Lifecycle state.
    pub status: QuestStatus,
    /// Delivery destination, or current bounty-target whereabouts.
    pub target_location_id: Option<LocationId>,
    /// Good to deliver.
    pub target_good: Option<GoodId>,
    /// How many of the good to deliver.
    pub target_quantity: Option<u32>,
    /// Named enemy party to hunt.
    pub target_enemy_name: Option<String>,
    /// Last rumor of where the enemy was seen.
    pub target_enemy_hint: Option<String>,
    /// Gold paid on completion, before persuasion scaling.
    pub reward_gold: u32,
    /// Renown granted on completion.
    pub reward_renown: u32,
}

// ---------------------------------------------------------------------------
// Battles
// ---------------------------------------------------------------------------

/// Quest progress reported as part of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestUpdate {
    /// Whether the battle finished the active quest.
    pub completed: bool,
    /// One-line narration of the quest moment.
    pub narrative: String,
}

/// The provider's resolution of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    /// Prose account of the fight.
    pub narrative: String,
    /// Who carried the field.
    pub outcome: BattleOutcome,
    /// Troops killed outright, by unit type.
    pub player_losses: BTreeMap<UnitId, u32>,
    /// Troops wounded, by unit type.
    pub player_wounded: BTreeMap<UnitId, u32>,
    /// Whether the player personally went down.
    pub player_defeated: bool,
    /// Enemy casualties, narrative only.
    pub enemy_losses: u32,
    /// Gold recovered from the field.
    pub gold_looted: u32,
    /// Training xp split among surviving troops.
    pub xp_gained: u32,
    /// Experience granted directly to the player.
    pub player_xp_gained: u32,
    /// Progress on the active quest, if the fight touched it.
    pub quest_update: Option<QuestUpdate>,
}

// ---------------------------------------------------------------------------
// Travel events
// ---------------------------------------------------------------------------

/// A battle forced by a travel-event choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedBattle {
    /// Name of the attacking party.
    pub enemy_name: String,
    /// Size of the attacking party.
    pub enemy_size: u32,
}

/// One option the player can take during a travel event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventChoice {
    /// Button text.
    pub text: String,
    /// Narration shown after choosing.
    pub result_narrative: String,
    /// Gold gained or lost.
    #[serde(default)]
    pub gold_change: i64,
    /// Renown gained or lost.
    #[serde(default)]
    pub renown_change: i64,
    /// Hit points gained or lost.
    #[serde(default)]
    pub hp_change: i64,
    /// Goods or items gained (positive) or lost (negative).
    #[serde(default)]
    pub item_changes: BTreeMap<StockId, i64>,
    /// A fight that interrupts the journey.
    #[serde(default)]
    pub forced_battle: Option<ForcedBattle>,
}

/// A happening on the road between two settlements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelEvent {
    /// Short title.
    pub title: String,
    /// Scene-setting narration.
    pub narrative: String,
    /// Two or three options.
    pub choices: Vec<EventChoice>,
}

// ---------------------------------------------------------------------------
// Character creation
// ---------------------------------------------------------------------------

/// The provider's contribution to a new character.
///
/// Everything else (level, xp, skill points, hp, baseline equipment) is
/// fixed by the engine at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCharacter {
    /// Character name.
    pub name: String,
    /// Backstory paragraph.
    pub backstory: String,
    /// Starting gold within the background's range.
    pub gold: u32,
    /// Starting renown within the background's range.
    pub renown: u32,
    /// Starting troops.
    pub army: BTreeMap<UnitId, u32>,
}

// ---------------------------------------------------------------------------
// Logs and accounting
// ---------------------------------------------------------------------------

/// A log event produced by an engine, before the session assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Category tag.
    pub kind: LogKind,
    /// Player-facing message.
    pub message: String,
}

impl LogEvent {
    /// Build a log event.
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A log event with its position in the game history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Monotonic id assigned by the session.
    pub id: u64,
    /// Day the event happened.
    pub day: u64,
    /// Category tag.
    pub kind: LogKind,
    /// Player-facing message.
    pub message: String,
}

/// Running count of provider tokens consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens across the whole save.
    pub total: u64,
    /// Tokens used by the most recent provider call.
    pub last_call: u64,
}

impl TokenUsage {
    /// Record a provider reply's token count.
    pub fn record(&mut self, tokens: u64) {
        self.total = self.total.saturating_add(tokens);
        self.last_call = tokens;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::float_cmp)]

    use super::*;

    fn bare_player() -> Player {
        Player {
            name: "Test".into(),
            backstory: String::new(),
            background: CharacterBackground::Nomad,
            gold: 100,
            renown: 0,
            level: 1,
            xp: 0,
            skill_points: 0,
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
    fn spend_gold_is_checked() {
        let mut p = bare_player();
        assert!(p.try_spend_gold(60));
        assert_eq!(p.gold, 40);
        assert!(!p.try_spend_gold(41));
        assert_eq!(p.gold, 40);
    }

    #[test]
    fn inventory_prunes_empty_lines() {
        let mut p = bare_player();
        p.add_stock(StockId::Good(GoodId::Wine), 3);
        assert!(p.try_remove_stock(StockId::Good(GoodId::Wine), 3));
        assert!(p.inventory.is_empty());
        assert!(!p.try_remove_stock(StockId::Good(GoodId::Wine), 1));
    }

    #[test]
    fn relations_clamp_at_bounds() {
        let mut p = bare_player();
        p.shift_relation(FactionId::Norden, -130);
        assert_eq!(p.relation(FactionId::Norden), -100);
        p.shift_relation(FactionId::Norden, 250);
        assert_eq!(p.relation(FactionId::Norden), 100);
    }

    #[test]
    fn healing_clears_wound_only_at_full_hp() {
        let mut p = bare_player();
        p.wound_to(40);
        assert!(p.is_wounded);
        p.heal(30);
        assert!(p.is_wounded);
        assert_eq!(p.hp, 70);
        p.heal(45);
        assert_eq!(p.hp, 100);
        assert!(!p.is_wounded);
    }

    #[test]
    fn market_row_price_rounds() {
        let row = MarketGood {
            good: GoodId::Grain,
            multiplier: 0.88,
        };
        // 30 * 0.88 = 26.4 -> 26
        assert_eq!(row.price(), 26);
    }
}
