//! Simulation tuning configuration.
//!
//! Every threshold the engines consult lives here under its own name, with
//! the shipped balance as the default. A YAML file can override any subset;
//! missing sections and fields fall back to the defaults.

use std::path::Path;

use serde::Deserialize;

use crate::error::EngineError;

/// Market-engine tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Lowest multiplier a market row can reach.
    pub floor: f64,
    /// Highest multiplier a market row can reach.
    pub ceiling: f64,
    /// Weight of yesterday's multiplier in the daily smoothing.
    pub carry: f64,
    /// Weight of the computed target in the daily smoothing.
    pub pull: f64,
    /// Multiplier pinned on every row of a looted settlement.
    pub looted_multiplier: f64,
    /// Target adjustment for locally produced goods.
    pub production_adjust: f64,
    /// Target adjustment when a looted neighbor produces the good.
    pub looted_neighbor_adjust: f64,
    /// Wartime adjustment for strategic goods.
    pub war_strategic_adjust: f64,
    /// Wartime adjustment for luxury goods.
    pub war_luxury_adjust: f64,
    /// Adjustment per lord in town for provisions.
    pub lord_demand_adjust: f64,
    /// Day-over-day price ratio above which a shortage is worth a log line.
    pub shortage_log_threshold: f64,
    /// Day-over-day price ratio below which a glut is worth a log line.
    pub glut_log_threshold: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            floor: 0.3,
            ceiling: 3.0,
            carry: 0.7,
            pull: 0.3,
            looted_multiplier: 2.5,
            production_adjust: -0.4,
            looted_neighbor_adjust: 0.6,
            war_strategic_adjust: 0.5,
            war_luxury_adjust: -0.2,
            lord_demand_adjust: 0.15,
            shortage_log_threshold: 1.4,
            glut_log_threshold: 0.7,
        }
    }
}

/// Diplomacy-engine tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiplomacyConfig {
    /// The engine runs on days divisible by this.
    pub interval_days: u64,
    /// How far relations drift toward zero per run.
    pub decay: f64,
    /// Chance per pair of a random border incident.
    pub event_chance: f64,
    /// Largest random shift in either direction.
    pub event_magnitude: i32,
    /// Relation at or below which war breaks out.
    pub war_threshold: f64,
    /// Relation at or above which a war ends.
    pub peace_threshold: f64,
}

impl Default for DiplomacyConfig {
    fn default() -> Self {
        Self {
            interval_days: 3,
            decay: 0.5,
            event_chance: 0.05,
            event_magnitude: 5,
            war_threshold: -50.0,
            peace_threshold: 10.0,
        }
    }
}

/// AI-lord controller tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LordConfig {
    /// Minimum troops before a lord sacks an enemy settlement.
    pub raid_min_troops: u32,
    /// Minimum troops before a lord marches into enemy land.
    pub campaign_min_troops: u32,
    /// Army size at which a lord stops recruiting.
    pub recruit_cap: u32,
    /// Most recruits taken in one stop.
    pub recruit_batch: u32,
    /// A lord ignores recruit pools at or below this.
    pub min_recruit_pool: u32,
    /// Days a sacked settlement stays looted.
    pub loot_duration_days: u64,
    /// Fraction of each garrisoned unit lost to a sack.
    pub loot_attrition: f64,
    /// Days a beaten lord stays off the map.
    pub respawn_days: u64,
    /// Respawn delay used to pin an eliminated lord off the map for good.
    pub elimination_pin_days: u64,
}

impl Default for LordConfig {
    fn default() -> Self {
        Self {
            raid_min_troops: 30,
            campaign_min_troops: 50,
            recruit_cap: 100,
            recruit_batch: 10,
            min_recruit_pool: 5,
            loot_duration_days: 5,
            loot_attrition: 0.05,
            respawn_days: 5,
            elimination_pin_days: 9999,
        }
    }
}

/// Daily-upkeep tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpkeepConfig {
    /// Hp healed per day before skills.
    pub base_heal: u32,
    /// Extra hp healed per wound-treatment level.
    pub heal_per_wound_treatment: u32,
    /// One wounded troop in this many recovers per day (minimum one).
    pub wounded_recovery_divisor: u32,
    /// Gold each player fief accrues per day.
    pub fief_tax_per_day: u32,
    /// Training xp per troop per day before skills.
    pub train_xp_base: u32,
    /// Extra training xp per trainer level.
    pub train_xp_per_trainer: u32,
    /// Recruit pool restored when a sacked settlement recovers.
    pub looted_recruit_restock: u32,
    /// Enterprise income pays out every this many days.
    pub income_interval_days: u64,
}

impl Default for UpkeepConfig {
    fn default() -> Self {
        Self {
            base_heal: 10,
            heal_per_wound_treatment: 5,
            wounded_recovery_divisor: 10,
            fief_tax_per_day: 100,
            train_xp_base: 5,
            train_xp_per_trainer: 2,
            looted_recruit_restock: 10,
            income_interval_days: 7,
        }
    }
}

/// Level and renown progression tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Xp needed per level: `level * this`.
    pub level_xp_base: u32,
    /// Hard bound on level-ups applied from one xp grant.
    pub level_up_iteration_cap: u32,
    /// Player xp granted per point of quest reward renown.
    pub quest_xp_per_renown: u32,
    /// Renown for winning a battle.
    pub victory_renown: u32,
    /// Renown lost for a defeat, floored at zero.
    pub defeat_renown_penalty: u32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            level_xp_base: 500,
            level_up_iteration_cap: 100,
            quest_xp_per_renown: 10,
            victory_renown: 10,
            defeat_renown_penalty: 5,
        }
    }
}

/// Player-action tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Base army cap before renown and leadership.
    pub base_army_cap: u32,
    /// One extra army slot per this much renown.
    pub renown_per_cap_slot: u32,
    /// Extra army slots per leadership level.
    pub cap_per_leadership: u32,
    /// Relation discount scale for recruiting: `1 - relation / this`.
    pub recruit_discount_scale: f64,
    /// Price and reward swing per persuasion level.
    pub persuasion_rate: f64,
    /// Upgrade gold discount per trainer level.
    pub trainer_upgrade_discount: f64,
    /// Chance of a generated event on the road.
    pub travel_event_chance: f64,
    /// Price of a tavern rumor.
    pub rumor_cost: u32,
    /// Price of the field surgeon's full-party treatment.
    pub heal_party_cost: u32,
    /// Hp restored by the full-party treatment.
    pub heal_party_heal: u32,
    /// Minimum gold from raiding a settlement.
    pub raid_gold_min: u32,
    /// Maximum gold from raiding a settlement (exclusive).
    pub raid_gold_max: u32,
    /// Renown lost for raiding, floored at zero.
    pub raid_renown_penalty: u32,
    /// Relation lost with the raided faction.
    pub raid_relation_penalty: i32,
    /// Days a player-raided settlement stays looted.
    pub raid_loot_duration_days: u64,
    /// Renown required to swear to a faction.
    pub join_faction_min_renown: u32,
    /// Relation gained for swearing to a faction.
    pub join_faction_relation_bonus: i32,
    /// Relation gained for completing a delivery.
    pub delivery_relation_bonus: i32,
    /// Relation gained for completing a bounty.
    pub bounty_relation_bonus: i32,
    /// Enemy sizing: base fraction of the player's party.
    pub seek_battle_base: f64,
    /// Enemy sizing: random spread on top of the base.
    pub seek_battle_spread: f64,
    /// Chance the enemy is a hostile patrol rather than bandits while at war.
    pub patrol_chance: f64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            base_army_cap: 20,
            renown_per_cap_slot: 25,
            cap_per_leadership: 5,
            recruit_discount_scale: 200.0,
            persuasion_rate: 0.04,
            trainer_upgrade_discount: 0.05,
            travel_event_chance: 0.25,
            rumor_cost: 10,
            heal_party_cost: 100,
            heal_party_heal: 50,
            raid_gold_min: 200,
            raid_gold_max: 700,
            raid_renown_penalty: 15,
            raid_relation_penalty: -30,
            raid_loot_duration_days: 7,
            join_faction_min_renown: 50,
            join_faction_relation_bonus: 10,
            delivery_relation_bonus: 5,
            bounty_relation_bonus: 10,
            seek_battle_base: 0.5,
            seek_battle_spread: 0.8,
            patrol_chance: 0.4,
        }
    }
}

/// Delegated-policy tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DelegateConfig {
    /// Gold above which the delegate starts investing in enterprises.
    pub enterprise_gold_threshold: u32,
}

impl Default for DelegateConfig {
    fn default() -> Self {
        Self {
            enterprise_gold_threshold: 10_000,
        }
    }
}

/// The complete simulation configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Market-engine tuning.
    pub market: MarketConfig,
    /// Diplomacy-engine tuning.
    pub diplomacy: DiplomacyConfig,
    /// AI-lord controller tuning.
    pub lords: LordConfig,
    /// Daily-upkeep tuning.
    pub upkeep: UpkeepConfig,
    /// Progression tuning.
    pub progression: ProgressionConfig,
    /// Player-action tuning.
    pub actions: ActionConfig,
    /// Delegated-policy tuning.
    pub delegate: DelegateConfig,
}

impl SimConfig {
    /// Parse a configuration from YAML text.
    pub fn parse(contents: &str) -> Result<Self, EngineError> {
        serde_yml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("failed to parse config YAML: {e}")))
    }

    /// Load a configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::parse(&contents)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::float_cmp)]

    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = SimConfig::parse("{}").unwrap();
        assert!((config.market.looted_multiplier - 2.5).abs() < f64::EPSILON);
        assert_eq!(config.diplomacy.interval_days, 3);
        assert_eq!(config.lords.raid_min_troops, 30);
        assert_eq!(config.progression.level_xp_base, 500);
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let yaml = "
market:
  ceiling: 4.0
lords:
  recruit_batch: 20
";
        let config = SimConfig::parse(yaml).unwrap();
        assert!((config.market.ceiling - 4.0).abs() < f64::EPSILON);
        assert!((config.market.floor - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.lords.recruit_batch, 20);
        assert_eq!(config.lords.recruit_cap, 100);
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let result = SimConfig::parse("market: [not, a, map]");
        assert!(result.is_err());
    }
}
