//! Daily maintenance: recovery, healing, taxes, and troop training.

use tracing::debug;

use marchlands_types::{LocationStatus, LogEvent, LogKind, Player, SkillId};
use marchlands_world::{WorldState, templates};

use crate::config::UpkeepConfig;
use crate::skill::effective_skill;

/// Run the daily upkeep pass.
pub fn run_upkeep(
    world: &mut WorldState,
    player: &mut Player,
    config: &UpkeepConfig,
) -> Vec<LogEvent> {
    let mut events = Vec::new();
    let day = world.day;

    // Sacked settlements recover on their due day.
    for location in world.locations.values_mut() {
        if location.is_looted() && day >= location.looted_until_day {
            location.status = LocationStatus::Normal;
            location.recruits_available = config.looted_recruit_restock;
            events.push(LogEvent::new(
                LogKind::Event,
                format!("{} has recovered from the sack; trade resumes.", location.name),
            ));
        }
    }

    // Party healing. The skill resolves before anyone is touched so one
    // companion's recovery does not change today's rate mid-pass.
    let treatment = effective_skill(player, world, SkillId::WoundTreatment);
    let heal = config
        .base_heal
        .saturating_add(treatment.saturating_mul(config.heal_per_wound_treatment));
    if player.hp < 100 {
        player.heal(heal);
        if !player.is_wounded {
            events.push(LogEvent::new(
                LogKind::System,
                "You have recovered from your wounds.",
            ));
        }
    }
    for companion_id in &player.companions {
        if let Some(companion) = world.companions.get_mut(companion_id) {
            if companion.hp < 100 {
                companion.heal(heal);
                if !companion.is_wounded {
                    events.push(LogEvent::new(
                        LogKind::System,
                        format!("{} is back on their feet.", companion.name),
                    ));
                }
            }
        }
    }

    // Wounded troops trickle back into the ranks.
    let recovering: Vec<_> = player
        .wounded_army
        .iter()
        .map(|(unit, count)| {
            let rate = (count / config.wounded_recovery_divisor.max(1)).max(1);
            (*unit, rate.min(*count))
        })
        .collect();
    for (unit, recovered) in recovering {
        if recovered == 0 {
            continue;
        }
        match player.wounded_army.get_mut(&unit) {
            Some(count) if *count > recovered => *count = count.saturating_sub(recovered),
            _ => {
                player.wounded_army.remove(&unit);
            }
        }
        player.add_troops(unit, recovered);
    }

    // Fief taxes accrue in place until collected.
    for fief in &player.fiefs {
        if let Some(location) = world.locations.get_mut(fief) {
            location.accumulated_taxes = location
                .accumulated_taxes
                .saturating_add(config.fief_tax_per_day);
        }
    }

    // Troop training.
    if !player.army.is_empty() {
        let trainer = effective_skill(player, world, SkillId::Trainer);
        let per_troop = config
            .train_xp_base
            .saturating_add(trainer.saturating_mul(config.train_xp_per_trainer));
        let mut total: u32 = 0;
        let grants: Vec<_> = player
            .army
            .iter()
            .map(|(unit, count)| (*unit, per_troop.saturating_mul(*count)))
            .collect();
        for (unit, xp) in grants {
            let pool = player.unit_experience.entry(unit).or_insert(0);
            *pool = pool.saturating_add(xp);
            total = total.saturating_add(xp);
        }
        debug!(total, "troops trained");
        events.push(LogEvent::new(
            LogKind::System,
            format!("Your troops drilled through the day, gaining {total} experience."),
        ));
    }

    events
}

/// Whether enterprise income pays out on the given day.
pub const fn is_income_due(day: u64, config: &UpkeepConfig) -> bool {
    day > 1 && config.income_interval_days != 0 && (day - 1) % config.income_interval_days == 0
}

/// Pay the weekly profit of every enterprise, scaled by the local price of
/// its output good.
pub fn weekly_income(world: &WorldState, player: &mut Player) -> Vec<LogEvent> {
    if player.enterprises.is_empty() {
        return Vec::new();
    }
    let mut total: u32 = 0;
    let mut breakdown: Vec<String> = Vec::new();
    for enterprise in &player.enterprises {
        let def = templates::enterprise_def(enterprise.kind);
        let Ok(location) = world.location(&enterprise.location_id) else {
            continue;
        };
        let multiplier = location.multiplier(def.output);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let amount = (f64::from(def.base_weekly_profit) * multiplier).round() as u32;
        total = total.saturating_add(amount);
        breakdown.push(format!(
            "{} in {}: {amount}",
            enterprise.kind.display_name(),
            location.name
        ));
    }
    player.add_gold(total);
    vec![LogEvent::new(
        LogKind::System,
        format!("Weekly enterprise income: {total} gold ({}).", breakdown.join(", ")),
    )]
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::float_cmp)]

    use super::*;
    use crate::testutil::{recruit_companion, test_player};
    use marchlands_types::{Enterprise, EnterpriseKind, LocationId, UnitId};

    #[test]
    fn a_wounded_player_heals_with_the_party_surgeon() {
        let mut world = WorldState::new();
        let mut player = test_player();
        // Elric carries Wound Treatment 3.
        recruit_companion(&mut world, &mut player, "elric");
        player.wound_to(40);
        run_upkeep(&mut world, &mut player, &UpkeepConfig::default());
        // 10 + 3*5 = 25 healed.
        assert_eq!(player.hp, 65);
        assert!(player.is_wounded);
    }

    #[test]
    fn healing_alone_is_the_base_rate() {
        let mut world = WorldState::new();
        let mut player = test_player();
        player.wound_to(40);
        run_upkeep(&mut world, &mut player, &UpkeepConfig::default());
        assert_eq!(player.hp, 50);
    }

    #[test]
    fn wounded_troops_recover_at_least_one_per_day() {
        let mut world = WorldState::new();
        let mut player = test_player();
        player.wounded_army.insert(UnitId::Footman, 25);
        player.wounded_army.insert(UnitId::Recruit, 3);
        run_upkeep(&mut world, &mut player, &UpkeepConfig::default());
        // 25/10 = 2 recover; 3 is under the divisor but one still returns.
        assert_eq!(player.wounded_army.get(&UnitId::Footman), Some(&23));
        assert_eq!(player.army.get(&UnitId::Footman), Some(&2));
        assert_eq!(player.wounded_army.get(&UnitId::Recruit), Some(&2));
        assert_eq!(player.army.get(&UnitId::Recruit), Some(&1));
    }

    #[test]
    fn fiefs_accrue_taxes_daily() {
        let mut world = WorldState::new();
        let mut player = test_player();
        player.fiefs.push(LocationId::from("caldrith"));
        run_upkeep(&mut world, &mut player, &UpkeepConfig::default());
        run_upkeep(&mut world, &mut player, &UpkeepConfig::default());
        let town = world.location(&LocationId::from("caldrith")).unwrap();
        assert_eq!(town.accumulated_taxes, 200);
    }

    #[test]
    fn training_fills_unit_pools_per_troop() {
        let mut world = WorldState::new();
        let mut player = test_player();
        player.army.insert(UnitId::Recruit, 10);
        // Dain brings Trainer 2: (5 + 4) * 10 = 90 xp.
        recruit_companion(&mut world, &mut player, "dain");
        run_upkeep(&mut world, &mut player, &UpkeepConfig::default());
        assert_eq!(player.unit_experience.get(&UnitId::Recruit), Some(&90));
    }

    #[test]
    fn sacked_towns_recover_on_their_day() {
        let mut world = WorldState::new();
        let mut player = test_player();
        {
            let town = world.location_mut(&LocationId::from("sarai")).unwrap();
            town.status = marchlands_types::LocationStatus::Looted;
            town.looted_until_day = 6;
            town.recruits_available = 0;
        }
        world.day = 5;
        run_upkeep(&mut world, &mut player, &UpkeepConfig::default());
        assert!(world.location(&LocationId::from("sarai")).unwrap().is_looted());

        world.day = 6;
        let events = run_upkeep(&mut world, &mut player, &UpkeepConfig::default());
        let town = world.location(&LocationId::from("sarai")).unwrap();
        assert!(!town.is_looted());
        assert_eq!(town.recruits_available, 10);
        assert!(events.iter().any(|e| e.message.contains("recovered from the sack")));
    }

    #[test]
    fn income_days_follow_the_weekly_cadence() {
        let config = UpkeepConfig::default();
        assert!(!is_income_due(1, &config));
        assert!(!is_income_due(7, &config));
        assert!(is_income_due(8, &config));
        assert!(is_income_due(15, &config));
    }

    #[test]
    fn enterprise_income_scales_with_the_output_price() {
        let mut world = WorldState::new();
        let mut player = test_player();
        player.enterprises.push(Enterprise {
            kind: EnterpriseKind::Brewery,
            location_id: LocationId::from("harrowgate"),
        });
        // Pin the ale multiplier at 1.2: 250 * 1.2 = 300.
        for row in &mut world
            .location_mut(&LocationId::from("harrowgate"))
            .unwrap()
            .market
        {
            if row.good == marchlands_types::GoodId::Ale {
                row.multiplier = 1.2;
            }
        }
        let before = player.gold;
        let events = weekly_income(&world, &mut player);
        assert_eq!(player.gold, before + 300);
        assert!(events[0].message.contains("Brewery in Harrowgate: 300"));
    }
}
