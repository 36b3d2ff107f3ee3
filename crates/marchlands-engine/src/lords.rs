//! The AI lord controller.
//!
//! Each day every lord acts in id order: beaten lords try to return to a
//! friendly settlement, standing lords sack enemy towns, take on recruits
//! in their own fiefs, and march with the fortunes of war.

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use marchlands_types::{LocationId, LocationStatus, LogEvent, LogKind, LordId};
use marchlands_world::{WorldState, templates};

use crate::config::LordConfig;

/// Run one day of lord activity.
pub fn run_lords<R: Rng + ?Sized>(
    world: &mut WorldState,
    config: &LordConfig,
    rng: &mut R,
) -> Vec<LogEvent> {
    let mut events = Vec::new();
    let lord_ids: Vec<LordId> = world.lords.keys().cloned().collect();

    for id in lord_ids {
        let Some(lord) = world.lords.get(&id) else {
            continue;
        };
        if lord.is_defeated {
            events.extend(try_respawn(world, &id, config, rng));
            continue;
        }

        if let Some(event) = recover_invalid_position(world, &id, config) {
            events.extend(event);
            continue;
        }

        events.extend(try_raid(world, &id, config));
        events.extend(try_recruit(world, &id, config));
        events.extend(march(world, &id, config, rng));
    }

    events
}

/// Bring a beaten lord back once his recovery day arrives.
fn try_respawn<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: &LordId,
    config: &LordConfig,
    rng: &mut R,
) -> Vec<LogEvent> {
    let day = world.day;
    let Some(lord) = world.lords.get(id) else {
        return Vec::new();
    };
    if day < lord.defeated_until_day {
        return Vec::new();
    }
    let faction = lord.faction_id;
    let name = lord.name.clone();

    // The lord's own seat if his faction still holds it, otherwise any
    // settlement the faction has left.
    let fiefs = world.faction_locations(faction);
    let seat = templates::lord_seat(id).filter(|s| fiefs.contains(s));
    let home = seat.or_else(|| fiefs.choose(rng).cloned());

    match home {
        Some(location_id) => {
            let town_name = world
                .locations
                .get(&location_id)
                .map_or_else(String::new, |l| l.name.clone());
            if let Some(lord) = world.lords.get_mut(id) {
                lord.is_defeated = false;
                lord.defeated_until_day = 0;
                lord.current_location_id = location_id;
                lord.army = templates::lord_starting_army(id);
            }
            vec![LogEvent::new(
                LogKind::Event,
                format!("{name} has raised a new banner at {town_name}."),
            )]
        }
        None => {
            // Landless faction: the lord is out of the game for good. The
            // far-future pin keeps this branch from logging twice.
            if let Some(lord) = world.lords.get_mut(id) {
                lord.defeated_until_day = day.saturating_add(config.elimination_pin_days);
            }
            vec![LogEvent::new(
                LogKind::Event,
                format!("{name}'s line is broken; his banner will not rise again."),
            )]
        }
    }
}

/// A lord standing nowhere real falls back to friendly land or scatters.
///
/// Returns `Some` when the lord's turn ends here.
fn recover_invalid_position(
    world: &mut WorldState,
    id: &LordId,
    config: &LordConfig,
) -> Option<Vec<LogEvent>> {
    let lord = world.lords.get(id)?;
    if world.locations.contains_key(&lord.current_location_id) {
        return None;
    }
    let faction = lord.faction_id;
    let name = lord.name.clone();
    let fallback = world.faction_locations(faction).first().cloned();
    let day = world.day;
    let lord = world.lords.get_mut(id)?;
    match fallback {
        Some(location_id) => {
            lord.current_location_id = location_id;
            Some(Vec::new())
        }
        None => {
            lord.is_defeated = true;
            lord.defeated_until_day = day.saturating_add(config.respawn_days);
            lord.army.clear();
            Some(vec![LogEvent::new(
                LogKind::Event,
                format!("{name}'s host scatters, leaderless."),
            )])
        }
    }
}

/// Sack the settlement underfoot when it belongs to an enemy.
fn try_raid(world: &mut WorldState, id: &LordId, config: &LordConfig) -> Vec<LogEvent> {
    let day = world.day;
    let Some(lord) = world.lords.get(id) else {
        return Vec::new();
    };
    let Some(location) = world.locations.get(&lord.current_location_id) else {
        return Vec::new();
    };
    let hostile = world.at_war(lord.faction_id, location.faction_id);
    if !hostile || lord.troop_count() <= config.raid_min_troops || location.is_looted() {
        return Vec::new();
    }

    let lord_name = lord.name.clone();
    let location_id = lord.current_location_id.clone();
    let Some(location) = world.locations.get_mut(&location_id) else {
        return Vec::new();
    };
    location.status = LocationStatus::Looted;
    location.looted_until_day = day.saturating_add(config.loot_duration_days);
    location.recruits_available = 0;
    let town_name = location.name.clone();

    // Sacking a town costs the raiders: each unit loses the floor of its
    // attrition share.
    let mut total_losses: u32 = 0;
    if let Some(lord) = world.lords.get_mut(id) {
        lord.army.retain(|_, count| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let losses = (f64::from(*count) * config.loot_attrition).floor() as u32;
            total_losses = total_losses.saturating_add(losses);
            *count = count.saturating_sub(losses);
            *count > 0
        });
    }

    vec![LogEvent::new(
        LogKind::Event,
        format!(
            "{lord_name} has sacked {town_name}! The raid cost his host {total_losses} soldiers and the market lies in ruin."
        ),
    )]
}

/// Take on recruits when resting in a friendly fief. Lords levy rather
/// than hire, so no gold changes hands.
fn try_recruit(world: &mut WorldState, id: &LordId, config: &LordConfig) -> Vec<LogEvent> {
    let Some(lord) = world.lords.get(id) else {
        return Vec::new();
    };
    let Some(location) = world.locations.get(&lord.current_location_id) else {
        return Vec::new();
    };
    if location.faction_id != lord.faction_id
        || lord.troop_count() >= config.recruit_cap
        || location.recruits_available <= config.min_recruit_pool
    {
        return Vec::new();
    }
    let batch = location.recruits_available.min(config.recruit_batch);
    let lord_name = lord.name.clone();
    let town_name = location.name.clone();
    let location_id = lord.current_location_id.clone();
    if let Some(lord) = world.lords.get_mut(id) {
        let line = lord.army.entry(marchlands_types::UnitId::Recruit).or_insert(0);
        *line = line.saturating_add(batch);
    }
    if let Some(location) = world.locations.get_mut(&location_id) {
        location.recruits_available = location.recruits_available.saturating_sub(batch);
    }
    debug!(lord = %id, batch, "lord recruited");
    vec![LogEvent::new(
        LogKind::Rumor,
        format!("{lord_name} takes on {batch} fresh recruits at {town_name}."),
    )]
}

/// March: toward the enemy with a strong host, home territory otherwise.
fn march<R: Rng + ?Sized>(
    world: &mut WorldState,
    id: &LordId,
    config: &LordConfig,
    rng: &mut R,
) -> Vec<LogEvent> {
    let Some(lord) = world.lords.get(id) else {
        return Vec::new();
    };
    let faction = lord.faction_id;
    let name = lord.name.clone();
    let current = lord.current_location_id.clone();
    let campaigning =
        world.is_at_war(faction) && lord.troop_count() > config.campaign_min_troops;

    let mut destination = None;
    if campaigning {
        let enemies = world.enemies_of(faction);
        let targets: Vec<LocationId> = world
            .locations
            .values()
            .filter(|l| enemies.contains(&l.faction_id) && !l.is_looted())
            .map(|l| l.id.clone())
            .collect();
        destination = targets.choose(rng).cloned();
    }
    // No enemy worth marching on: wander home territory instead.
    if destination.is_none() {
        let friendly: Vec<LocationId> = world
            .faction_locations(faction)
            .into_iter()
            .filter(|l| *l != current)
            .collect();
        destination = friendly.choose(rng).cloned();
    }

    let Some(destination) = destination else {
        return Vec::new();
    };
    if destination == current {
        return Vec::new();
    }
    let town_name = world
        .locations
        .get(&destination)
        .map_or_else(String::new, |l| l.name.clone());
    if let Some(lord) = world.lords.get_mut(id) {
        lord.current_location_id = destination;
    }
    vec![LogEvent::new(
        LogKind::Rumor,
        format!("{name}'s host has begun the march to {town_name}."),
    )]
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::float_cmp)]

    use super::*;
    use marchlands_types::{FactionId, UnitId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(23)
    }

    fn place(world: &mut WorldState, lord: &str, town: &str) {
        world
            .lords
            .get_mut(&LordId::from(lord))
            .unwrap()
            .current_location_id = LocationId::from(town);
    }

    #[test]
    fn a_strong_lord_on_enemy_ground_sacks_the_town() {
        let mut world = WorldState::new();
        world.day = 4;
        let config = LordConfig::default();
        // Sigvald (Norden, 57 troops) stands in Velhart's Westmere.
        place(&mut world, "sigvald", "westmere");
        let events = run_lords(&mut world, &config, &mut rng());

        let westmere = world.location(&LocationId::from("westmere")).unwrap();
        assert!(westmere.is_looted());
        assert_eq!(westmere.looted_until_day, 9);
        assert_eq!(westmere.recruits_available, 0);
        // The sack costs the raiders, not the townsfolk: 45 footmen lose
        // 2, 12 veterans lose 0, and the garrison stands untouched.
        let sigvald = world.lord(&LordId::from("sigvald")).unwrap();
        assert_eq!(sigvald.army.get(&UnitId::Footman), Some(&43));
        assert_eq!(sigvald.army.get(&UnitId::Veteran), Some(&12));
        assert_eq!(westmere.garrison.get(&UnitId::Footman), Some(&20));
        assert_eq!(westmere.garrison.get(&UnitId::Veteran), Some(&5));
        assert!(events.iter().any(|e| e.message.contains("sacked Westmere")));
        assert!(events.iter().any(|e| e.message.contains("cost his host 2")));
    }

    #[test]
    fn a_weak_lord_does_not_raid() {
        let mut world = WorldState::new();
        world.day = 4;
        let config = LordConfig::default();
        place(&mut world, "sigvald", "westmere");
        world
            .lords
            .get_mut(&LordId::from("sigvald"))
            .unwrap()
            .army = [(UnitId::Footman, 20)].into_iter().collect();
        run_lords(&mut world, &config, &mut rng());
        // 20 troops is under the raid threshold; the town stands.
        assert!(!world.location(&LocationId::from("westmere")).unwrap().is_looted());
    }

    #[test]
    fn lords_at_peace_stay_in_their_own_lands() {
        let mut world = WorldState::new();
        world.day = 4;
        let config = LordConfig::default();
        let mut generator = rng();
        for _ in 0..20 {
            run_lords(&mut world, &config, &mut generator);
        }
        // Vostya and Kherai are at peace: their lords never leave home.
        for slug in ["radomir", "mstislav", "toregh", "subei"] {
            let lord = world.lord(&LordId::from(slug)).unwrap();
            let town = world.location(&lord.current_location_id).unwrap();
            assert_eq!(town.faction_id, lord.faction_id);
        }
    }

    #[test]
    fn beaten_lords_return_at_their_seat_with_a_fresh_host() {
        let mut world = WorldState::new();
        let config = LordConfig::default();
        {
            let lord = world.lords.get_mut(&LordId::from("toregh")).unwrap();
            lord.is_defeated = true;
            lord.defeated_until_day = 6;
            lord.army.clear();
        }
        world.day = 5;
        run_lords(&mut world, &config, &mut rng());
        assert!(world.lord(&LordId::from("toregh")).unwrap().is_defeated);

        world.day = 6;
        let events = run_lords(&mut world, &config, &mut rng());
        let lord = world.lord(&LordId::from("toregh")).unwrap();
        assert!(!lord.is_defeated);
        assert_eq!(lord.current_location_id, LocationId::from("tulkan"));
        assert_eq!(lord.army, templates::lord_starting_army(&LordId::from("toregh")));
        assert!(events.iter().any(|e| e.message.contains("raised a new banner")));
    }

    #[test]
    fn a_landless_lord_is_eliminated_once() {
        let mut world = WorldState::new();
        let config = LordConfig::default();
        // Hand every Kherai settlement to Velhart.
        let kherai_towns = world.faction_locations(FactionId::Kherai);
        for town in kherai_towns {
            world.location_mut(&town).unwrap().faction_id = FactionId::Velhart;
        }
        {
            let lord = world.lords.get_mut(&LordId::from("subei")).unwrap();
            lord.is_defeated = true;
            lord.defeated_until_day = 2;
            lord.army.clear();
        }
        world.day = 2;
        let first = run_lords(&mut world, &config, &mut rng());
        assert!(
            first
                .iter()
                .any(|e| e.message.contains("will not rise again"))
        );
        let until = world.lord(&LordId::from("subei")).unwrap().defeated_until_day;
        assert!(until > world.day.saturating_add(9000));

        world.day = 3;
        let second = run_lords(&mut world, &config, &mut rng());
        assert!(
            !second
                .iter()
                .any(|e| e.message.contains("will not rise again"))
        );
    }

    #[test]
    fn recruiting_refills_from_friendly_pools() {
        let mut world = WorldState::new();
        world.day = 4;
        let config = LordConfig::default();
        // Thorun sits at Varnheim (9 recruits) with 50 troops; the levy
        // costs him nothing and the town crier hears of it.
        let before = world.lord(&LordId::from("thorun")).unwrap().troop_count();
        let events = run_lords(&mut world, &config, &mut rng());
        let lord = world.lord(&LordId::from("thorun")).unwrap();
        assert!(lord.troop_count() >= before);
        assert!(
            events
                .iter()
                .any(|e| e.message.contains("fresh recruits at Varnheim"))
        );
        assert_eq!(
            world
                .location(&LocationId::from("varnheim"))
                .unwrap()
                .recruits_available,
            0
        );
    }

    #[test]
    fn a_campaigning_lord_with_no_standing_target_marches_home_instead() {
        let mut world = WorldState::new();
        world.day = 4;
        let config = LordConfig::default();
        // Every Velhart town already lies looted, so Sigvald has nothing
        // left to sack and wanders Norden lands.
        for town in world.faction_locations(FactionId::Velhart) {
            let location = world.location_mut(&town).unwrap();
            location.status = LocationStatus::Looted;
            location.looted_until_day = 20;
        }
        let events = run_lords(&mut world, &config, &mut rng());
        let lord = world.lord(&LordId::from("sigvald")).unwrap();
        let town = world.location(&lord.current_location_id).unwrap();
        assert_eq!(town.faction_id, FactionId::Norden);
        assert_ne!(lord.current_location_id, LocationId::from("skellborg"));
        assert!(
            events
                .iter()
                .any(|e| e.message.contains("has begun the march to"))
        );
    }

    #[test]
    fn a_lord_whose_seat_fell_returns_at_another_fief_of_his_faction() {
        let mut world = WorldState::new();
        let config = LordConfig::default();
        // Tulkan has fallen to Velhart, but Kherai still holds Sarai and
        // Qaraz; the Khan comes back somewhere in his own lands.
        world
            .location_mut(&LocationId::from("tulkan"))
            .unwrap()
            .faction_id = FactionId::Velhart;
        {
            let lord = world.lords.get_mut(&LordId::from("toregh")).unwrap();
            lord.is_defeated = true;
            lord.defeated_until_day = 6;
            lord.army.clear();
        }
        world.day = 6;
        run_lords(&mut world, &config, &mut rng());
        let lord = world.lord(&LordId::from("toregh")).unwrap();
        assert!(!lord.is_defeated);
        assert_ne!(lord.current_location_id, LocationId::from("tulkan"));
        let town = world.location(&lord.current_location_id).unwrap();
        assert_eq!(town.faction_id, FactionId::Kherai);
    }
}
