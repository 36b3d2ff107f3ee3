//! The daily market engine.
//!
//! Each settlement's price multipliers drift toward a target computed from
//! local production, nearby sackings, wartime demand, and lords garrisoned
//! in town. Looted settlements skip the drift entirely: every row is
//! pinned at the crisis multiplier until the town recovers.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use marchlands_types::{GoodId, LocationId, LogEvent, LogKind};
use marchlands_world::WorldState;

use crate::config::MarketConfig;

struct LocalContext {
    at_war: bool,
    lords_here: u32,
    looted_neighbor_goods: BTreeSet<GoodId>,
}

/// Run one market day across every settlement.
///
/// Returns at most one log event: a randomly chosen row whose price moved
/// sharply since yesterday.
pub fn update_markets<R: Rng + ?Sized>(
    world: &mut WorldState,
    config: &MarketConfig,
    rng: &mut R,
) -> Vec<LogEvent> {
    // Pass 1: read-only context per settlement, so the mutable pass below
    // does not alias the map.
    let contexts: BTreeMap<LocationId, LocalContext> = world
        .locations
        .values()
        .map(|location| {
            let looted_neighbor_goods = location
                .connected_to
                .iter()
                .filter_map(|id| world.locations.get(id))
                .filter(|neighbor| neighbor.is_looted())
                .flat_map(|neighbor| neighbor.production.iter().copied())
                .collect();
            let context = LocalContext {
                at_war: world.is_at_war(location.faction_id),
                lords_here: world.lords_at(&location.id),
                looted_neighbor_goods,
            };
            (location.id.clone(), context)
        })
        .collect();

    // Pass 2: drift every row, remembering rows worth a log line.
    let mut notable: Vec<(String, GoodId, f64)> = Vec::new();
    for location in world.locations.values_mut() {
        if location.is_looted() {
            for row in &mut location.market {
                row.multiplier = config.looted_multiplier;
            }
            continue;
        }
        let Some(context) = contexts.get(&location.id) else {
            continue;
        };
        for row in &mut location.market {
            let mut target = 1.0;
            if location.production.contains(&row.good) {
                target += config.production_adjust;
            }
            if context.looted_neighbor_goods.contains(&row.good) {
                target += config.looted_neighbor_adjust;
            }
            if context.at_war {
                if row.good.is_strategic() {
                    target += config.war_strategic_adjust;
                }
                if row.good.is_luxury() {
                    target += config.war_luxury_adjust;
                }
            }
            if row.good.is_provision() {
                target += config.lord_demand_adjust * f64::from(context.lords_here);
            }
            let target = target.clamp(config.floor, config.ceiling);
            let old = row.multiplier;
            let smoothed = old * config.carry + target * config.pull;
            row.multiplier = smoothed.clamp(config.floor, config.ceiling);

            // The day's swing is what the town talks about, not the
            // absolute level.
            let swing = if old > f64::EPSILON {
                row.multiplier / old
            } else {
                1.0
            };
            if swing > config.shortage_log_threshold || swing < config.glut_log_threshold {
                notable.push((location.name.clone(), row.good, swing));
            }
        }
        location
            .market
            .sort_by_key(|row| row.good.display_name());
    }

    debug!(notable = notable.len(), "market day complete");

    notable
        .choose(rng)
        .map(|(town, good, swing)| {
            let message = if *swing > 1.0 {
                format!(
                    "Word from {town}: {} is growing scarce, and merchants are charging dearly.",
                    good.display_name()
                )
            } else {
                format!(
                    "Word from {town}: {} floods the stalls and sells for a pittance.",
                    good.display_name()
                )
            };
            LogEvent::new(LogKind::Market, message)
        })
        .into_iter()
        .collect()
}
