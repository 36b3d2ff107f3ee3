//! The day orchestrator.
//!
//! One call, one day. The engines run in a fixed order so the same save
//! and the same seed always replay to the same world: upkeep, markets,
//! enterprise income, diplomacy, lords.

use rand::Rng;
use tracing::info;

use marchlands_types::{LogEvent, Player};
use marchlands_world::WorldState;

use crate::config::SimConfig;
use crate::diplomacy;
use crate::lords;
use crate::market;
use crate::upkeep;

/// Advance the world by one day and run every engine that is due.
pub fn advance_day<R: Rng + ?Sized>(
    world: &mut WorldState,
    player: &mut Player,
    config: &SimConfig,
    rng: &mut R,
) -> Vec<LogEvent> {
    world.day = world.day.saturating_add(1);
    info!(day = world.day, "day begins");

    let mut events = upkeep::run_upkeep(world, player, &config.upkeep);
    events.extend(market::update_markets(world, &config.market, rng));
    if upkeep::is_income_due(world.day, &config.upkeep) {
        events.extend(upkeep::weekly_income(world, player));
    }
    if diplomacy::is_due(world.day, &config.diplomacy) {
        events.extend(diplomacy::run_diplomacy(world, &config.diplomacy, rng));
    }
    if world.day > 1 {
        events.extend(lords::run_lords(world, &config.lords, rng));
    }
    events
}
