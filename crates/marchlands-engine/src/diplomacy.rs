//! The diplomacy engine.
//!
//! Every few days the standing between each pair of great factions decays
//! toward zero, suffers the occasional border incident, and is checked
//! against the war and peace thresholds. All writes go through the world's
//! symmetric accessors.

use rand::Rng;
use tracing::info;

use marchlands_types::{FactionId, LogEvent, LogKind};
use marchlands_world::WorldState;

use crate::config::DiplomacyConfig;

/// Whether the diplomacy engine runs on the given day.
pub const fn is_due(day: u64, config: &DiplomacyConfig) -> bool {
    day > 1 && config.interval_days != 0 && day % config.interval_days == 0
}

/// Run one diplomacy round over every pair of great factions.
pub fn run_diplomacy<R: Rng + ?Sized>(
    world: &mut WorldState,
    config: &DiplomacyConfig,
    rng: &mut R,
) -> Vec<LogEvent> {
    let mut events = Vec::new();
    let factions = FactionId::GREAT_FACTIONS;

    for (index, &a) in factions.iter().enumerate() {
        for &b in factions.iter().skip(index.saturating_add(1)) {
            // 1. Decay toward zero, one decimal place.
            let current = world.relation(a, b);
            let decayed = if current > 0.0 {
                (current - config.decay).max(0.0)
            } else if current < 0.0 {
                (current + config.decay).min(0.0)
            } else {
                0.0
            };
            world.set_relation(a, b, round_tenth(decayed));

            // 2. Border incident.
            if rng.random_bool(config.event_chance) {
                let shift = rng.random_range(-config.event_magnitude..=config.event_magnitude);
                if shift != 0 {
                    world.shift_relation(a, b, f64::from(shift));
                    let message = if shift > 0 {
                        format!(
                            "Envoys of {} and {} exchange gifts; relations warm.",
                            a.display_name(),
                            b.display_name()
                        )
                    } else {
                        format!(
                            "A border incident sours relations between {} and {}.",
                            a.display_name(),
                            b.display_name()
                        )
                    };
                    events.push(LogEvent::new(LogKind::Event, message));
                }
            }

            // 3. War and peace thresholds.
            let standing = world.relation(a, b);
            if standing <= config.war_threshold && !world.at_war(a, b) {
                world.declare_war(a, b);
                info!(a = a.display_name(), b = b.display_name(), "war declared");
                events.push(LogEvent::new(
                    LogKind::Event,
                    format!(
                        "War! {} and {} have taken up arms against each other.",
                        a.display_name(),
                        b.display_name()
                    ),
                ));
            } else if standing >= config.peace_threshold && world.at_war(a, b) {
                world.make_peace(a, b);
                info!(a = a.display_name(), b = b.display_name(), "peace signed");
                events.push(LogEvent::new(
                    LogKind::Event,
                    format!(
                        "Peace is signed between {} and {}.",
                        a.display_name(),
                        b.display_name()
                    ),
                ));
            }
        }
    }

    events
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
