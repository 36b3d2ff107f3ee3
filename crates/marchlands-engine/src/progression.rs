//! Character level progression.

use tracing::info;

use marchlands_types::{LogEvent, LogKind, Player};

use crate::config::ProgressionConfig;

/// Grant experience and apply any level-ups it unlocks.
///
/// Each level costs `level * level_xp_base` experience, deducted from the
/// pool as it is earned; what remains carries toward the next level. The
/// loop is bounded so a malformed grant can never spin forever.
pub fn grant_player_xp(player: &mut Player, xp: u32, config: &ProgressionConfig) -> Vec<LogEvent> {
    if xp == 0 {
        return Vec::new();
    }
    player.xp = player.xp.saturating_add(xp);

    let mut events = Vec::new();
    let mut iterations: u32 = 0;
    while iterations < config.level_up_iteration_cap {
        let needed = config.level_xp_base.saturating_mul(player.level);
        if needed == 0 || player.xp < needed {
            break;
        }
        player.xp = player.xp.saturating_sub(needed);
        player.level = player.level.saturating_add(1);
        player.skill_points = player.skill_points.saturating_add(1);
        info!(level = player.level, "level up");
        events.push(LogEvent::new(
            LogKind::System,
            format!(
                "You have reached level {}! You gain a skill point.",
                player.level
            ),
        ));
        iterations = iterations.saturating_add(1);
    }
    events
}
