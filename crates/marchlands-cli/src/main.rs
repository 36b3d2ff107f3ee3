//! Campaign runner entry point.
//!
//! Creates (or resumes) a character, hands the reins to the delegated
//! policy, and plays a stretch of days, printing the chronicle as it goes.
//! With `MARCHLANDS_LLM_API_KEY` set the live narrator writes the
//! generative content; without it the campaign runs fully offline.
//!
//! Environment:
//! - `MARCHLANDS_CONFIG` -- optional YAML tuning file
//! - `MARCHLANDS_DAYS` -- days to play (default 30)
//! - `MARCHLANDS_NAME` / `MARCHLANDS_BACKGROUND` -- the new character
//! - `MARCHLANDS_SEED` -- optional seed for reproducible runs
//! - `MARCHLANDS_SAVE` -- optional snapshot path, loaded and rewritten
//! - `MARCHLANDS_LLM_*` -- narrator backend settings

use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use marchlands_engine::delegate::run_delegated_day;
use marchlands_engine::{GenerativeProvider, Session, SimConfig, StubProvider};
use marchlands_narrator::Narrator;
use marchlands_types::{CharacterBackground, LogEntry};

/// Everything the run loop needs besides the session itself.
struct RunOptions {
    days: u64,
    name: String,
    background: CharacterBackground,
    save_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("marchlands starting");

    let config = load_config()?;
    let options = load_options()?;
    let seed = std::env::var("MARCHLANDS_SEED")
        .ok()
        .map(|raw| raw.parse::<u64>())
        .transpose()
        .map_err(|e| format!("invalid MARCHLANDS_SEED: {e}"))?;

    if std::env::var("MARCHLANDS_LLM_API_KEY").is_ok() {
        let narrator = Narrator::from_env()?;
        if !narrator.verify().await? {
            warn!("narrator verification call returned nothing usable");
        }
        let mut session = build_session(narrator, config, seed);
        run_campaign(&mut session, &options).await
    } else {
        info!("no MARCHLANDS_LLM_API_KEY set, running offline");
        let mut session = build_session(StubProvider, config, seed);
        run_campaign(&mut session, &options).await
    }
}

fn load_config() -> Result<SimConfig, Box<dyn std::error::Error>> {
    match std::env::var("MARCHLANDS_CONFIG") {
        Ok(path) => {
            let config = SimConfig::from_file(Path::new(&path))?;
            info!(path, "tuning config loaded");
            Ok(config)
        }
        Err(_) => Ok(SimConfig::default()),
    }
}

fn load_options() -> Result<RunOptions, Box<dyn std::error::Error>> {
    let days: u64 = std::env::var("MARCHLANDS_DAYS")
        .unwrap_or_else(|_| "30".to_owned())
        .parse()
        .map_err(|e| format!("invalid MARCHLANDS_DAYS: {e}"))?;

    let name = std::env::var("MARCHLANDS_NAME").unwrap_or_else(|_| "Aldwin".to_owned());

    let background_slug =
        std::env::var("MARCHLANDS_BACKGROUND").unwrap_or_else(|_| "merchant".to_owned());
    let background = parse_background(&background_slug)
        .ok_or_else(|| format!("unknown MARCHLANDS_BACKGROUND: {background_slug}"))?;

    let save_path = std::env::var("MARCHLANDS_SAVE").ok().map(PathBuf::from);

    Ok(RunOptions {
        days,
        name,
        background,
        save_path,
    })
}

fn parse_background(slug: &str) -> Option<CharacterBackground> {
    CharacterBackground::ALL
        .into_iter()
        .find(|b| b.display_name().eq_ignore_ascii_case(slug))
}

fn build_session<P: GenerativeProvider>(
    provider: P,
    config: SimConfig,
    seed: Option<u64>,
) -> Session<P> {
    match seed {
        Some(seed) => Session::with_rng(provider, config, StdRng::seed_from_u64(seed)),
        None => Session::new(provider, config),
    }
}

async fn run_campaign<P: GenerativeProvider>(
    session: &mut Session<P>,
    options: &RunOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let resumed = try_resume(session, options.save_path.as_deref())?;
    if resumed {
        info!(day = session.day(), "campaign resumed from snapshot");
    } else {
        let entries = session
            .create_character(&options.name, options.background)
            .await?;
        print_entries(&entries);
    }

    session.set_delegated(true);
    for _ in 0..options.days {
        if !session.is_delegated() {
            warn!("delegation was disabled, ending the run early");
            break;
        }
        let entries = run_delegated_day(session).await?;
        print_entries(&entries);
    }

    let player = session.player()?;
    let usage = session.token_usage();
    info!(
        day = session.day(),
        gold = player.gold,
        renown = player.renown,
        level = player.level,
        troops = player.total_troops(),
        tokens = usage.total,
        "campaign stretch complete"
    );

    if let Some(path) = options.save_path.as_deref() {
        let document = session.export_snapshot()?;
        std::fs::write(path, document)?;
        info!(path = %path.display(), "snapshot written");
    }
    Ok(())
}

/// Load a snapshot into the session if the save path points at one.
fn try_resume<P: GenerativeProvider>(
    session: &mut Session<P>,
    save_path: Option<&Path>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let Some(path) = save_path else {
        return Ok(false);
    };
    if !path.exists() {
        return Ok(false);
    }
    let document = std::fs::read_to_string(path)?;
    session.import_snapshot(&document)?;
    Ok(true)
}

fn print_entries(entries: &[LogEntry]) {
    for entry in entries {
        info!(day = entry.day, kind = ?entry.kind, "{}", entry.message);
    }
}
