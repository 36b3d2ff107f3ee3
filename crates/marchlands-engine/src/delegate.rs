//! The delegated decision policy.
//!
//! When the player hands over the reins, one call here plays one full
//! day. Rules are tried in priority order and the first applicable one
//! acts; whatever the rule did, the day always advances exactly once.
//!
//! The provider is treated with suspicion: a rate limit shuts delegation
//! down with a safety break, and any other provider failure downgrades
//! the day to a rest rather than aborting the campaign.

use std::collections::{BTreeSet, VecDeque};

use rand::seq::IndexedRandom;
use tracing::{debug, info};

use marchlands_types::{
    CompanionId, EnterpriseKind, GoodId, LocationId, LogEntry, LogKind, QuestKind, UnitId,
};
use marchlands_world::{WorldState, templates};

use crate::error::EngineError;
use crate::provider::{GenerativeProvider, ProviderError};
use crate::session::{Session, TravelOutcome};

/// Play one delegated day.
pub async fn run_delegated_day<P: GenerativeProvider>(
    session: &mut Session<P>,
) -> Result<Vec<LogEntry>, EngineError> {
    let mut entries = Vec::new();

    // Rule 1: follow the active commission.
    if let Some(plan) = quest_plan(session)? {
        if let Some((good, missing)) = plan.buy {
            match session.buy_good(good, missing) {
                Ok(mut bought) => entries.append(&mut bought),
                Err(EngineError::Action(_)) => {}
                Err(err) => return Err(err),
            }
        }
        if plan.hunt_here {
            debug!("delegate hunts the bounty party here");
            match session.seek_battle().await {
                Ok(mut fought) => entries.append(&mut fought),
                Err(err) => return absorb(session, err, entries).await,
            }
            return finish_with_rest(session, entries).await;
        }
        if let Some(hop) = plan.hop {
            debug!(hop = hop.as_str(), "delegate travels for the quest");
            return travel_step(session, hop, entries).await;
        }
    }

    // Rule 2: no commission, so look for one.
    if session.player()?.active_quest.is_none() {
        match session.seek_quest().await {
            Ok(_) => match session.accept_quest() {
                Ok(mut accepted) => {
                    entries.append(&mut accepted);
                    return finish_with_rest(session, entries).await;
                }
                Err(EngineError::Action(_)) => {
                    session.decline_quest()?;
                }
                Err(err) => return Err(err),
            },
            Err(EngineError::Action(_)) => {}
            Err(err) => return absorb(session, err, entries).await,
        }
    }

    // Rule 3: patch the party up.
    if wants_healing(session)? {
        if let Ok(mut healed) = session.heal_party() {
            entries.append(&mut healed);
            return finish_with_rest(session, entries).await;
        }
    }

    // Rule 4: grow the company.
    if let Some(companion_id) = affordable_companion(session)? {
        if let Ok(mut hired) = session.hire_companion(&companion_id) {
            entries.append(&mut hired);
            return finish_with_rest(session, entries).await;
        }
    }
    if let Some((target, count)) = feasible_upgrade(session)? {
        if let Ok(mut upgraded) = session.upgrade_units(target, count) {
            entries.append(&mut upgraded);
            return finish_with_rest(session, entries).await;
        }
    }
    if let Some(count) = recruitable(session)? {
        if let Ok(mut recruited) = session.recruit_troops(count) {
            entries.append(&mut recruited);
            return finish_with_rest(session, entries).await;
        }
    }

    // Rule 5: put idle gold to work.
    if let Some(kind) = enterprise_choice(session)? {
        if let Ok(mut built) = session.build_enterprise(kind) {
            entries.append(&mut built);
            return finish_with_rest(session, entries).await;
        }
    }

    // Rule 6: wander.
    let neighbors: Vec<LocationId> = {
        let world = session.world()?;
        let here = session.current_location()?;
        world
            .location(here)?
            .connected_to
            .iter()
            .cloned()
            .collect()
    };
    match neighbors.choose(session.rng()).cloned() {
        Some(destination) => travel_step(session, destination, entries).await,
        None => finish_with_rest(session, entries).await,
    }
}

struct QuestPlan {
    buy: Option<(GoodId, u32)>,
    hop: Option<LocationId>,
    hunt_here: bool,
}

/// What the active quest asks of today, if anything.
fn quest_plan<P: GenerativeProvider>(
    session: &Session<P>,
) -> Result<Option<QuestPlan>, EngineError> {
    let player = session.player()?;
    let world = session.world()?;
    let here = session.current_location()?;
    let Some(quest) = player.active_quest.as_ref() else {
        return Ok(None);
    };
    let Some(target) = quest.target_location_id.as_ref() else {
        // A bounty with a cold trail; let the lower rules fill the day.
        return Ok(None);
    };

    let buy = if quest.kind == QuestKind::Delivery {
        match (quest.target_good, quest.target_quantity) {
            (Some(good), Some(quantity)) => {
                let have = player.stock(good.into());
                let missing = quantity.saturating_sub(have);
                (missing > 0).then_some((good, missing))
            }
            _ => None,
        }
    } else {
        None
    };

    if target == here {
        return Ok(Some(QuestPlan {
            buy,
            hop: None,
            hunt_here: quest.kind == QuestKind::Bounty,
        }));
    }
    Ok(Some(QuestPlan {
        buy,
        hop: next_hop(world, here, target),
        hunt_here: false,
    }))
}

/// First step of a shortest road from `from` to `to`.
fn next_hop(world: &WorldState, from: &LocationId, to: &LocationId) -> Option<LocationId> {
    let mut seen: BTreeSet<LocationId> = BTreeSet::new();
    let mut queue: VecDeque<(LocationId, LocationId)> = VecDeque::new();
    seen.insert(from.clone());

    let start = world.location(from).ok()?;
    for neighbor in &start.connected_to {
        if neighbor == to {
            return Some(neighbor.clone());
        }
        seen.insert(neighbor.clone());
        queue.push_back((neighbor.clone(), neighbor.clone()));
    }
    while let Some((current, first)) = queue.pop_front() {
        let Ok(location) = world.location(&current) else {
            continue;
        };
        for neighbor in &location.connected_to {
            if neighbor == to {
                return Some(first);
            }
            if seen.insert(neighbor.clone()) {
                queue.push_back((neighbor.clone(), first.clone()));
            }
        }
    }
    None
}

fn wants_healing<P: GenerativeProvider>(session: &Session<P>) -> Result<bool, EngineError> {
    let player = session.player()?;
    let world = session.world()?;
    let wounded = player.is_wounded
        || player
            .companions
            .iter()
            .filter_map(|id| world.companions.get(id))
            .any(|c| c.is_wounded);
    Ok(wounded && player.gold >= session.config().actions.heal_party_cost)
}

fn affordable_companion<P: GenerativeProvider>(
    session: &Session<P>,
) -> Result<Option<CompanionId>, EngineError> {
    let player = session.player()?;
    let world = session.world()?;
    let here = session.current_location()?;
    Ok(world
        .companions
        .values()
        .find(|c| !c.recruited && c.location_id == *here && c.cost <= player.gold)
        .map(|c| c.id.clone()))
}

/// The strongest rank whose gates look passable today, one trooper at a
/// time. The action itself re-validates with the trainer discount.
fn feasible_upgrade<P: GenerativeProvider>(
    session: &Session<P>,
) -> Result<Option<(UnitId, u32)>, EngineError> {
    let player = session.player()?;
    let here = session.current_location()?;
    for target in [UnitId::Knight, UnitId::Veteran, UnitId::Footman] {
        let def = templates::unit_def(target);
        let Some(from) = def.upgrade_from else {
            continue;
        };
        if player.army.get(&from).copied().unwrap_or(0) == 0 {
            continue;
        }
        if player.unit_experience.get(&from).copied().unwrap_or(0) < def.upgrade_xp {
            continue;
        }
        if player.gold < def.upgrade_gold {
            continue;
        }
        if !def.upgrade_locations.is_empty() && !def.upgrade_locations.contains(&here.as_str()) {
            continue;
        }
        if let Some(slug) = def.upgrade_companion {
            if !player.companions.contains(&CompanionId::from(slug)) {
                continue;
            }
        }
        if def
            .upgrade_items
            .iter()
            .any(|(item, per_unit)| player.stock((*item).into()) < *per_unit)
        {
            continue;
        }
        return Ok(Some((target, 1)));
    }
    Ok(None)
}

fn recruitable<P: GenerativeProvider>(session: &Session<P>) -> Result<Option<u32>, EngineError> {
    let player = session.player()?;
    let world = session.world()?;
    let here = session.current_location()?;
    let location = world.location(here)?;
    if location.is_looted() || location.recruits_available == 0 {
        return Ok(None);
    }
    if player.gold < templates::BASE_RECRUIT_COST {
        return Ok(None);
    }
    let cap = crate::actions::army_cap(player, &session.config().actions);
    let party = player
        .total_troops()
        .saturating_add(u32::try_from(player.companions.len()).unwrap_or(u32::MAX));
    let room = cap.saturating_sub(party);
    if room == 0 {
        return Ok(None);
    }
    let affordable = player
        .gold
        .checked_div(templates::BASE_RECRUIT_COST)
        .unwrap_or(0);
    Ok(Some(room.min(location.recruits_available).min(affordable).max(1)))
}

fn enterprise_choice<P: GenerativeProvider>(
    session: &Session<P>,
) -> Result<Option<EnterpriseKind>, EngineError> {
    let player = session.player()?;
    let world = session.world()?;
    let here = session.current_location()?;
    if player.gold < session.config().delegate.enterprise_gold_threshold {
        return Ok(None);
    }
    if world.location(here)?.is_looted() {
        return Ok(None);
    }
    if player.enterprises.iter().any(|e| e.location_id == *here) {
        return Ok(None);
    }
    Ok(EnterpriseKind::ALL
        .into_iter()
        .filter(|kind| templates::enterprise_def(*kind).cost <= player.gold)
        .max_by_key(|kind| templates::enterprise_def(*kind).base_weekly_profit))
}

/// Travel toward a destination, answering any road event with the
/// least violent choice on offer.
async fn travel_step<P: GenerativeProvider>(
    session: &mut Session<P>,
    destination: LocationId,
    mut entries: Vec<LogEntry>,
) -> Result<Vec<LogEntry>, EngineError> {
    match session.travel(&destination).await {
        Ok(TravelOutcome::Arrived(arrived)) => {
            entries.extend(arrived);
            Ok(entries)
        }
        Ok(TravelOutcome::EventPending(event)) => {
            let choice = event
                .choices
                .iter()
                .position(|c| c.forced_battle.is_none())
                .unwrap_or(0);
            match session.choose_travel_event(choice).await {
                Ok(chosen) => {
                    entries.extend(chosen);
                    Ok(entries)
                }
                Err(err) => absorb(session, err, entries).await,
            }
        }
        Err(err) => absorb(session, err, entries).await,
    }
}

/// Close the day when the chosen rule did not advance it.
async fn finish_with_rest<P: GenerativeProvider>(
    session: &mut Session<P>,
    mut entries: Vec<LogEntry>,
) -> Result<Vec<LogEntry>, EngineError> {
    entries.extend(session.rest().await?);
    Ok(entries)
}

/// Downgrade provider trouble instead of crashing the campaign.
async fn absorb<P: GenerativeProvider>(
    session: &mut Session<P>,
    err: EngineError,
    mut entries: Vec<LogEntry>,
) -> Result<Vec<LogEntry>, EngineError> {
    match err {
        EngineError::Provider(ProviderError::RateLimited) => {
            info!("delegation halted by provider rate limit");
            session.set_delegated(false);
            entries.extend(session.note(
                LogKind::System,
                "The chronicler is overwhelmed; you take back the reins.",
            ));
            Ok(entries)
        }
        EngineError::Provider(other) => {
            debug!(error = %other, "provider failed; the day is spent resting");
            entries.extend(session.rest().await?);
            Ok(entries)
        }
        other => Err(other),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::float_cmp)]

    use super::*;
    use crate::config::SimConfig;
    use crate::provider::{
        BattleRequest, ProviderError, ProviderReply, QuestRequest, StubProvider,
        TravelEventRequest,
    };
    use marchlands_types::{
        BattleResult, CharacterBackground, GeneratedCharacter, Quest, TravelEvent,
    };
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn offline_session() -> Session<StubProvider> {
        Session::with_rng(
            StubProvider,
            SimConfig::default(),
            StdRng::seed_from_u64(11),
        )
    }

    /// A provider that is "live" but rate limited on every call.
    struct RateLimitedProvider;

    impl GenerativeProvider for RateLimitedProvider {
        fn is_live(&self) -> bool {
            true
        }
        async fn verify(&self) -> Result<bool, ProviderError> {
            Err(ProviderError::RateLimited)
        }
        async fn generate_character(
            &self,
            _background: CharacterBackground,
        ) -> Result<ProviderReply<GeneratedCharacter>, ProviderError> {
            Err(ProviderError::RateLimited)
        }
        async fn simulate_battle(
            &self,
            _request: &BattleRequest,
        ) -> Result<ProviderReply<BattleResult>, ProviderError> {
            Err(ProviderError::RateLimited)
        }
        async fn generate_quest(
            &self,
            _request: &QuestRequest,
        ) -> Result<ProviderReply<Quest>, ProviderError> {
            Err(ProviderError::RateLimited)
        }
        async fn bounty_destination(
            &self,
            _quest: &Quest,
            _candidates: &[LocationId],
        ) -> Result<ProviderReply<Option<LocationId>>, ProviderError> {
            Err(ProviderError::RateLimited)
        }
        async fn tavern_rumor(
            &self,
            _location_name: &str,
        ) -> Result<ProviderReply<String>, ProviderError> {
            Err(ProviderError::RateLimited)
        }
        async fn travel_event(
            &self,
            _request: &TravelEventRequest,
        ) -> Result<ProviderReply<TravelEvent>, ProviderError> {
            Err(ProviderError::RateLimited)
        }
    }

    #[tokio::test]
    async fn every_delegated_day_advances_exactly_once() {
        let mut session = offline_session();
        session
            .create_character("Aeric", CharacterBackground::Nomad)
            .await
            .unwrap();
        session.set_delegated(true);
        for expected in 2..=6 {
            run_delegated_day(&mut session).await.unwrap();
            assert_eq!(session.day(), expected);
        }
    }

    #[tokio::test]
    async fn a_rich_delegate_hires_the_local_companion() {
        let mut session = offline_session();
        // A merchant starts with well over Elric's 300 gold.
        session
            .create_character("Aeric", CharacterBackground::Merchant)
            .await
            .unwrap();
        session.set_delegated(true);
        run_delegated_day(&mut session).await.unwrap();
        assert_eq!(
            session.player().unwrap().companions,
            vec![CompanionId::from("elric")]
        );
    }

    #[tokio::test]
    async fn a_wounded_delegate_pays_the_physician_first() {
        let mut session = offline_session();
        session
            .create_character("Aeric", CharacterBackground::Merchant)
            .await
            .unwrap();
        // Wounding the player through a snapshot keeps the test on the
        // public surface.
        let mut save: serde_json::Value =
            serde_json::from_str(&session.export_snapshot().unwrap()).unwrap();
        save["player"]["hp"] = 20.into();
        save["player"]["is_wounded"] = true.into();
        session.import_snapshot(&save.to_string()).unwrap();
        session.set_delegated(true);

        run_delegated_day(&mut session).await.unwrap();
        let player = session.player().unwrap();
        // +50 from the physician, +10 from the overnight rest.
        assert_eq!(player.hp, 80);
    }

    #[tokio::test]
    async fn rate_limiting_trips_the_safety_break() {
        let mut session = Session::with_rng(
            RateLimitedProvider,
            SimConfig::default(),
            StdRng::seed_from_u64(3),
        );
        session
            .create_character("Aeric", CharacterBackground::Nomad)
            .await
            .unwrap();
        session.set_delegated(true);

        let entries = run_delegated_day(&mut session).await.unwrap();
        assert!(!session.is_delegated());
        assert!(
            entries
                .iter()
                .any(|e| e.message.contains("take back the reins"))
        );
    }

    #[test]
    fn the_road_planner_finds_a_first_hop() {
        let world = WorldState::new();
        // Westmere to Tulkan is a multi-day ride; the first hop must be a
        // direct neighbor.
        let hop = next_hop(
            &world,
            &LocationId::from("westmere"),
            &LocationId::from("tulkan"),
        )
        .unwrap();
        let start = world.location(&LocationId::from("westmere")).unwrap();
        assert!(start.connected_to.contains(&hop));

        // Adjacent hop is the destination itself.
        assert_eq!(
            next_hop(
                &world,
                &LocationId::from("westmere"),
                &LocationId::from("caldrith")
            ),
            Some(LocationId::from("caldrith"))
        );
    }
}
