//! The game session: one campaign, one player, one provider.
//!
//! The session owns the world, the player, the log, and the RNG, and is
//! the only layer allowed to talk to the content provider. Every public
//! operation passes a busy gate so a second command cannot interleave
//! with one still in flight; the gate clears on every path, including
//! errors.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::{info, warn};

use marchlands_types::{
    CharacterBackground, CompanionId, EquipmentSlot, FactionId, GeneratedCharacter, GoodId, ItemId,
    LocationId, LogEntry, LogEvent, LogKind, Player, Quest, QuestKind, QuestStatus, SkillId,
    TokenUsage, TravelEvent, UnitId,
};
use marchlands_world::{SaveGame, WorldState, templates};

use crate::actions::{self, ActionError};
use crate::battle;
use crate::config::SimConfig;
use crate::error::EngineError;
use crate::provider::{
    BattleRequest, GenerativeProvider, ProviderReply, QuestRequest, TravelEventRequest,
};
use crate::skill::{companion_skill_sum, effective_skill};
use crate::tick;
use crate::travel;

/// A journey waiting on an event choice.
#[derive(Debug, Clone)]
struct PendingTravel {
    destination: LocationId,
    event: TravelEvent,
}

/// The mutable campaign state behind a created character.
#[derive(Debug, Clone)]
struct Game {
    world: WorldState,
    player: Player,
    current_location_id: LocationId,
    pending_travel: Option<PendingTravel>,
    pending_quest: Option<Quest>,
}

/// How a travel command resolved.
#[derive(Debug, Clone)]
pub enum TravelOutcome {
    /// The party arrived; the journey's log entries.
    Arrived(Vec<LogEntry>),
    /// Something happened on the road; a choice is required before the
    /// journey can finish.
    EventPending(TravelEvent),
}

/// A running campaign bound to a content provider.
pub struct Session<P> {
    provider: P,
    config: SimConfig,
    rng: StdRng,
    game: Option<Game>,
    busy: bool,
    delegated: bool,
    log: Vec<LogEntry>,
    log_id_counter: u64,
    token_usage: TokenUsage,
}

impl<P: GenerativeProvider> Session<P> {
    /// Start an empty session.
    pub fn new(provider: P, config: SimConfig) -> Self {
        Self::with_rng(provider, config, StdRng::from_os_rng())
    }

    /// Start an empty session with a fixed RNG, for reproducible runs.
    pub fn with_rng(provider: P, config: SimConfig, rng: StdRng) -> Self {
        Self {
            provider,
            config,
            rng,
            game: None,
            busy: false,
            delegated: false,
            log: Vec::new(),
            log_id_counter: 0,
            token_usage: TokenUsage::default(),
        }
    }

    // -- accessors ----------------------------------------------------------

    /// The current day, 1 before any campaign starts.
    pub fn day(&self) -> u64 {
        self.game.as_ref().map_or(1, |g| g.world.day)
    }

    /// The player, if a character exists.
    pub fn player(&self) -> Result<&Player, EngineError> {
        self.game
            .as_ref()
            .map(|g| &g.player)
            .ok_or(EngineError::NoCharacter)
    }

    /// The world, if a campaign is running.
    pub fn world(&self) -> Result<&WorldState, EngineError> {
        self.game
            .as_ref()
            .map(|g| &g.world)
            .ok_or(EngineError::NoCharacter)
    }

    /// Where the player currently stands.
    pub fn current_location(&self) -> Result<&LocationId, EngineError> {
        self.game
            .as_ref()
            .map(|g| &g.current_location_id)
            .ok_or(EngineError::NoCharacter)
    }

    /// The quest currently on offer, if any.
    pub fn pending_quest(&self) -> Option<&Quest> {
        self.game.as_ref().and_then(|g| g.pending_quest.as_ref())
    }

    /// The full game log.
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Provider token accounting.
    pub const fn token_usage(&self) -> TokenUsage {
        self.token_usage
    }

    /// Whether the delegate is running the campaign.
    pub const fn is_delegated(&self) -> bool {
        self.delegated
    }

    /// Hand control to or take it back from the delegate.
    pub fn set_delegated(&mut self, delegated: bool) {
        self.delegated = delegated;
    }

    /// The simulation configuration in force.
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    // -- internals ----------------------------------------------------------

    fn acquire(&mut self) -> Result<(), EngineError> {
        if self.busy {
            return Err(EngineError::Busy);
        }
        self.busy = true;
        Ok(())
    }

    fn game_mut(&mut self) -> Result<&mut Game, EngineError> {
        self.game.as_mut().ok_or(EngineError::NoCharacter)
    }

    fn push_events(&mut self, day: u64, events: Vec<LogEvent>) -> Vec<LogEntry> {
        let mut entries = Vec::with_capacity(events.len());
        for event in events {
            let entry = LogEntry {
                id: self.log_id_counter,
                day,
                kind: event.kind,
                message: event.message,
            };
            self.log_id_counter = self.log_id_counter.saturating_add(1);
            self.log.push(entry.clone());
            entries.push(entry);
        }
        entries
    }

    fn record_reply<T>(&mut self, reply: &ProviderReply<T>) {
        self.token_usage.record(reply.tokens);
    }

    /// Append a single session-authored log entry.
    pub(crate) fn note(&mut self, kind: LogKind, message: impl Into<String>) -> Vec<LogEntry> {
        let day = self.day();
        self.push_events(day, vec![LogEvent::new(kind, message)])
    }

    pub(crate) const fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Run an action against the live game and log its events.
    fn run_action<F>(&mut self, action: F) -> Result<Vec<LogEntry>, EngineError>
    where
        F: FnOnce(&mut Game, &SimConfig, &mut StdRng) -> Result<Vec<LogEvent>, ActionError>,
    {
        self.acquire()?;
        let result = match self.game.as_mut() {
            Some(game) => action(game, &self.config, &mut self.rng).map_err(EngineError::from),
            None => Err(EngineError::NoCharacter),
        };
        let outcome = match result {
            Ok(events) => {
                let day = self.day();
                Ok(self.push_events(day, events))
            }
            Err(err) => Err(err),
        };
        self.busy = false;
        outcome
    }

    fn advance_one_day(&mut self) -> Result<Vec<LogEvent>, EngineError> {
        let config = self.config.clone();
        let game = self.game.as_mut().ok_or(EngineError::NoCharacter)?;
        Ok(tick::advance_day(
            &mut game.world,
            &mut game.player,
            &config,
            &mut self.rng,
        ))
    }

    /// Ask the provider where the hunted bounty party has moved.
    ///
    /// Failures and unknown settlements leave the trail where it was; the
    /// quest is never corrupted by a bad payload.
    async fn refresh_bounty_trail(&mut self) {
        if !self.provider.is_live() {
            return;
        }
        let Some(game) = self.game.as_ref() else {
            return;
        };
        let Some(quest) = game.player.active_quest.clone() else {
            return;
        };
        if quest.kind != QuestKind::Bounty || quest.status != QuestStatus::Active {
            return;
        }
        let candidates: Vec<LocationId> = game.world.locations.keys().cloned().collect();
        match self.provider.bounty_destination(&quest, &candidates).await {
            Ok(reply) => {
                self.record_reply(&reply);
                if let Some(Some(destination)) = reply.data {
                    if let Some(game) = self.game.as_mut() {
                        let name = game
                            .world
                            .location(&destination)
                            .map(|l| l.name.clone())
                            .unwrap_or_default();
                        if name.is_empty() {
                            warn!(destination = destination.as_str(), "bounty trail named an unknown settlement");
                            return;
                        }
                        if let Some(active) = game.player.active_quest.as_mut() {
                            active.target_location_id = Some(destination);
                            active.target_enemy_hint =
                                Some(format!("last seen near {name}"));
                        }
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "bounty trail lookup failed");
            }
        }
    }

    async fn resolve_battle_inner(
        &mut self,
        enemy_name: String,
        enemy_size: u32,
    ) -> Result<Vec<LogEntry>, EngineError> {
        let request = {
            let game = self.game.as_ref().ok_or(EngineError::NoCharacter)?;
            let player = &game.player;
            let world = &game.world;
            BattleRequest {
                enemy_name: enemy_name.clone(),
                enemy_size,
                army: player.army.clone(),
                companion_names: player
                    .companions
                    .iter()
                    .filter_map(|id| world.companions.get(id))
                    .map(|c| c.name.clone())
                    .collect(),
                player_level: player.level,
                tactics: effective_skill(player, world, SkillId::Tactics),
                surgery: effective_skill(player, world, SkillId::Surgery),
                looting: companion_skill_sum(player, world, SkillId::Looting),
                quest_enemy_name: player
                    .active_quest
                    .as_ref()
                    .and_then(|q| q.target_enemy_name.clone()),
            }
        };

        let reply = self.provider.simulate_battle(&request).await?;
        self.record_reply(&reply);
        let events = match reply.data {
            Some(result) => {
                let config = self.config.clone();
                let game = self.game_mut()?;
                battle::apply_battle(&mut game.world, &mut game.player, &result, &config)
            }
            None => vec![LogEvent::new(
                LogKind::Battle,
                format!("{enemy_name} slip away before blades are drawn."),
            )],
        };
        let day = self.day();
        Ok(self.push_events(day, events))
    }

    // -- character creation -------------------------------------------------

    /// Create a new character and start the campaign at the capital.
    ///
    /// The provider writes name, backstory, and starting fortunes; when it
    /// is offline or fails, the fallback rolls within the background's
    /// template ranges. Either way the engine pins the progression fields.
    pub async fn create_character(
        &mut self,
        name: &str,
        background: CharacterBackground,
    ) -> Result<Vec<LogEntry>, EngineError> {
        self.acquire()?;
        let result = self.create_character_inner(name, background).await;
        self.busy = false;
        result
    }

    async fn create_character_inner(
        &mut self,
        name: &str,
        background: CharacterBackground,
    ) -> Result<Vec<LogEntry>, EngineError> {
        let generated = if self.provider.is_live() {
            match self.provider.generate_character(background).await {
                Ok(reply) => {
                    self.record_reply(&reply);
                    reply.data
                }
                Err(err) => {
                    warn!(error = %err, "character generation failed; using template roll");
                    None
                }
            }
        } else {
            None
        };
        let generated = generated.unwrap_or_else(|| self.roll_character(background));

        let mut player = Player {
            name: if name.is_empty() {
                generated.name
            } else {
                name.to_owned()
            },
            backstory: generated.backstory,
            background,
            gold: generated.gold,
            renown: generated.renown,
            level: 1,
            xp: 0,
            skill_points: 1,
            skills: Default::default(),
            unit_experience: Default::default(),
            faction_id: None,
            army: generated.army,
            wounded_army: Default::default(),
            inventory: Default::default(),
            equipment: Default::default(),
            active_quest: None,
            faction_relations: Default::default(),
            companions: Vec::new(),
            enterprises: Vec::new(),
            fiefs: Vec::new(),
            hp: 100,
            is_wounded: false,
        };
        player.equipment.insert(EquipmentSlot::Body, ItemId::TatteredRags);
        if background == CharacterBackground::Blacksmith {
            player.equipment.insert(EquipmentSlot::Weapon, ItemId::RustySword);
        }

        let player_name = player.name.clone();
        self.game = Some(Game {
            world: WorldState::new(),
            player,
            current_location_id: templates::start_location(),
            pending_travel: None,
            pending_quest: None,
        });
        info!(name = %player_name, background = background.display_name(), "character created");
        Ok(self.push_events(
            1,
            vec![LogEvent::new(
                LogKind::System,
                format!("{player_name} takes the road at Westmere. The campaign begins."),
            )],
        ))
    }

    fn roll_character(&mut self, background: CharacterBackground) -> GeneratedCharacter {
        let def = templates::background_def(background);
        let gold = self.rng.random_range(def.gold_min..=def.gold_max.max(def.gold_min));
        let renown = self
            .rng
            .random_range(def.renown_min..=def.renown_max.max(def.renown_min));
        let troops = self
            .rng
            .random_range(def.troops_min..=def.troops_max.max(def.troops_min));
        let mut army = std::collections::BTreeMap::new();
        if troops > 0 {
            army.insert(UnitId::Recruit, troops);
        }
        GeneratedCharacter {
            name: format!("The {}", background.display_name()),
            backstory: format!(
                "A {} who came to the Marchlands with little but a name to make.",
                background.display_name().to_lowercase()
            ),
            gold,
            renown,
            army,
        }
    }

    // -- days and travel ----------------------------------------------------

    /// Stay put and let the day pass.
    pub async fn rest(&mut self) -> Result<Vec<LogEntry>, EngineError> {
        self.acquire()?;
        let result = self.rest_inner().await;
        self.busy = false;
        result
    }

    async fn rest_inner(&mut self) -> Result<Vec<LogEntry>, EngineError> {
        let events = self.advance_one_day()?;
        let day = self.day();
        let entries = self.push_events(day, events);
        self.refresh_bounty_trail().await;
        Ok(entries)
    }

    /// Ride for a connected settlement.
    ///
    /// Most days the road is quiet and the party arrives; sometimes (live
    /// provider only) something happens on the way and the journey pauses
    /// on a choice.
    pub async fn travel(&mut self, destination: &LocationId) -> Result<TravelOutcome, EngineError> {
        self.acquire()?;
        let result = self.travel_inner(destination).await;
        self.busy = false;
        result
    }

    async fn travel_inner(
        &mut self,
        destination: &LocationId,
    ) -> Result<TravelOutcome, EngineError> {
        let (from_name, to_name, gold, troops) = {
            let game = self.game.as_ref().ok_or(EngineError::NoCharacter)?;
            let here = game.world.location(&game.current_location_id)?;
            if !here.connected_to.contains(destination) {
                let name = game
                    .world
                    .location(destination)
                    .map_or_else(|_| destination.as_str().to_owned(), |l| l.name.clone());
                return Err(ActionError::NotConnected { destination: name }.into());
            }
            let to = game.world.location(destination)?;
            (
                here.name.clone(),
                to.name.clone(),
                game.player.gold,
                game.player.total_troops(),
            )
        };

        if self.provider.is_live()
            && self.rng.random_bool(self.config.actions.travel_event_chance)
        {
            let request = TravelEventRequest {
                from_name,
                to_name,
                player_gold: gold,
                player_troops: troops,
            };
            match self.provider.travel_event(&request).await {
                Ok(reply) => {
                    self.record_reply(&reply);
                    if let Some(event) = reply.data {
                        if event.choices.len() >= 2 {
                            let game = self.game_mut()?;
                            game.pending_travel = Some(PendingTravel {
                                destination: destination.clone(),
                                event: event.clone(),
                            });
                            return Ok(TravelOutcome::EventPending(event));
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "travel event failed; the road stays quiet");
                }
            }
        }

        let entries = self.complete_travel(destination).await?;
        Ok(TravelOutcome::Arrived(entries))
    }

    /// Answer a pending travel event.
    ///
    /// A forced battle cancels the day's arrival: the party fights where
    /// it stands and the journey is abandoned. Any other choice applies
    /// its consequences and the journey completes.
    pub async fn choose_travel_event(
        &mut self,
        choice_index: usize,
    ) -> Result<Vec<LogEntry>, EngineError> {
        self.acquire()?;
        let result = self.choose_travel_event_inner(choice_index).await;
        self.busy = false;
        result
    }

    async fn choose_travel_event_inner(
        &mut self,
        choice_index: usize,
    ) -> Result<Vec<LogEntry>, EngineError> {
        let pending = {
            let game = self.game_mut()?;
            game.pending_travel.take().ok_or(EngineError::NothingPending)?
        };
        let outcome = {
            let game = self.game_mut()?;
            travel::apply_event_choice(&mut game.player, &pending.event, choice_index)
                .ok_or(EngineError::NothingPending)?
        };
        let day = self.day();
        let mut entries = self.push_events(day, outcome.events);

        if let Some(forced) = outcome.forced_battle {
            let detour = self.push_events(
                day,
                vec![LogEvent::new(
                    LogKind::Travel,
                    "The journey is abandoned; you make your stand where the road found you.",
                )],
            );
            entries.extend(detour);
            entries.extend(
                self.resolve_battle_inner(forced.enemy_name, forced.enemy_size)
                    .await?,
            );
            return Ok(entries);
        }

        entries.extend(self.complete_travel(&pending.destination).await?);
        Ok(entries)
    }

    /// Advance the day and put the party at the destination.
    async fn complete_travel(
        &mut self,
        destination: &LocationId,
    ) -> Result<Vec<LogEntry>, EngineError> {
        let mut events = self.advance_one_day()?;
        let config = self.config.clone();
        {
            let game = self.game_mut()?;
            game.current_location_id = destination.clone();
            events.extend(travel::arrive(
                &mut game.world,
                &mut game.player,
                destination,
                &config,
            )?);
        }
        let day = self.day();
        let entries = self.push_events(day, events);
        self.refresh_bounty_trail().await;
        Ok(entries)
    }

    // -- battles ------------------------------------------------------------

    /// Ride out looking for a fight.
    ///
    /// At war there is a fair chance of meeting an enemy patrol; otherwise
    /// the roads offer bandits. The opposing force is sized against the
    /// party.
    pub async fn seek_battle(&mut self) -> Result<Vec<LogEntry>, EngineError> {
        self.acquire()?;
        let result = self.seek_battle_inner().await;
        self.busy = false;
        result
    }

    async fn seek_battle_inner(&mut self) -> Result<Vec<LogEntry>, EngineError> {
        let (party, enemies) = {
            let game = self.game.as_ref().ok_or(EngineError::NoCharacter)?;
            let party = game
                .player
                .total_troops()
                .saturating_add(u32::try_from(game.player.companions.len()).unwrap_or(u32::MAX));
            let enemies: Vec<FactionId> = game
                .player
                .faction_id
                .map(|f| game.world.enemies_of(f).into_iter().collect())
                .unwrap_or_default();
            (party, enemies)
        };

        let scale = self.config.actions.seek_battle_base
            + self.rng.random::<f64>() * self.config.actions.seek_battle_spread;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let enemy_size = ((f64::from(party) * scale).round() as u32).max(1);

        let enemy_name = enemies
            .choose(&mut self.rng)
            .filter(|_| self.rng.random_bool(self.config.actions.patrol_chance))
            .map_or_else(
                || "a band of brigands".to_owned(),
                |faction| format!("a {} war patrol", faction.display_name()),
            );

        self.resolve_battle_inner(enemy_name, enemy_size).await
    }

    // -- quests and rumors --------------------------------------------------

    /// Ask around the settlement for work.
    pub async fn seek_quest(&mut self) -> Result<Quest, EngineError> {
        self.acquire()?;
        let result = self.seek_quest_inner().await;
        self.busy = false;
        result
    }

    async fn seek_quest_inner(&mut self) -> Result<Quest, EngineError> {
        let request = {
            let game = self.game.as_ref().ok_or(EngineError::NoCharacter)?;
            if game.player.active_quest.is_some() {
                return Err(ActionError::QuestAlreadyActive.into());
            }
            let here = game.world.location(&game.current_location_id)?;
            let giver = game
                .world
                .lords
                .values()
                .find(|l| l.current_location_id == here.id && !l.is_defeated)
                .map_or_else(|| "the town magistrate".to_owned(), |l| l.name.clone());
            QuestRequest {
                location_name: here.name.clone(),
                giver,
                faction_id: here.faction_id,
                destinations: game
                    .world
                    .locations
                    .values()
                    .filter(|l| l.id != here.id)
                    .map(|l| (l.id.clone(), l.name.clone()))
                    .collect(),
                player_renown: game.player.renown,
            }
        };

        let reply = self.provider.generate_quest(&request).await?;
        self.record_reply(&reply);
        let quest = reply.data.ok_or(ActionError::NoQuestOffered)?;
        let game = self.game_mut()?;
        game.pending_quest = Some(quest.clone());
        Ok(quest)
    }

    /// Take the quest currently on offer.
    ///
    /// A delivery whose destination is not on the map is refused here, so
    /// an impossible commission never becomes the active quest.
    pub fn accept_quest(&mut self) -> Result<Vec<LogEntry>, EngineError> {
        self.acquire()?;
        let result = self.accept_quest_inner();
        self.busy = false;
        result
    }

    fn accept_quest_inner(&mut self) -> Result<Vec<LogEntry>, EngineError> {
        let game = self.game_mut()?;
        if game.player.active_quest.is_some() {
            return Err(ActionError::QuestAlreadyActive.into());
        }
        let mut quest = game
            .pending_quest
            .take()
            .ok_or(ActionError::NoQuestOffered)?;
        if quest.kind == QuestKind::Delivery {
            let known = quest
                .target_location_id
                .as_ref()
                .is_some_and(|id| game.world.location(id).is_ok());
            if !known {
                return Err(ActionError::UnknownDestination.into());
            }
        }
        quest.status = QuestStatus::Active;
        let title = quest.title.clone();
        game.player.active_quest = Some(quest);
        let day = self.day();
        Ok(self.push_events(
            day,
            vec![LogEvent::new(
                LogKind::Quest,
                format!("Commission accepted: \"{title}\"."),
            )],
        ))
    }

    /// Turn down the quest on offer.
    pub fn decline_quest(&mut self) -> Result<(), EngineError> {
        self.acquire()?;
        let result = self
            .game_mut()
            .map(|game| {
                game.pending_quest = None;
            });
        self.busy = false;
        result
    }

    /// Buy a round in the tavern and listen.
    ///
    /// The coin is refunded when the provider has nothing; the player
    /// never pays for silence.
    pub async fn gather_rumor(&mut self) -> Result<Vec<LogEntry>, EngineError> {
        self.acquire()?;
        let result = self.gather_rumor_inner().await;
        self.busy = false;
        result
    }

    async fn gather_rumor_inner(&mut self) -> Result<Vec<LogEntry>, EngineError> {
        let cost = self.config.actions.rumor_cost;
        let location_name = {
            let game = self.game_mut()?;
            if !game.player.try_spend_gold(cost) {
                return Err(ActionError::NotEnoughGold {
                    needed: cost,
                    have: game.player.gold,
                }
                .into());
            }
            let game = &*game;
            game.world.location(&game.current_location_id)?.name.clone()
        };

        let outcome = self.provider.tavern_rumor(&location_name).await;
        match outcome {
            Ok(reply) => {
                self.record_reply(&reply);
                match reply.data {
                    Some(rumor) => {
                        let day = self.day();
                        Ok(self.push_events(day, vec![LogEvent::new(LogKind::Rumor, rumor)]))
                    }
                    None => {
                        self.refund_rumor(cost);
                        let day = self.day();
                        Ok(self.push_events(
                            day,
                            vec![LogEvent::new(
                                LogKind::Rumor,
                                "The taproom has nothing for you tonight; your coin comes back.",
                            )],
                        ))
                    }
                }
            }
            Err(err) => {
                self.refund_rumor(cost);
                Err(err.into())
            }
        }
    }

    fn refund_rumor(&mut self, cost: u32) {
        if let Some(game) = self.game.as_mut() {
            game.player.add_gold(cost);
        }
    }

    // -- action wrappers ----------------------------------------------------

    /// Sign levies on at the current settlement.
    pub fn recruit_troops(&mut self, count: u32) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, config, _| {
            actions::recruit_troops(
                &mut game.world,
                &mut game.player,
                &game.current_location_id.clone(),
                count,
                &config.actions,
            )
        })
    }

    /// Buy goods at the local market.
    pub fn buy_good(&mut self, good: GoodId, count: u32) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, config, _| {
            actions::buy_good(
                &game.world,
                &mut game.player,
                &game.current_location_id,
                good,
                count,
                &config.actions,
            )
        })
    }

    /// Sell goods at the local market.
    pub fn sell_good(&mut self, good: GoodId, count: u32) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, config, _| {
            actions::sell_good(
                &game.world,
                &mut game.player,
                &game.current_location_id,
                good,
                count,
                &config.actions,
            )
        })
    }

    /// Buy a piece of equipment.
    pub fn buy_item(&mut self, item: ItemId) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, _, _| {
            actions::buy_item(&game.world, &mut game.player, &game.current_location_id, item)
        })
    }

    /// Build an enterprise in the current town.
    pub fn build_enterprise(
        &mut self,
        kind: marchlands_types::EnterpriseKind,
    ) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, _, _| {
            actions::build_enterprise(
                &game.world,
                &mut game.player,
                &game.current_location_id,
                kind,
            )
        })
    }

    /// Train troops up to the next rank.
    pub fn upgrade_units(
        &mut self,
        target: UnitId,
        count: u32,
    ) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, config, _| {
            actions::upgrade_units(
                &mut game.world,
                &mut game.player,
                &game.current_location_id.clone(),
                target,
                count,
                &config.actions,
            )
        })
    }

    /// Equip an item from the baggage onto the player.
    pub fn equip_player(&mut self, item: ItemId) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, _, _| actions::equip_player(&mut game.player, item))
    }

    /// Return an equipped item to the baggage.
    pub fn unequip_player(&mut self, slot: EquipmentSlot) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, _, _| actions::unequip_player(&mut game.player, slot))
    }

    /// Equip an item from the baggage onto a companion.
    pub fn equip_companion(
        &mut self,
        companion_id: &CompanionId,
        item: ItemId,
    ) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, _, _| {
            actions::equip_companion(&mut game.world, &mut game.player, companion_id, item)
        })
    }

    /// Spend a skill point.
    pub fn spend_skill_point(&mut self, skill: SkillId) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, _, _| actions::spend_skill_point(&mut game.player, skill))
    }

    /// Hire a companion waiting in the local tavern.
    pub fn hire_companion(
        &mut self,
        companion_id: &CompanionId,
    ) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, _, _| {
            actions::hire_companion(
                &mut game.world,
                &mut game.player,
                &game.current_location_id.clone(),
                companion_id,
            )
        })
    }

    /// Swear an oath to a great faction.
    pub fn join_faction(&mut self, faction: FactionId) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, config, _| {
            actions::join_faction(&mut game.player, faction, &config.actions)
        })
    }

    /// Petition the sworn faction for a fief.
    pub fn request_fief(&mut self) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, _, _| actions::request_fief(&mut game.world, &mut game.player))
    }

    /// Collect taxes at the current fief.
    pub fn collect_taxes(&mut self) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, _, _| {
            actions::collect_taxes(
                &mut game.world,
                &mut game.player,
                &game.current_location_id.clone(),
            )
        })
    }

    /// Move troops from the field army into the fief garrison.
    pub fn garrison_deposit(
        &mut self,
        unit: UnitId,
        count: u32,
    ) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, _, _| {
            actions::garrison_deposit(
                &mut game.world,
                &mut game.player,
                &game.current_location_id.clone(),
                unit,
                count,
            )
        })
    }

    /// Move troops from the fief garrison back to the field army.
    pub fn garrison_withdraw(
        &mut self,
        unit: UnitId,
        count: u32,
    ) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, _, _| {
            actions::garrison_withdraw(
                &mut game.world,
                &mut game.player,
                &game.current_location_id.clone(),
                unit,
                count,
            )
        })
    }

    /// Put the current settlement to the torch.
    pub fn raid_location(&mut self) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, config, rng| {
            actions::raid_location(
                &mut game.world,
                &mut game.player,
                &game.current_location_id.clone(),
                &config.actions,
                rng,
            )
        })
    }

    /// Pay a physician to treat the wounded.
    pub fn heal_party(&mut self) -> Result<Vec<LogEntry>, EngineError> {
        self.run_action(|game, config, _| {
            actions::heal_party(&mut game.world, &mut game.player, &config.actions)
        })
    }

    // -- persistence --------------------------------------------------------

    /// Export the whole campaign as one JSON document.
    pub fn export_snapshot(&self) -> Result<String, EngineError> {
        let game = self.game.as_ref().ok_or(EngineError::NoCharacter)?;
        let save = SaveGame::capture(
            &game.world,
            &game.player,
            &game.current_location_id,
            &self.log,
            self.log_id_counter,
            self.delegated,
            self.token_usage,
        );
        Ok(serde_json::to_string_pretty(&save)?)
    }

    /// Replace the running campaign with a saved one.
    ///
    /// A document missing the player or the current location fails to
    /// parse and leaves the session untouched.
    pub fn import_snapshot(&mut self, document: &str) -> Result<(), EngineError> {
        let save: SaveGame = serde_json::from_str(document)?;
        let (world, restored) = save.restore();
        self.game = Some(Game {
            world,
            player: restored.player,
            current_location_id: restored.current_location_id,
            pending_travel: None,
            pending_quest: None,
        });
        self.log = restored.log;
        self.log_id_counter = restored.log_id_counter;
        self.delegated = restored.delegated;
        self.token_usage = restored.token_usage;
        info!(day = self.day(), "campaign restored from snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::float_cmp)]

    use super::*;
    use crate::provider::StubProvider;

    fn offline_session() -> Session<StubProvider> {
        Session::with_rng(
            StubProvider,
            SimConfig::default(),
            StdRng::seed_from_u64(42),
        )
    }

    #[tokio::test]
    async fn operations_before_creation_are_rejected() {
        let mut session = offline_session();
        assert!(matches!(session.player(), Err(EngineError::NoCharacter)));
        assert!(matches!(
            session.rest().await,
            Err(EngineError::NoCharacter)
        ));
        // The gate cleared on the error path.
        assert!(matches!(
            session.rest().await,
            Err(EngineError::NoCharacter)
        ));
    }

    #[tokio::test]
    async fn offline_creation_rolls_within_the_template_ranges() {
        let mut session = offline_session();
        session
            .create_character("Aeric", CharacterBackground::Merchant)
            .await
            .unwrap();
        let player = session.player().unwrap();
        assert_eq!(player.name, "Aeric");
        assert_eq!(player.level, 1);
        assert_eq!(player.skill_points, 1);
        assert_eq!(player.hp, 100);
        assert!((2000..=2500).contains(&player.gold));
        assert_eq!(
            player.equipment.get(&EquipmentSlot::Body),
            Some(&ItemId::TatteredRags)
        );
        assert_eq!(session.current_location().unwrap().as_str(), "westmere");
        assert_eq!(session.day(), 1);
    }

    #[tokio::test]
    async fn a_blacksmith_starts_armed() {
        let mut session = offline_session();
        session
            .create_character("Brant", CharacterBackground::Blacksmith)
            .await
            .unwrap();
        assert_eq!(
            session.player().unwrap().equipment.get(&EquipmentSlot::Weapon),
            Some(&ItemId::RustySword)
        );
    }

    #[tokio::test]
    async fn resting_advances_the_day() {
        let mut session = offline_session();
        session
            .create_character("Aeric", CharacterBackground::Nomad)
            .await
            .unwrap();
        session.rest().await.unwrap();
        session.rest().await.unwrap();
        assert_eq!(session.day(), 3);
    }

    #[tokio::test]
    async fn travel_requires_a_connected_road() {
        let mut session = offline_session();
        session
            .create_character("Aeric", CharacterBackground::Nomad)
            .await
            .unwrap();

        // Tulkan is across the map from Westmere.
        let err = session.travel(&LocationId::from("tulkan")).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Action(ActionError::NotConnected { .. })
        ));

        let outcome = session.travel(&LocationId::from("caldrith")).await.unwrap();
        assert!(matches!(outcome, TravelOutcome::Arrived(_)));
        assert_eq!(session.current_location().unwrap().as_str(), "caldrith");
        assert_eq!(session.day(), 2);
    }

    #[tokio::test]
    async fn the_log_carries_monotonic_ids() {
        let mut session = offline_session();
        session
            .create_character("Aeric", CharacterBackground::Poacher)
            .await
            .unwrap();
        session.rest().await.unwrap();
        session.rest().await.unwrap();
        let ids: Vec<u64> = session.log().iter().map(|e| e.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted);
    }

    #[tokio::test]
    async fn offline_quest_seeking_comes_back_empty_handed() {
        let mut session = offline_session();
        session
            .create_character("Aeric", CharacterBackground::Nomad)
            .await
            .unwrap();
        let err = session.seek_quest().await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Action(ActionError::NoQuestOffered)
        ));
        assert!(session.accept_quest().is_err());
    }

    #[tokio::test]
    async fn rumor_gold_is_refunded_when_the_taproom_is_silent() {
        let mut session = offline_session();
        session
            .create_character("Aeric", CharacterBackground::Merchant)
            .await
            .unwrap();
        let before = session.player().unwrap().gold;
        session.gather_rumor().await.unwrap();
        assert_eq!(session.player().unwrap().gold, before);
    }

    #[tokio::test]
    async fn snapshots_roundtrip_through_json() {
        let mut session = offline_session();
        session
            .create_character("Aeric", CharacterBackground::Noble)
            .await
            .unwrap();
        session.rest().await.unwrap();
        session.recruit_troops(3).unwrap();
        let document = session.export_snapshot().unwrap();
        let day = session.day();
        let gold = session.player().unwrap().gold;

        let mut restored = offline_session();
        restored.import_snapshot(&document).unwrap();
        assert_eq!(restored.day(), day);
        assert_eq!(restored.player().unwrap().gold, gold);
        assert_eq!(restored.log().len(), session.log().len());
    }

    #[tokio::test]
    async fn corrupt_snapshots_leave_the_session_untouched() {
        let mut session = offline_session();
        session
            .create_character("Aeric", CharacterBackground::Nomad)
            .await
            .unwrap();
        let day = session.day();
        let err = session.import_snapshot("{\"day\": 9}").unwrap_err();
        assert!(matches!(err, EngineError::Snapshot(_)));
        assert_eq!(session.day(), day);
    }

    #[tokio::test]
    async fn offline_battles_find_no_enemy() {
        let mut session = offline_session();
        session
            .create_character("Aeric", CharacterBackground::Poacher)
            .await
            .unwrap();
        let entries = session.seek_battle().await.unwrap();
        assert!(entries[0].message.contains("slip away"));
    }
}
