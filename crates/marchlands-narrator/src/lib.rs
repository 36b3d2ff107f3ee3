//! The live generative-content provider.
//!
//! [`Narrator`] implements the engine's `GenerativeProvider` trait over an
//! HTTP model backend: requests are rendered into prompts with `minijinja`,
//! sent to a Gemini or OpenAI-compatible API, and the untrusted replies are
//! recovered and validated before anything reaches the simulation.

pub mod client;
pub mod config;
pub mod error;
pub mod parse;
pub mod prompt;

use tracing::{debug, info};

use marchlands_engine::provider::{
    BattleRequest, GenerativeProvider, ProviderError, ProviderReply, QuestRequest,
    TravelEventRequest,
};
use marchlands_types::{
    BattleResult, CharacterBackground, GeneratedCharacter, LocationId, Quest, TravelEvent,
};
use marchlands_world::templates;

use crate::client::{Completion, LlmBackend};
use crate::config::NarratorConfig;
use crate::error::NarratorError;
use crate::prompt::{PromptEngine, RenderedPrompt};

/// The live narrator: prompts, backend, and validation glued together.
pub struct Narrator {
    backend: LlmBackend,
    prompts: PromptEngine,
}

impl Narrator {
    /// Build a narrator from explicit configuration.
    pub fn new(config: &NarratorConfig) -> Result<Self, NarratorError> {
        let backend = LlmBackend::from_config(config);
        info!(backend = backend.name(), model = config.model, "narrator ready");
        Ok(Self {
            backend,
            prompts: PromptEngine::new()?,
        })
    }

    /// Build a narrator from `MARCHLANDS_LLM_*` environment variables.
    pub fn from_env() -> Result<Self, NarratorError> {
        Self::new(&NarratorConfig::from_env()?)
    }

    /// Render one operation's prompt and complete it.
    async fn ask(
        &self,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<Completion, ProviderError> {
        let prompt = self
            .prompts
            .render(template, context)
            .map_err(|e| ProviderError::Unavailable(format!("prompt render failed: {e}")))?;
        let completion = self.backend.complete(&prompt).await?;
        debug!(template, tokens = completion.tokens, "narrator call complete");
        Ok(completion)
    }
}

impl GenerativeProvider for Narrator {
    fn is_live(&self) -> bool {
        true
    }

    async fn verify(&self) -> Result<bool, ProviderError> {
        let prompt = RenderedPrompt {
            system: "You answer with exactly one JSON object and nothing else.".to_owned(),
            user: "Answer with {\"ok\": true}".to_owned(),
        };
        let completion = self.backend.complete(&prompt).await?;
        Ok(!completion.text.trim().is_empty())
    }

    async fn generate_character(
        &self,
        background: CharacterBackground,
    ) -> Result<ProviderReply<GeneratedCharacter>, ProviderError> {
        let def = templates::background_def(background);
        let context = serde_json::json!({
            "background": background.display_name(),
            "gold_min": def.gold_min,
            "gold_max": def.gold_max,
            "renown_min": def.renown_min,
            "renown_max": def.renown_max,
            "troops_min": def.troops_min,
            "troops_max": def.troops_max,
        });
        let completion = self.ask("character", &context).await?;
        let character = parse::parse_character(&completion.text, &def)?;
        Ok(ProviderReply {
            data: Some(character),
            tokens: completion.tokens,
        })
    }

    async fn simulate_battle(
        &self,
        request: &BattleRequest,
    ) -> Result<ProviderReply<BattleResult>, ProviderError> {
        let context = encode_context(request)?;
        let completion = self.ask("battle", &context).await?;
        let result = parse::parse_battle(&completion.text)?;
        Ok(ProviderReply {
            data: Some(result),
            tokens: completion.tokens,
        })
    }

    async fn generate_quest(
        &self,
        request: &QuestRequest,
    ) -> Result<ProviderReply<Quest>, ProviderError> {
        let destinations: Vec<serde_json::Value> = request
            .destinations
            .iter()
            .map(|(id, name)| serde_json::json!({"id": id, "name": name}))
            .collect();
        let context = serde_json::json!({
            "location_name": request.location_name,
            "giver": request.giver,
            "faction": request.faction_id.display_name(),
            "destinations": destinations,
            "player_renown": request.player_renown,
        });
        let completion = self.ask("quest", &context).await?;
        let quest = parse::parse_quest(&completion.text, request)?;
        Ok(ProviderReply {
            data: Some(quest),
            tokens: completion.tokens,
        })
    }

    async fn bounty_destination(
        &self,
        quest: &Quest,
        candidates: &[LocationId],
    ) -> Result<ProviderReply<Option<LocationId>>, ProviderError> {
        let context = serde_json::json!({
            "enemy_name": quest.target_enemy_name,
            "hint": quest.target_enemy_hint,
            "candidates": candidates,
        });
        let completion = self.ask("bounty_move", &context).await?;
        let destination = parse::parse_bounty_destination(&completion.text, candidates)?;
        Ok(ProviderReply {
            data: Some(destination),
            tokens: completion.tokens,
        })
    }

    async fn tavern_rumor(
        &self,
        location_name: &str,
    ) -> Result<ProviderReply<String>, ProviderError> {
        let context = serde_json::json!({"location_name": location_name});
        let completion = self.ask("rumor", &context).await?;
        let rumor = parse::parse_rumor(&completion.text)?;
        Ok(ProviderReply {
            data: Some(rumor),
            tokens: completion.tokens,
        })
    }

    async fn travel_event(
        &self,
        request: &TravelEventRequest,
    ) -> Result<ProviderReply<TravelEvent>, ProviderError> {
        let context = encode_context(request)?;
        let completion = self.ask("travel_event", &context).await?;
        let event = parse::parse_travel_event(&completion.text)?;
        Ok(ProviderReply {
            data: Some(event),
            tokens: completion.tokens,
        })
    }
}

/// Serialize a request struct into a template context.
fn encode_context<T: serde::Serialize>(request: &T) -> Result<serde_json::Value, ProviderError> {
    serde_json::to_value(request)
        .map_err(|e| ProviderError::Unavailable(format!("context encoding failed: {e}")))
}
