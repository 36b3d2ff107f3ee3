//! Prompt rendering via `minijinja`.
//!
//! Templates are compiled into the binary with `include_str!` so the
//! narrator has no runtime file dependencies; the shared system prompt
//! pins the register and the one-JSON-object output contract.

use minijinja::Environment;

use crate::error::NarratorError;

/// Every operation template compiled into the crate.
const TEMPLATES: [(&str, &str); 7] = [
    ("system", include_str!("../templates/system.j2")),
    ("character", include_str!("../templates/character.j2")),
    ("battle", include_str!("../templates/battle.j2")),
    ("quest", include_str!("../templates/quest.j2")),
    ("rumor", include_str!("../templates/rumor.j2")),
    ("travel_event", include_str!("../templates/travel_event.j2")),
    ("bounty_move", include_str!("../templates/bounty_move.j2")),
];

/// The complete rendered prompt ready to send to a backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message establishing the chronicler's voice and contract.
    pub system: String,
    /// User message with the operation's request.
    pub user: String,
}

/// Wraps a `minijinja` [`Environment`] with the narrator's templates
/// pre-loaded.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Compile every template.
    pub fn new() -> Result<Self, NarratorError> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)
                .map_err(|e| NarratorError::Template(format!("{name}: {e}")))?;
        }
        Ok(Self { env })
    }

    /// Render one operation's prompt with its request context.
    pub fn render(
        &self,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<RenderedPrompt, NarratorError> {
        let system = self
            .env
            .get_template("system")
            .map_err(|e| NarratorError::Template(format!("missing system template: {e}")))?
            .render(context)
            .map_err(|e| NarratorError::Template(format!("system render failed: {e}")))?;

        let user = self
            .env
            .get_template(template)
            .map_err(|e| NarratorError::Template(format!("missing {template} template: {e}")))?
            .render(context)
            .map_err(|e| NarratorError::Template(format!("{template} render failed: {e}")))?;

        Ok(RenderedPrompt { system, user })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn all_templates_compile() {
        assert!(PromptEngine::new().is_ok());
    }

    #[test]
    fn rumor_prompt_names_the_town() {
        let engine = PromptEngine::new().unwrap();
        let prompt = engine
            .render("rumor", &serde_json::json!({"location_name": "Westmere"}))
            .unwrap();
        assert!(prompt.user.contains("Westmere"));
        assert!(prompt.system.contains("one JSON object"));
    }

    #[test]
    fn battle_prompt_lists_the_army() {
        let engine = PromptEngine::new().unwrap();
        let context = serde_json::json!({
            "enemy_name": "the Marsh Brigands",
            "enemy_size": 18,
            "army": {"footman": 10, "recruit": 4},
            "companion_names": ["Elric"],
            "player_level": 3,
            "tactics": 2,
            "surgery": 1,
            "looting": 0,
            "quest_enemy_name": null
        });
        let prompt = engine.render("battle", &context).unwrap();
        assert!(prompt.user.contains("10 footman"));
        assert!(prompt.user.contains("Marsh Brigands"));
        assert!(prompt.user.contains("Elric"));
    }

    #[test]
    fn quest_prompt_lists_destinations() {
        let engine = PromptEngine::new().unwrap();
        let context = serde_json::json!({
            "location_name": "Westmere",
            "giver": "Lord Aldmar",
            "faction": "Velhart",
            "destinations": [
                {"id": "caldrith", "name": "Caldrith"},
                {"id": "skellborg", "name": "Skellborg"}
            ],
            "player_renown": 40
        });
        let prompt = engine.render("quest", &context).unwrap();
        assert!(prompt.user.contains("caldrith: Caldrith"));
        assert!(prompt.user.contains("40 renown"));
    }
}
