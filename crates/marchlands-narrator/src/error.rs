//! Construction-time errors for the narrator.
//!
//! Once built, every narrator operation reports failures through
//! [`marchlands_engine::ProviderError`]; this enum only covers the ways
//! building the narrator itself can fail.

/// Errors raised while assembling a [`crate::Narrator`].
#[derive(Debug, thiserror::Error)]
pub enum NarratorError {
    /// Configuration was missing or unparseable.
    #[error("narrator config error: {0}")]
    Config(String),

    /// A prompt template failed to compile.
    #[error("prompt template error: {0}")]
    Template(String),
}
