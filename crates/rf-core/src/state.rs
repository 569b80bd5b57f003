//! # Content State
//!
//! Topics and Posts carry a moderation state drawn from a configured set of
//! choices. Exactly one choice means "published" and one is the default for
//! newly created content. The set is data, not code, so deployments can add
//! states (e.g. "hidden", "pending review") without touching the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, Result};

/// A state code as stored on a Topic or Post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentState(String);

impl ContentState {
    /// Rehydrates a state read back from storage. Input from users goes
    /// through [`StateConfig::resolve`] instead.
    pub fn from_stored(code: impl Into<String>) -> Self {
        ContentState(code.into())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One selectable state, e.g. `("1", "Published")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChoice {
    pub code: String,
    pub label: String,
}

impl StateChoice {
    pub fn new(code: &str, label: &str) -> Self {
        Self {
            code: code.to_string(),
            label: label.to_string(),
        }
    }
}

/// Unvalidated shape, as it appears in configuration files.
#[derive(Debug, Clone, Deserialize)]
struct RawStateConfig {
    choices: Vec<StateChoice>,
    published: String,
    default: String,
}

/// The validated set of states plus the published and default markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStateConfig")]
pub struct StateConfig {
    choices: Vec<StateChoice>,
    published: ContentState,
    default: ContentState,
}

impl StateConfig {
    pub fn new(choices: Vec<StateChoice>, published: &str, default: &str) -> Result<Self> {
        if choices.is_empty() {
            return Err(AppError::invalid("state choices must not be empty"));
        }
        for (i, choice) in choices.iter().enumerate() {
            if choice.code.trim().is_empty() {
                return Err(AppError::invalid("state codes must not be blank"));
            }
            if choices[..i].iter().any(|c| c.code == choice.code) {
                return Err(AppError::invalid(format!(
                    "duplicate state code '{}'",
                    choice.code
                )));
            }
        }

        let config = Self {
            published: ContentState(published.to_string()),
            default: ContentState(default.to_string()),
            choices,
        };
        if config.label(&config.published).is_none() {
            return Err(AppError::invalid(format!(
                "published state '{}' is not one of the choices",
                published
            )));
        }
        if config.label(&config.default).is_none() {
            return Err(AppError::invalid(format!(
                "default state '{}' is not one of the choices",
                default
            )));
        }
        Ok(config)
    }

    pub fn choices(&self) -> &[StateChoice] {
        &self.choices
    }

    pub fn published(&self) -> &ContentState {
        &self.published
    }

    pub fn default_state(&self) -> &ContentState {
        &self.default
    }

    /// Turns a user-supplied code into a state, rejecting unknown codes.
    pub fn resolve(&self, code: &str) -> Result<ContentState> {
        self.choices
            .iter()
            .find(|c| c.code == code)
            .map(|c| ContentState(c.code.clone()))
            .ok_or_else(|| AppError::invalid(format!("unknown state code '{}'", code)))
    }

    pub fn label(&self, state: &ContentState) -> Option<&str> {
        self.choices
            .iter()
            .find(|c| c.code == state.0)
            .map(|c| c.label.as_str())
    }
}

impl Default for StateConfig {
    /// `0 = Draft` (default), `1 = Published`.
    fn default() -> Self {
        Self {
            choices: vec![
                StateChoice::new("0", "Draft"),
                StateChoice::new("1", "Published"),
            ],
            published: ContentState("1".into()),
            default: ContentState("0".into()),
        }
    }
}

impl TryFrom<RawStateConfig> for StateConfig {
    type Error = AppError;

    fn try_from(raw: RawStateConfig) -> Result<Self> {
        StateConfig::new(raw.choices, &raw.published, &raw.default)
    }
}
