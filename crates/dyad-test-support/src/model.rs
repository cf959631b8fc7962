//! Test models — deterministic `LanguageModel` implementations.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dyad_core::model::{LanguageModel, ModelError};

/// Role label recorded for a completed validator call.
pub const VALIDATOR_ROLE: &str = "validator";
/// Role label recorded for a completed responder call.
pub const RESPONDER_ROLE: &str = "responder";

/// A model that answers validator and responder prompts with scripted
/// text, optionally after a per-role delay.
///
/// Prompts are routed on their first line: the validator instructions
/// begin with "You are a validator", everything else is treated as a
/// responder prompt. A call is recorded in [`completed_calls`] only
/// after its delay has elapsed and the response is about to be
/// returned, so an aborted in-flight call leaves no record — which is
/// exactly what late-arrival-discard tests need to observe.
///
/// [`completed_calls`]: ScriptedModel::completed_calls
#[derive(Debug)]
pub struct ScriptedModel {
    validator_response: String,
    responder_response: String,
    validator_delay: Option<Duration>,
    responder_delay: Option<Duration>,
    completed: Mutex<Vec<&'static str>>,
}

impl ScriptedModel {
    /// Creates a model returning the given validator and responder text.
    #[must_use]
    pub fn new(validator_response: impl Into<String>, responder_response: impl Into<String>) -> Self {
        Self {
            validator_response: validator_response.into(),
            responder_response: responder_response.into(),
            validator_delay: None,
            responder_delay: None,
            completed: Mutex::new(Vec::new()),
        }
    }

    /// Delays validator completions by `delay`.
    #[must_use]
    pub fn with_validator_delay(mut self, delay: Duration) -> Self {
        self.validator_delay = Some(delay);
        self
    }

    /// Delays responder completions by `delay`.
    #[must_use]
    pub fn with_responder_delay(mut self, delay: Duration) -> Self {
        self.responder_delay = Some(delay);
        self
    }

    /// Returns the roles of all calls that ran to completion, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn completed_calls(&self) -> Vec<&'static str> {
        self.completed.lock().unwrap().clone()
    }

    fn is_validator_prompt(prompt: &str) -> bool {
        prompt.starts_with("You are a validator")
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let (role, delay, response) = if Self::is_validator_prompt(prompt) {
            (VALIDATOR_ROLE, self.validator_delay, &self.validator_response)
        } else {
            (RESPONDER_ROLE, self.responder_delay, &self.responder_response)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.completed.lock().unwrap().push(role);
        Ok(response.clone())
    }
}

/// A model whose every call fails with a transport error.
#[derive(Debug)]
pub struct FailingModel;

#[async_trait]
impl LanguageModel for FailingModel {
    async fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
        Err(ModelError::Transport("connection refused".to_owned()))
    }
}
