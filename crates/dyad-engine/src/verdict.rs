//! Parsing of model output into well-formed events.
//!
//! The model is asked for JSON but owes us nothing; everything here is
//! coercion, never failure. A malformed validator verdict passes the
//! input through (the draft still carries the content), and a malformed
//! draft falls back to the raw model text as a best-effort reply.

use dyad_core::event::Event;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ValidatorVerdict {
    #[serde(default)]
    invalid_reason: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    events: Option<Vec<Event>>,
}

#[derive(Debug, Deserialize)]
struct DraftEnvelope {
    event_draft: Event,
}

/// Strips a Markdown code fence if the model wrapped its JSON in one.
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Interprets raw validator output as a validation outcome event.
pub(crate) fn validation_event_from(raw: &str) -> Event {
    match serde_json::from_str::<ValidatorVerdict>(strip_fence(raw)) {
        Ok(verdict) => match verdict.invalid_reason {
            Some(reason) if !reason.trim().is_empty() => {
                Event::error(format!("Validation failed: {}", reason.trim()))
            }
            _ => Event::info("Validation passed."),
        },
        Err(parse_err) => {
            tracing::warn!(error = %parse_err, "malformed validator verdict; passing input through");
            Event::info("Validation passed.")
        }
    }
}

/// Interprets raw responder output as an assistant event.
pub(crate) fn response_event_from(raw: &str) -> Event {
    let cleaned = strip_fence(raw);
    match serde_json::from_str::<DraftEnvelope>(cleaned) {
        Ok(envelope) => Event::assistant(envelope.event_draft.content),
        Err(parse_err) => {
            tracing::warn!(error = %parse_err, "malformed draft envelope; using raw text");
            Event::assistant(cleaned)
        }
    }
}
