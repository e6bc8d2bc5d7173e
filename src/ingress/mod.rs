//! Payload normalization for inbound chat events
//!
//! Converts a source-specific chat payload into a [`CanonicalIntentInput`]:
//! the platform-agnostic text handed to the classifier. Each source system has
//! its own strict serde schema in a submodule; [`ChatEvent`] is the tagged
//! variant that makes normalization exhaustive over source systems.

pub mod gateway;
pub mod slack;
pub mod telegram;

pub use gateway::GatewayRequest;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Header carrying the source system discriminator (matched case-insensitively)
pub const SOURCE_SYSTEM_HEADER: &str = "Source-System";

/// Chat platform an event originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSystem {
    Slack,
    Telegram,
}

impl SourceSystem {
    /// Convert to string representation for logging and serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slack => "slack",
            Self::Telegram => "telegram",
        }
    }
}

impl fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceSystem {
    type Err = NormalizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slack" => Ok(Self::Slack),
            "telegram" => Ok(Self::Telegram),
            _ => Err(NormalizationError::UnknownSourceSystem(s.to_string())),
        }
    }
}

/// Reasons a chat payload could not be normalized
///
/// All variants are bad requests. `MalformedPayload` (the JSON does not match
/// the source schema) and `NoRequiredElements` (well-formed, but nothing to
/// classify) are kept apart so they can be logged differently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizationError {
    #[error("request body is empty")]
    EmptyBody,

    #[error("unknown source system '{0}'")]
    UnknownSourceSystem(String),

    #[error("source system could not be determined from headers or payload shape")]
    UndeterminedSourceSystem,

    #[error("{source_system} payload has unexpected shape: {reason}")]
    MalformedPayload {
        source_system: SourceSystem,
        reason: String,
    },

    #[error("{source_system} payload does not have required elements")]
    NoRequiredElements { source_system: SourceSystem },

    #[error("{source_system} payload carried blank text")]
    EmptyText { source_system: SourceSystem },

    #[error("gateway event could not be decoded: {reason}")]
    MalformedEvent { reason: String },
}

impl NormalizationError {
    /// Stable label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyBody => "empty_body",
            Self::UnknownSourceSystem(_) => "unknown_source_system",
            Self::UndeterminedSourceSystem => "undetermined_source_system",
            Self::MalformedPayload { .. } => "malformed_payload",
            Self::NoRequiredElements { .. } => "no_required_elements",
            Self::EmptyText { .. } => "empty_text",
            Self::MalformedEvent { .. } => "malformed_event",
        }
    }
}

/// An inbound chat payload tagged with its source system
///
/// Borrows the request body; it lives only until normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatEvent<'a> {
    Slack { raw_body: &'a [u8] },
    Telegram { raw_body: &'a [u8] },
}

impl<'a> ChatEvent<'a> {
    /// Tag a body with a known source system
    pub fn new(source_system: SourceSystem, raw_body: &'a [u8]) -> Self {
        match source_system {
            SourceSystem::Slack => Self::Slack { raw_body },
            SourceSystem::Telegram => Self::Telegram { raw_body },
        }
    }

    /// Build an event from the `Source-System` header, or infer it from the body
    ///
    /// An explicit header always wins. Without one, a JSON array is treated as
    /// Slack blocks and a JSON object with a `text` key as a Telegram message.
    pub fn detect(
        source_header: Option<&str>,
        raw_body: &'a [u8],
    ) -> Result<Self, NormalizationError> {
        if raw_body.trim_ascii().is_empty() {
            return Err(NormalizationError::EmptyBody);
        }

        let source_system = match source_header {
            Some(value) => value.parse()?,
            None => infer_source_system(raw_body)?,
        };
        Ok(Self::new(source_system, raw_body))
    }

    /// Source system this event came from
    pub fn source_system(&self) -> SourceSystem {
        match self {
            Self::Slack { .. } => SourceSystem::Slack,
            Self::Telegram { .. } => SourceSystem::Telegram,
        }
    }

    /// Extract the canonical intent text
    pub fn normalize(self) -> Result<CanonicalIntentInput, NormalizationError> {
        let text = match self {
            Self::Slack { raw_body } => slack::extract_text(raw_body)?,
            Self::Telegram { raw_body } => telegram::extract_text(raw_body)?,
        };
        CanonicalIntentInput::new(self.source_system(), text)
    }
}

/// Normalize a body from a known source system
pub fn normalize(
    source_system: SourceSystem,
    raw_body: &[u8],
) -> Result<CanonicalIntentInput, NormalizationError> {
    if raw_body.trim_ascii().is_empty() {
        return Err(NormalizationError::EmptyBody);
    }
    ChatEvent::new(source_system, raw_body).normalize()
}

fn infer_source_system(raw_body: &[u8]) -> Result<SourceSystem, NormalizationError> {
    let value: serde_json::Value = serde_json::from_slice(raw_body)
        .map_err(|_| NormalizationError::UndeterminedSourceSystem)?;

    match value {
        serde_json::Value::Array(_) => Ok(SourceSystem::Slack),
        serde_json::Value::Object(map) if map.contains_key("text") => Ok(SourceSystem::Telegram),
        _ => Err(NormalizationError::UndeterminedSourceSystem),
    }
}

/// Platform-agnostic text extracted from a chat payload
///
/// Invariant: `text` is never blank. The text itself is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalIntentInput {
    source_system: SourceSystem,
    text: String,
}

impl CanonicalIntentInput {
    /// Create a canonical input, rejecting blank text
    pub fn new(source_system: SourceSystem, text: String) -> Result<Self, NormalizationError> {
        if text.trim().is_empty() {
            return Err(NormalizationError::EmptyText { source_system });
        }
        Ok(Self {
            source_system,
            text,
        })
    }

    /// The text to classify
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Where the text came from
    pub fn source_system(&self) -> SourceSystem {
        self.source_system
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_system_from_header_is_case_insensitive() {
        assert_eq!("Slack".parse::<SourceSystem>().unwrap(), SourceSystem::Slack);
        assert_eq!(
            " TELEGRAM ".parse::<SourceSystem>().unwrap(),
            SourceSystem::Telegram
        );
    }

    #[test]
    fn test_unknown_source_system_rejected() {
        let err = "discord".parse::<SourceSystem>().unwrap_err();
        assert_eq!(err, NormalizationError::UnknownSourceSystem("discord".into()));
        assert_eq!(err.kind(), "unknown_source_system");
    }

    #[test]
    fn test_detect_empty_body() {
        assert_eq!(
            ChatEvent::detect(Some("slack"), b"").unwrap_err(),
            NormalizationError::EmptyBody
        );
        assert_eq!(
            ChatEvent::detect(None, b"  \n ").unwrap_err(),
            NormalizationError::EmptyBody
        );
    }

    #[test]
    fn test_detect_infers_slack_from_array() {
        let event = ChatEvent::detect(None, b"[]").unwrap();
        assert_eq!(event.source_system(), SourceSystem::Slack);
    }

    #[test]
    fn test_detect_infers_telegram_from_text_object() {
        let event = ChatEvent::detect(None, br#"{"text": "hi"}"#).unwrap();
        assert_eq!(event.source_system(), SourceSystem::Telegram);
    }

    #[test]
    fn test_detect_header_wins_over_shape() {
        let event = ChatEvent::detect(Some("slack"), br#"{"text": "hi"}"#).unwrap();
        assert_eq!(event.source_system(), SourceSystem::Slack);
        // The body is not Slack-shaped, so normalization reports a shape mismatch
        assert!(matches!(
            event.normalize(),
            Err(NormalizationError::MalformedPayload {
                source_system: SourceSystem::Slack,
                ..
            })
        ));
    }

    #[test]
    fn test_detect_undetermined_shape() {
        assert_eq!(
            ChatEvent::detect(None, br#"{"message": "hi"}"#).unwrap_err(),
            NormalizationError::UndeterminedSourceSystem
        );
        assert_eq!(
            ChatEvent::detect(None, b"not json").unwrap_err(),
            NormalizationError::UndeterminedSourceSystem
        );
    }

    #[test]
    fn test_normalize_telegram() {
        let input = normalize(SourceSystem::Telegram, br#"{"text": "shorten this link"}"#)
            .expect("should normalize");
        assert_eq!(input.text(), "shorten this link");
        assert_eq!(input.source_system(), SourceSystem::Telegram);
    }

    #[test]
    fn test_normalize_rejects_empty_body() {
        assert_eq!(
            normalize(SourceSystem::Telegram, b"").unwrap_err(),
            NormalizationError::EmptyBody
        );
    }

    #[test]
    fn test_canonical_input_rejects_blank_text() {
        let err = CanonicalIntentInput::new(SourceSystem::Slack, "   ".into()).unwrap_err();
        assert_eq!(
            err,
            NormalizationError::EmptyText {
                source_system: SourceSystem::Slack
            }
        );
    }

    #[test]
    fn test_canonical_input_keeps_text_verbatim() {
        let input = CanonicalIntentInput::new(SourceSystem::Slack, "  padded ".into()).unwrap();
        assert_eq!(input.text(), "  padded ");
    }
}
