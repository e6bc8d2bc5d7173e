//! Telegram message payloads
//!
//! Telegram messages already carry a flat `text` field, so normalization is a
//! direct projection.

use super::{NormalizationError, SourceSystem};
use serde::Deserialize;

/// Telegram message body
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    #[serde(default)]
    pub message_id: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Extract the intent text from a Telegram body
pub fn extract_text(raw_body: &[u8]) -> Result<String, NormalizationError> {
    let message: TelegramMessage =
        serde_json::from_slice(raw_body).map_err(|e| NormalizationError::MalformedPayload {
            source_system: SourceSystem::Telegram,
            reason: e.to_string(),
        })?;

    message
        .text
        .ok_or(NormalizationError::NoRequiredElements {
            source_system: SourceSystem::Telegram,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projects_text_field() {
        let text = extract_text(br#"{"message_id": 12, "text": "shorten this link"}"#).unwrap();
        assert_eq!(text, "shorten this link");
    }

    #[test]
    fn test_missing_text_is_no_required_elements() {
        assert_eq!(
            extract_text(br#"{"message_id": 12}"#).unwrap_err(),
            NormalizationError::NoRequiredElements {
                source_system: SourceSystem::Telegram
            }
        );
    }

    #[test]
    fn test_non_string_text_is_malformed() {
        assert!(matches!(
            extract_text(br#"{"text": ["a"]}"#),
            Err(NormalizationError::MalformedPayload {
                source_system: SourceSystem::Telegram,
                ..
            })
        ));
    }

    #[test]
    fn test_array_body_is_malformed() {
        assert!(matches!(
            extract_text(b"[]"),
            Err(NormalizationError::MalformedPayload { .. })
        ));
    }
}
