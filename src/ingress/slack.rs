//! Slack block-kit payloads
//!
//! The body is a sequence of message blocks. Each block holds rich-text
//! sections whose inline elements are discriminated by `type`. Only `text`
//! and `link` elements matter for intent extraction; every other element type
//! deserializes to [`InlineElement::Other`] and is skipped.

use super::{NormalizationError, SourceSystem};
use serde::Deserialize;

/// One top-level message block
#[derive(Debug, Clone, Deserialize)]
pub struct MessageBlock {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub block_id: Option<String>,
    #[serde(default)]
    pub elements: Vec<RichTextSection>,
}

/// Rich-text section nested inside a block
#[derive(Debug, Clone, Deserialize)]
pub struct RichTextSection {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub elements: Vec<InlineElement>,
}

/// Inline element of a rich-text section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InlineElement {
    Text {
        text: String,
    },
    Link {
        url: String,
        #[serde(default)]
        text: Option<String>,
    },
    #[serde(other)]
    Other,
}

/// Parse the block sequence
///
/// Any mismatch with the schema (non-array body, non-object element, element
/// without a `type`, a `text` that is not a string) is a `MalformedPayload`.
pub fn parse_blocks(raw_body: &[u8]) -> Result<Vec<MessageBlock>, NormalizationError> {
    serde_json::from_slice(raw_body).map_err(|e| NormalizationError::MalformedPayload {
        source_system: SourceSystem::Slack,
        reason: e.to_string(),
    })
}

/// Extract the intent text from a Slack body
pub fn extract_text(raw_body: &[u8]) -> Result<String, NormalizationError> {
    let blocks = parse_blocks(raw_body)?;
    let text = first_intent_element(&blocks)?;
    tracing::debug!(
        blocks = blocks.len(),
        text_length = text.len(),
        "Extracted intent text from Slack payload"
    );
    Ok(text)
}

/// Scan the first section of the first block for the first `text` or `link`
///
/// A `text` element yields its text, a `link` element its URL. Scanning stops
/// at the first match.
pub fn first_intent_element(blocks: &[MessageBlock]) -> Result<String, NormalizationError> {
    let elements = blocks
        .first()
        .and_then(|block| block.elements.first())
        .map(|section| section.elements.as_slice())
        .unwrap_or_default();

    elements
        .iter()
        .find_map(|element| match element {
            InlineElement::Text { text } => Some(text.clone()),
            InlineElement::Link { url, .. } => Some(url.clone()),
            InlineElement::Other => None,
        })
        .ok_or(NormalizationError::NoRequiredElements {
            source_system: SourceSystem::Slack,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_required_elements() -> NormalizationError {
        NormalizationError::NoRequiredElements {
            source_system: SourceSystem::Slack,
        }
    }

    #[test]
    fn test_extracts_text_element() {
        let body = br#"[{"type":"rich_text","block_id":"b1","elements":[
            {"type":"rich_text_section","elements":[{"type":"text","text":"shorten "}]}
        ]}]"#;
        assert_eq!(extract_text(body).unwrap(), "shorten ");
    }

    #[test]
    fn test_extracts_link_url() {
        let body = br#"[{"type":"rich_text","elements":[
            {"type":"rich_text_section","elements":[{"type":"link","url":"https://example.com/a"}]}
        ]}]"#;
        assert_eq!(extract_text(body).unwrap(), "https://example.com/a");
    }

    #[test]
    fn test_stops_at_first_match() {
        let body = br#"[{"type":"rich_text","elements":[
            {"type":"rich_text_section","elements":[
                {"type":"emoji","name":"wave"},
                {"type":"link","url":"https://example.com/first"},
                {"type":"text","text":"second"}
            ]}
        ]}]"#;
        assert_eq!(extract_text(body).unwrap(), "https://example.com/first");
    }

    #[test]
    fn test_only_first_block_and_section_are_scanned() {
        let body = br#"[
            {"type":"rich_text","elements":[
                {"type":"rich_text_section","elements":[{"type":"emoji","name":"x"}]},
                {"type":"rich_text_section","elements":[{"type":"text","text":"later section"}]}
            ]},
            {"type":"rich_text","elements":[
                {"type":"rich_text_section","elements":[{"type":"text","text":"later block"}]}
            ]}
        ]"#;
        assert_eq!(extract_text(body).unwrap_err(), no_required_elements());
    }

    #[test]
    fn test_empty_outer_sequence() {
        assert_eq!(extract_text(b"[]").unwrap_err(), no_required_elements());
    }

    #[test]
    fn test_block_without_sections() {
        let body = br#"[{"type":"rich_text","elements":[]}]"#;
        assert_eq!(extract_text(body).unwrap_err(), no_required_elements());
    }

    #[test]
    fn test_empty_inner_sequence() {
        let body = br#"[{"type":"rich_text","elements":[{"type":"rich_text_section","elements":[]}]}]"#;
        assert_eq!(extract_text(body).unwrap_err(), no_required_elements());
    }

    #[test]
    fn test_non_object_element_is_malformed() {
        let body = br#"[{"type":"rich_text","elements":[{"type":"rich_text_section","elements":[42]}]}]"#;
        assert!(matches!(
            extract_text(body),
            Err(NormalizationError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_wrong_text_type_is_malformed() {
        let body = br#"[{"type":"rich_text","elements":[{"type":"rich_text_section","elements":[{"type":"text","text":7}]}]}]"#;
        assert!(matches!(
            extract_text(body),
            Err(NormalizationError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_element_without_type_is_malformed() {
        let body = br#"[{"type":"rich_text","elements":[{"type":"rich_text_section","elements":[{"text":"hi"}]}]}]"#;
        assert!(matches!(
            extract_text(body),
            Err(NormalizationError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_object_body_is_malformed() {
        assert!(matches!(
            extract_text(br#"{"text":"hi"}"#),
            Err(NormalizationError::MalformedPayload {
                source_system: SourceSystem::Slack,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_element_fields_are_ignored() {
        let body = br#"[{"type":"rich_text","elements":[{"type":"rich_text_section","elements":[
            {"type":"text","text":"bold words","style":{"bold":true}}
        ]}]}]"#;
        assert_eq!(extract_text(body).unwrap(), "bold words");
    }
}
