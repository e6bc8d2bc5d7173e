//! Skill payload contracts
//!
//! Each skill target names the request field that carries the canonical text
//! and, optionally, the reply field projected back to the caller.

use super::{InvocationError, InvocationResult};
use crate::dispatch::SkillTarget;
use serde_json::{Map, Value};

/// Encode the request payload: `{ <request_field>: <text> }`
pub fn encode_request(target: &SkillTarget, text: &str) -> Vec<u8> {
    let mut body = Map::new();
    body.insert(
        target.request_field().to_string(),
        Value::String(text.to_string()),
    );
    Value::Object(body).to_string().into_bytes()
}

/// Project a function reply into the response string
///
/// With a reply field the payload must be a JSON object carrying that field as
/// a string. Without one a JSON string payload yields its value and anything
/// else is passed through as UTF-8 text.
pub fn decode_reply(
    target: &SkillTarget,
    result: &InvocationResult,
) -> Result<String, InvocationError> {
    let malformed = |reason: String| InvocationError::MalformedReply {
        function: target.function().clone(),
        reason,
    };

    match target.reply_field() {
        Some(field) => {
            let value: Value = serde_json::from_slice(&result.payload)
                .map_err(|e| malformed(format!("reply is not JSON: {}", e)))?;
            match value.get(field) {
                Some(Value::String(s)) => Ok(s.clone()),
                Some(_) => Err(malformed(format!("field '{}' is not a string", field))),
                None => Err(malformed(format!("field '{}' is missing", field))),
            }
        }
        None => {
            if let Ok(Value::String(s)) = serde_json::from_slice::<Value>(&result.payload) {
                return Ok(s);
            }
            String::from_utf8(result.payload.clone())
                .map_err(|e| malformed(format!("reply is not UTF-8: {}", e)))
        }
    }
}
