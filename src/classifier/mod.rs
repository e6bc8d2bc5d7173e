//! LLM-based intent classification
//!
//! Sends the canonical text to an OpenAI-compatible chat completion endpoint
//! together with a fixed system instruction, then parses the strict
//! `{"skill": "<name>"}` reply. One attempt per request: a failed call or an
//! unparseable reply is surfaced as a [`ClassificationError`], never replaced
//! by the catch-all skill.

use crate::config::{CATCH_ALL_SKILL, ClassifierConfig};
use crate::dispatch::SkillTable;
use crate::error::{AppError, AppResult};
use crate::ingress::CanonicalIntentInput;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trait for intent classification
///
/// Allows dependency injection of classifiers that don't make network calls.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classify the canonical text into a skill name
    async fn classify(&self, input: &CanonicalIntentInput) -> Result<String, ClassificationError>;
}

/// Errors from the completion call or from parsing its reply
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("completion request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("completion endpoint {endpoint} returned HTTP {status}: {body_preview}")]
    Status {
        endpoint: String,
        status: u16,
        body_preview: String,
    },

    #[error("completion envelope from {endpoint} could not be decoded: {reason}")]
    MalformedCompletion { endpoint: String, reason: String },

    #[error("completion from {endpoint} carried no content")]
    EmptyCompletion { endpoint: String },

    #[error("completion exceeded {max_size} bytes (got {size} bytes)")]
    SizeExceeded { size: usize, max_size: usize },

    #[error("completion is not a skill object ({reason}): {response}")]
    UnparseableSkill { response: String, reason: String },
}

/// Maximum size of the completion content (bytes)
///
/// A valid reply is a one-key object, well under 100 bytes. Anything past this
/// means the model ignored the instruction.
const MAX_COMPLETION_BYTES: usize = 1024;

/// Maximum characters of user text forwarded to the model
const MAX_INTENT_CHARS: usize = 2000;

/// Characters of upstream bodies kept in error messages
const PREVIEW_CHARS: usize = 200;

/// User message used in the worked example when no skill defines one
const CATCH_ALL_EXAMPLE: &str = "tell me a joke";

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One message of the completion exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Completion request body
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// The only reply shape the classifier accepts
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SkillReply {
    skill: String,
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Classifier backed by an OpenAI-compatible chat completion endpoint
pub struct OpenAiClassifier {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: SecretString,
    system_instruction: String,
}

impl std::fmt::Debug for OpenAiClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClassifier")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl OpenAiClassifier {
    /// Create a classifier for the given endpoint and recognised skills
    ///
    /// The system instruction is rendered once here from the skill table.
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: SecretString,
        skills: &SkillTable,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build completion client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
            system_instruction: Self::build_system_instruction(skills),
        })
    }

    /// Create a classifier from the `[classifier]` section
    pub fn from_config(
        config: &ClassifierConfig,
        api_key: SecretString,
        skills: &SkillTable,
        timeout: Duration,
    ) -> AppResult<Self> {
        Self::new(&config.endpoint, &config.model, api_key, skills, timeout)
    }

    /// The rendered system instruction
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Render the fixed system instruction
    ///
    /// Enumerates the closed skill set (configured skills plus the catch-all)
    /// and gives one worked example: the first skill that defines one, or the
    /// catch-all otherwise.
    fn build_system_instruction(skills: &SkillTable) -> String {
        let mut names: Vec<&str> = skills.skill_names().collect();
        names.push(CATCH_ALL_SKILL);

        let (example_user, example_skill) = skills
            .targets()
            .find_map(|target| target.example().map(|ex| (ex, target.skill())))
            .unwrap_or((CATCH_ALL_EXAMPLE, CATCH_ALL_SKILL));

        format!(
            "Recognise a skill based on the intention provided by the user.\n\
             Respond with a JSON object with exactly one key, \"skill\". skill ({}).\n\
             If no skill fits, use \"{}\".\n\
             Do not add any wrappers like quotes or backticks apart from the pure JSON object.\n\
             Example:\n\
             user: {}\n\
             ai: {{\"skill\":\"{}\"}}",
            names.join("|"),
            CATCH_ALL_SKILL,
            example_user,
            example_skill
        )
    }

    /// Cap the user text, counting characters so UTF-8 boundaries are respected
    fn truncate_intent(text: &str) -> String {
        if text.chars().count() > MAX_INTENT_CHARS {
            let truncated: String = text.chars().take(MAX_INTENT_CHARS).collect();
            format!("{}... [truncated]", truncated)
        } else {
            text.to_string()
        }
    }

    /// System instruction followed by the user's text
    fn build_messages(&self, text: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: Role::System,
                content: self.system_instruction.clone(),
            },
            ChatMessage {
                role: Role::User,
                content: Self::truncate_intent(text),
            },
        ]
    }

    /// Parse completion content into a skill name
    ///
    /// Accepts only a JSON object whose single key is a non-blank string
    /// `skill`. Surrounding whitespace is tolerated, nothing else.
    fn parse_skill(content: &str) -> Result<String, ClassificationError> {
        if content.len() > MAX_COMPLETION_BYTES {
            return Err(ClassificationError::SizeExceeded {
                size: content.len(),
                max_size: MAX_COMPLETION_BYTES,
            });
        }

        let reply: SkillReply = serde_json::from_str(content.trim()).map_err(|e| {
            ClassificationError::UnparseableSkill {
                response: preview(content),
                reason: e.to_string(),
            }
        })?;

        let skill = reply.skill.trim();
        if skill.is_empty() {
            return Err(ClassificationError::UnparseableSkill {
                response: preview(content),
                reason: "skill is blank".to_string(),
            });
        }
        Ok(skill.to_string())
    }
}

#[async_trait]
impl IntentClassifier for OpenAiClassifier {
    async fn classify(&self, input: &CanonicalIntentInput) -> Result<String, ClassificationError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: self.build_messages(input.text()),
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            source_system = %input.source_system(),
            intent_length = input.text().len(),
            "Sending intent classification request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|source| {
                tracing::error!(
                    endpoint = %self.endpoint,
                    error = %source,
                    "Completion request failed"
                );
                ClassificationError::Transport {
                    endpoint: self.endpoint.clone(),
                    source,
                }
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                endpoint = %self.endpoint,
                status = status.as_u16(),
                "Completion endpoint returned non-OK status"
            );
            return Err(ClassificationError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body_preview: preview(&body),
            });
        }

        let envelope: CompletionResponse =
            response
                .json()
                .await
                .map_err(|e| ClassificationError::MalformedCompletion {
                    endpoint: self.endpoint.clone(),
                    reason: e.to_string(),
                })?;

        let content = envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ClassificationError::EmptyCompletion {
                endpoint: self.endpoint.clone(),
            })?;

        let skill = Self::parse_skill(&content)?;
        tracing::debug!(
            endpoint = %self.endpoint,
            skill = %skill,
            "Received skill classification"
        );
        Ok(skill)
    }
}
