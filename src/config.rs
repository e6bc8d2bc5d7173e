//! Configuration management for skillroute
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Credentials never live in the file: it names the environment variables
//! that hold them, and they are resolved once at start-up.

use crate::error::{AppError, AppResult};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Skill name the classifier uses when no configured skill fits
pub const CATCH_ALL_SKILL: &str = "other";

/// Upper bound for `server.request_timeout_seconds`
const MAX_REQUEST_TIMEOUT_SECONDS: u64 = 300;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Closed set of recognised skills, keyed by skill name
    pub skills: BTreeMap<String, SkillConfig>,
    pub invoker: InvokerConfig,
    pub authorizer: AuthorizerConfig,
    #[serde(default)]
    pub functions: FunctionsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Client timeout for every outbound call (completion, invocation, link API)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout() -> u64 {
    30
}

/// Completion provider used for intent classification
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_completion_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the provider API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: default_completion_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_completion_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// One entry of the skill dispatch table
///
/// Fields are private; instances come from deserialization and are checked by
/// `Config::validate()`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SkillConfig {
    function: String,
    #[serde(default = "default_request_field")]
    request_field: String,
    #[serde(default)]
    reply_field: Option<String>,
    /// Sample user message shown to the classifier as the worked example
    #[serde(default)]
    example: Option<String>,
}

impl SkillConfig {
    /// Downstream function identifier
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Request payload field that carries the canonical text
    pub fn request_field(&self) -> &str {
        &self.request_field
    }

    /// Reply payload field projected into the gateway response, if any
    pub fn reply_field(&self) -> Option<&str> {
        self.reply_field.as_deref()
    }

    /// Worked example for the classifier prompt
    pub fn example(&self) -> Option<&str> {
        self.example.as_deref()
    }
}

fn default_request_field() -> String {
    "text".to_string()
}

/// Downstream invocation endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvokerConfig {
    /// Base URL of the function host; calls go to `{base_url}/functions/{id}/invocations`
    pub base_url: String,
}

/// Where the authorizer reads its expected secret from
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SecretStoreKind {
    /// Secret id names an environment variable
    #[default]
    Env,
    /// Secret id names a file inside `secrets_dir`
    File,
}

/// Token authorizer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorizerConfig {
    #[serde(default)]
    pub secret_store: SecretStoreKind,
    pub secret_id: String,
    #[serde(default)]
    pub secrets_dir: Option<String>,
    #[serde(default = "default_principal_id")]
    pub principal_id: String,
}

fn default_principal_id() -> String {
    "user".to_string()
}

/// Functions hosted by this process under `/functions/{id}/invocations`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FunctionsConfig {
    #[serde(default)]
    pub link_shortener: Option<LinkShortenerConfig>,
}

/// Locally hosted link shortener (Dub API)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinkShortenerConfig {
    /// Function id the shortener is served under
    #[serde(default = "default_link_shortener_name")]
    pub name: String,
    #[serde(default = "default_link_api_base")]
    pub api_base: String,
    #[serde(default = "default_link_api_key_env")]
    pub api_key_env: String,
    /// Custom short domain; the provider default is used when unset
    #[serde(default)]
    pub domain: Option<String>,
}

fn default_link_shortener_name() -> String {
    "link-shortener".to_string()
}

fn default_link_api_base() -> String {
    "https://api.dub.co".to_string()
}

fn default_link_api_key_env() -> String {
    "DUB_API_KEY".to_string()
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve a credential from the environment
///
/// `.env` is loaded into the environment by the binary before this runs.
/// Blank values count as missing.
pub fn credential(env_var: &str) -> AppResult<SecretString> {
    match std::env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretString::new(value)),
        _ => Err(AppError::MissingCredential {
            env_var: env_var.to_string(),
        }),
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Function ids travel as a single URL path segment, so they are limited to
/// characters that need no encoding there
fn is_valid_function_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_valid_skill_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Client timeout applied to every outbound call
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_seconds)
    }

    /// Validate configuration after parsing
    ///
    /// Called by `from_file()` and `from_str()`; call it explicitly when a
    /// `Config` is built any other way.
    pub fn validate(&self) -> AppResult<()> {
        if self.server.request_timeout_seconds == 0 {
            return Err(AppError::Config(
                "request_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.server.request_timeout_seconds > MAX_REQUEST_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "request_timeout_seconds cannot exceed {} seconds, got {}",
                MAX_REQUEST_TIMEOUT_SECONDS, self.server.request_timeout_seconds
            )));
        }

        if !is_http_url(&self.classifier.endpoint) {
            return Err(AppError::Config(format!(
                "classifier.endpoint '{}' must start with 'http://' or 'https://'",
                self.classifier.endpoint
            )));
        }
        if self.classifier.model.trim().is_empty() {
            return Err(AppError::Config(
                "classifier.model cannot be empty".to_string(),
            ));
        }
        if self.classifier.api_key_env.trim().is_empty() {
            return Err(AppError::Config(
                "classifier.api_key_env cannot be empty".to_string(),
            ));
        }

        if self.skills.is_empty() {
            return Err(AppError::Config(
                "no skills configured. Add at least one [skills.<name>] section, e.g.\n\
                [skills.link_shortener]\n\
                function = \"link-shortener\""
                    .to_string(),
            ));
        }
        for (name, skill) in &self.skills {
            if !is_valid_skill_name(name) {
                return Err(AppError::Config(format!(
                    "skill name '{}' must be non-empty lowercase snake_case",
                    name
                )));
            }
            if name == CATCH_ALL_SKILL {
                return Err(AppError::Config(format!(
                    "'{}' is the classifier's catch-all and cannot be mapped to a function",
                    CATCH_ALL_SKILL
                )));
            }
            if !is_valid_function_id(&skill.function) {
                return Err(AppError::Config(format!(
                    "skills.{}.function '{}' must be a non-empty identifier of [A-Za-z0-9_-]",
                    name, skill.function
                )));
            }
            if skill.request_field.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "skills.{}.request_field cannot be empty",
                    name
                )));
            }
            if skill.reply_field.as_deref().is_some_and(|f| f.trim().is_empty()) {
                return Err(AppError::Config(format!(
                    "skills.{}.reply_field cannot be empty when set",
                    name
                )));
            }
        }

        if !is_http_url(&self.invoker.base_url) {
            return Err(AppError::Config(format!(
                "invoker.base_url '{}' must start with 'http://' or 'https://'",
                self.invoker.base_url
            )));
        }

        if self.authorizer.secret_id.trim().is_empty() {
            return Err(AppError::Config(
                "authorizer.secret_id cannot be empty".to_string(),
            ));
        }
        if self.authorizer.secret_store == SecretStoreKind::File
            && self.authorizer.secrets_dir.is_none()
        {
            return Err(AppError::Config(
                "authorizer.secrets_dir is required when secret_store = \"file\"".to_string(),
            ));
        }

        if let Some(shortener) = &self.functions.link_shortener {
            if !is_http_url(&shortener.api_base) {
                return Err(AppError::Config(format!(
                    "functions.link_shortener.api_base '{}' must start with 'http://' or 'https://'",
                    shortener.api_base
                )));
            }
            if !is_valid_function_id(&shortener.name) {
                return Err(AppError::Config(format!(
                    "functions.link_shortener.name '{}' must be a non-empty identifier of [A-Za-z0-9_-]",
                    shortener.name
                )));
            }
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}
