//! Skill dispatch table
//!
//! Maps a classified skill name to the downstream function that handles it.
//! The table is built once from configuration and is read-only afterwards.
//! Lookups are exact: an unknown name (including the classifier's catch-all
//! `other`) is an explicit miss, never a best-guess default.

use crate::config::SkillConfig;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a downstream function
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct FunctionId(String);

impl FunctionId {
    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FunctionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for FunctionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Dispatch failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("no handler for skill '{skill}'")]
    NoHandler { skill: String },
}

/// Resolved dispatch entry: which function handles a skill and its payload contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillTarget {
    skill: String,
    function: FunctionId,
    request_field: String,
    reply_field: Option<String>,
    example: Option<String>,
}

impl SkillTarget {
    /// Create a target with the default contract: `{"text": ...}` in, raw payload out
    pub fn new(skill: impl Into<String>, function: impl Into<FunctionId>) -> Self {
        Self {
            skill: skill.into(),
            function: function.into(),
            request_field: "text".to_string(),
            reply_field: None,
            example: None,
        }
    }

    fn from_config(skill: &str, config: &SkillConfig) -> Self {
        Self {
            skill: skill.to_string(),
            function: FunctionId::from(config.function()),
            request_field: config.request_field().to_string(),
            reply_field: config.reply_field().map(str::to_string),
            example: config.example().map(str::to_string),
        }
    }

    /// Set the request field carrying the canonical text
    pub fn with_request_field(mut self, field: impl Into<String>) -> Self {
        self.request_field = field.into();
        self
    }

    /// Set the reply field projected into the response
    pub fn with_reply_field(mut self, field: impl Into<String>) -> Self {
        self.reply_field = Some(field.into());
        self
    }

    /// Set the classifier worked example
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    pub fn skill(&self) -> &str {
        &self.skill
    }

    pub fn function(&self) -> &FunctionId {
        &self.function
    }

    pub fn request_field(&self) -> &str {
        &self.request_field
    }

    pub fn reply_field(&self) -> Option<&str> {
        self.reply_field.as_deref()
    }

    pub fn example(&self) -> Option<&str> {
        self.example.as_deref()
    }
}

/// Static skill-to-function mapping
#[derive(Debug, Clone, Default)]
pub struct SkillTable {
    targets: BTreeMap<String, SkillTarget>,
}

impl SkillTable {
    /// Build the table from the `[skills.*]` configuration
    pub fn from_config(skills: &BTreeMap<String, SkillConfig>) -> Self {
        let targets = skills
            .iter()
            .map(|(name, config)| (name.clone(), SkillTarget::from_config(name, config)))
            .collect();
        Self { targets }
    }

    /// Add or replace a target
    pub fn with_target(mut self, target: SkillTarget) -> Self {
        self.targets.insert(target.skill.clone(), target);
        self
    }

    /// Resolve a skill name to its target
    ///
    /// Pure lookup, no I/O.
    pub fn resolve(&self, skill: &str) -> Result<&SkillTarget, DispatchError> {
        self.targets
            .get(skill)
            .ok_or_else(|| DispatchError::NoHandler {
                skill: skill.to_string(),
            })
    }

    /// Configured skill names in sorted order
    pub fn skill_names(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    /// Configured targets in skill-name order
    pub fn targets(&self) -> impl Iterator<Item = &SkillTarget> {
        self.targets.values()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
