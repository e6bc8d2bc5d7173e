//! Skill functions hosted alongside the router
//!
//! A hosted function answers `POST /functions/{name}/invocations` the same way
//! a remote one would, so the invoker cannot tell the difference.

pub mod link_shortener;

use crate::config::FunctionsConfig;
use crate::dispatch::FunctionId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub use link_shortener::LinkShortener;

/// Failure of a hosted function
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FunctionFailure {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl FunctionFailure {
    /// Error type reported in the function error body
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::BadInput(_) => "BadInput",
            Self::Upstream(_) => "Upstream",
        }
    }
}

/// A function that turns a request payload into a reply payload
#[async_trait]
pub trait SkillFunction: Send + Sync {
    async fn handle(&self, payload: &[u8]) -> Result<Vec<u8>, FunctionFailure>;
}

/// Functions hosted by this process, by name
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<FunctionId, Arc<dyn SkillFunction>>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FunctionRegistry {
    /// Register the functions configured under `[functions.*]`
    ///
    /// A function whose credential is missing is skipped with a warning rather
    /// than failing start-up.
    pub fn from_config(config: &FunctionsConfig, timeout: Duration) -> Self {
        let mut registry = Self::default();

        if let Some(link_config) = &config.link_shortener {
            match LinkShortener::from_config(link_config, timeout) {
                Ok(shortener) => {
                    tracing::info!(function = %link_config.name, "Hosting link shortener function");
                    registry = registry.with_function(link_config.name.as_str(), Arc::new(shortener));
                }
                Err(e) => tracing::warn!(
                    function = %link_config.name,
                    error = %e,
                    "Link shortener not hosted"
                ),
            }
        }

        registry
    }

    pub fn with_function(
        mut self,
        name: impl Into<FunctionId>,
        function: Arc<dyn SkillFunction>,
    ) -> Self {
        self.functions.insert(name.into(), function);
        self
    }

    pub fn get(&self, name: &FunctionId) -> Option<Arc<dyn SkillFunction>> {
        self.functions.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
