//! HTTP request handlers for the skillroute API

use crate::authorizer::{TokenAuthorizer, secret_store};
use crate::classifier::{IntentClassifier, OpenAiClassifier};
use crate::config::{Config, credential};
use crate::dispatch::SkillTable;
use crate::error::{AppError, AppResult};
use crate::invoker::{FunctionInvoker, HttpInvoker};
use crate::metrics::Metrics;
use crate::middleware::{request_id_middleware, require_bearer};
use crate::skills::FunctionRegistry;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod authorize;
pub mod events;
pub mod functions;
pub mod health;
pub mod metrics;
pub mod route;

/// Application state shared across all handlers
///
/// Built once at start-up; every field is read-only afterwards and Arc'd for
/// cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    skills: Arc<SkillTable>,
    classifier: Arc<dyn IntentClassifier>,
    invoker: Arc<dyn FunctionInvoker>,
    authorizer: Arc<TokenAuthorizer>,
    functions: Arc<FunctionRegistry>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Resolve credentials and run the authorizer cold start
    ///
    /// # Errors
    ///
    /// Fails when the completion API key is missing or a client cannot be
    /// built. An unavailable authorizer secret is not an error: the authorizer
    /// comes up degraded and denies everything.
    pub async fn initialize(config: Arc<Config>) -> AppResult<Self> {
        let timeout = config.request_timeout();
        let skills = SkillTable::from_config(&config.skills);

        let api_key = credential(&config.classifier.api_key_env)?;
        let classifier =
            OpenAiClassifier::from_config(&config.classifier, api_key, &skills, timeout)?;
        let invoker = HttpInvoker::new(&config.invoker.base_url, timeout)?;

        let store = secret_store::from_config(&config.authorizer)?;
        let authorizer = TokenAuthorizer::cold_start(
            store.as_ref(),
            &config.authorizer.secret_id,
            config.authorizer.principal_id.as_str(),
        )
        .await;

        let functions = FunctionRegistry::from_config(&config.functions, timeout);

        tracing::info!(
            skills = skills.len(),
            hosted_functions = functions.len(),
            authorizer = authorizer.phase().as_str(),
            "Application state initialized"
        );

        Ok(Self::from_parts(
            config,
            skills,
            Arc::new(classifier),
            Arc::new(invoker),
            Arc::new(authorizer),
        )?
        .with_functions(functions))
    }

    /// Assemble state from already-built components
    ///
    /// `skills` must be the table the classifier prompt was generated from, so
    /// that every skill the classifier can name is one dispatch can resolve.
    pub fn from_parts(
        config: Arc<Config>,
        skills: SkillTable,
        classifier: Arc<dyn IntentClassifier>,
        invoker: Arc<dyn FunctionInvoker>,
        authorizer: Arc<TokenAuthorizer>,
    ) -> AppResult<Self> {
        let metrics = Metrics::new()
            .map_err(|e| AppError::Internal(format!("Failed to register metrics: {}", e)))?;

        Ok(Self {
            config,
            skills: Arc::new(skills),
            classifier,
            invoker,
            authorizer,
            functions: Arc::new(FunctionRegistry::default()),
            metrics: Arc::new(metrics),
        })
    }

    /// Replace the hosted function registry
    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = Arc::new(functions);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn skills(&self) -> &SkillTable {
        &self.skills
    }

    pub fn classifier(&self) -> &dyn IntentClassifier {
        self.classifier.as_ref()
    }

    pub fn invoker(&self) -> &dyn FunctionInvoker {
        self.invoker.as_ref()
    }

    pub fn authorizer(&self) -> &TokenAuthorizer {
        &self.authorizer
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Build the HTTP application
pub fn app(state: AppState) -> Router {
    let guarded = Router::new()
        .route("/route", post(route::handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .merge(guarded)
        .route("/events", post(events::handler))
        .route("/authorize", post(authorize::handler))
        .route("/functions/{name}/invocations", post(functions::handler))
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}
