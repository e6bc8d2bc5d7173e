//! Link shortening function backed by the Dub API
//!
//! Input `{"longLink": ...}`, output `{"shortLink": ...}`.

use super::{FunctionFailure, SkillFunction};
use crate::config::{LinkShortenerConfig, credential};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkShortenerInput {
    pub long_link: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkShortenerOutput {
    pub short_link: String,
}

#[derive(Debug, Serialize)]
struct CreateLinkRequest<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateLinkResponse {
    short_link: String,
}

pub struct LinkShortener {
    http: reqwest::Client,
    links_url: String,
    api_key: SecretString,
    domain: Option<String>,
}

impl std::fmt::Debug for LinkShortener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkShortener")
            .field("links_url", &self.links_url)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

impl LinkShortener {
    pub fn new(
        api_base: &str,
        api_key: SecretString,
        domain: Option<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build Dub client: {}", e)))?;

        Ok(Self {
            http,
            links_url: format!("{}/links", api_base.trim_end_matches('/')),
            api_key,
            domain,
        })
    }

    /// Build from config, reading the API key from the configured variable
    pub fn from_config(config: &LinkShortenerConfig, timeout: Duration) -> AppResult<Self> {
        let api_key = credential(&config.api_key_env)?;
        Self::new(&config.api_base, api_key, config.domain.clone(), timeout)
    }

    /// Create a short link for `long_link`
    pub async fn shorten(&self, long_link: &str) -> Result<String, FunctionFailure> {
        let request = CreateLinkRequest {
            url: long_link,
            domain: self.domain.as_deref(),
        };

        let response = self
            .http
            .post(&self.links_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| FunctionFailure::Upstream(format!("Dub request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FunctionFailure::Upstream(format!(
                "Dub returned HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let created: CreateLinkResponse = response
            .json()
            .await
            .map_err(|e| FunctionFailure::Upstream(format!("Dub reply undecodable: {}", e)))?;
        Ok(created.short_link)
    }
}

#[async_trait]
impl SkillFunction for LinkShortener {
    async fn handle(&self, payload: &[u8]) -> Result<Vec<u8>, FunctionFailure> {
        let input: LinkShortenerInput = serde_json::from_slice(payload)
            .map_err(|e| FunctionFailure::BadInput(format!("expected {{\"longLink\"}}: {}", e)))?;
        if input.long_link.trim().is_empty() {
            return Err(FunctionFailure::BadInput("longLink is blank".to_string()));
        }

        tracing::info!(long_link = %input.long_link, "Shortening link");
        let short_link = self.shorten(&input.long_link).await?;
        tracing::info!(short_link = %short_link, "Link shortened");

        serde_json::to_vec(&LinkShortenerOutput { short_link })
            .map_err(|e| FunctionFailure::Upstream(format!("failed to encode reply: {}", e)))
    }
}
