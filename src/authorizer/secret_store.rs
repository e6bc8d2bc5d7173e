//! Secret retrieval for the token authorizer
//!
//! A secret store resolves an identifier to a single string secret. Two
//! backends: process environment (`env`) and a directory of mounted secret
//! files (`file`), one file per identifier.

use crate::config::{AuthorizerConfig, SecretStoreKind};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret, SecretString};
use std::path::PathBuf;
use std::sync::Arc;

/// Secret retrieval failures
#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    #[error("secret identifier is blank")]
    BlankIdentifier,

    #[error("secret identifier '{0}' is not a plain name")]
    InvalidIdentifier(String),

    #[error("secret '{id}' not found")]
    NotFound { id: String },

    #[error("secret '{id}' is empty")]
    Empty { id: String },

    #[error("failed to read secret '{id}' from {path}: {source}")]
    Read {
        id: String,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Fetch-by-identifier secret backend
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<SecretString, SecretStoreError>;
}

/// Secrets held in process environment variables
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretStore;

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn fetch(&self, id: &str) -> Result<SecretString, SecretStoreError> {
        if id.trim().is_empty() {
            return Err(SecretStoreError::BlankIdentifier);
        }
        match std::env::var(id) {
            Ok(value) if value.is_empty() => Err(SecretStoreError::Empty { id: id.to_string() }),
            Ok(value) => Ok(Secret::new(value)),
            Err(_) => Err(SecretStoreError::NotFound { id: id.to_string() }),
        }
    }
}

/// Secrets mounted as files, one per identifier
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, SecretStoreError> {
        if id.trim().is_empty() {
            return Err(SecretStoreError::BlankIdentifier);
        }
        if id.contains('/') || id.contains('\\') || id == "." || id == ".." {
            return Err(SecretStoreError::InvalidIdentifier(id.to_string()));
        }
        Ok(self.dir.join(id))
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn fetch(&self, id: &str) -> Result<SecretString, SecretStoreError> {
        let path = self.path_for(id)?;
        let contents = tokio::fs::read_to_string(&path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                SecretStoreError::NotFound { id: id.to_string() }
            } else {
                SecretStoreError::Read {
                    id: id.to_string(),
                    path: path.display().to_string(),
                    source,
                }
            }
        })?;

        // Mounted secret files usually end with a newline
        let secret = contents.trim_end_matches(['\r', '\n']).to_string();
        if secret.is_empty() {
            return Err(SecretStoreError::Empty { id: id.to_string() });
        }
        Ok(Secret::new(secret))
    }
}

/// Build the store selected by `[authorizer].secret_store`
pub fn from_config(config: &AuthorizerConfig) -> AppResult<Arc<dyn SecretStore>> {
    match config.secret_store {
        SecretStoreKind::Env => Ok(Arc::new(EnvSecretStore)),
        SecretStoreKind::File => {
            let dir = config.secrets_dir.as_deref().ok_or_else(|| {
                AppError::Config("authorizer.secrets_dir is required for the file store".into())
            })?;
            Ok(Arc::new(FileSecretStore::new(dir)))
        }
    }
}

/// Expose for comparison only
pub(crate) fn expose(secret: &SecretString) -> &str {
    secret.expose_secret().as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_reads_and_trims_newline() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ROUTER_BEARER_SECRET"), "abc\n").unwrap();

        let store = FileSecretStore::new(dir.path());
        let secret = store.fetch("ROUTER_BEARER_SECRET").await.unwrap();
        assert_eq!(expose(&secret), "abc");
    }

    #[tokio::test]
    async fn test_file_store_keeps_inner_whitespace() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("s"), " a b \n").unwrap();

        let secret = FileSecretStore::new(dir.path()).fetch("s").await.unwrap();
        assert_eq!(expose(&secret), " a b ");
    }

    #[tokio::test]
    async fn test_file_store_missing_secret() {
        let dir = TempDir::new().unwrap();
        let err = FileSecretStore::new(dir.path()).fetch("absent").await.unwrap_err();
        assert!(matches!(err, SecretStoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_file_store_empty_secret() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("blank"), "\n").unwrap();
        let err = FileSecretStore::new(dir.path()).fetch("blank").await.unwrap_err();
        assert!(matches!(err, SecretStoreError::Empty { .. }));
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let store = FileSecretStore::new(dir.path());
        assert!(matches!(
            store.fetch("../etc/passwd").await,
            Err(SecretStoreError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            store.fetch("..").await,
            Err(SecretStoreError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            store.fetch(" ").await,
            Err(SecretStoreError::BlankIdentifier)
        ));
    }

    #[tokio::test]
    async fn test_env_store_missing_variable() {
        let err = EnvSecretStore
            .fetch("SKILLROUTE_TEST_SECRET_THAT_IS_NEVER_SET")
            .await
            .unwrap_err();
        assert!(matches!(err, SecretStoreError::NotFound { .. }));
    }

    #[test]
    fn test_from_config_file_store_requires_dir() {
        let config = AuthorizerConfig {
            secret_store: SecretStoreKind::File,
            secret_id: "ROUTER_BEARER_SECRET".to_string(),
            secrets_dir: None,
            principal_id: "user".to_string(),
        };
        assert!(from_config(&config).is_err());
    }
}
