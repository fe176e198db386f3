//! Application state management

use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::config::{Config, ConfigError};
use crate::upload::{StoreWriter, Validator};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    validator: Validator,
    writer: StoreWriter,
    verifier: Option<TokenVerifier>,
}

impl AppState {
    /// Create the application state
    ///
    /// Prepares the storage directories; a missing or unwritable base
    /// directory is a configuration error and the server must not start.
    pub async fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let writer = StoreWriter::new(config.storage.base_dir.clone());
        writer
            .initialize()
            .await
            .map_err(|source| ConfigError::Storage {
                path: config.storage.base_dir.clone(),
                source,
            })?;

        let verifier = if config.auth.required {
            let secret = config
                .auth
                .jwt_secret
                .as_deref()
                .ok_or(ConfigError::MissingJwtSecret)?;
            Some(TokenVerifier::new(secret))
        } else {
            None
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                validator: Validator::new(config.uploads),
                writer,
                verifier,
            }),
        })
    }

    pub fn validator(&self) -> &Validator {
        &self.inner.validator
    }

    pub fn writer(&self) -> &StoreWriter {
        &self.inner.writer
    }

    /// Token verifier, present only when uploads require authentication
    pub fn verifier(&self) -> Option<&TokenVerifier> {
        self.inner.verifier.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::UploadCategory;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_new_prepares_storage() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.base_dir = temp_dir.path().join("public");
        config.auth.jwt_secret = Some("portal-secret".to_string());

        let state = AppState::new(config).await.unwrap();

        assert_eq!(state.writer().base_dir(), temp_dir.path().join("public"));
        for category in UploadCategory::ALL {
            assert!(state.writer().category_dir(category).is_dir());
        }
        assert!(state.verifier().is_some());
    }

    #[tokio::test]
    async fn test_new_rejects_unusable_setup() {
        let temp_dir = TempDir::new().unwrap();

        let mut no_secret = Config::default();
        no_secret.storage.base_dir = temp_dir.path().join("public");
        assert!(matches!(
            AppState::new(no_secret).await,
            Err(ConfigError::MissingJwtSecret)
        ));

        let blocker = temp_dir.path().join("blocked");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let mut bad_dir = Config::default();
        bad_dir.storage.base_dir = blocker;
        bad_dir.auth.required = false;
        assert!(matches!(
            AppState::new(bad_dir).await,
            Err(ConfigError::Storage { .. })
        ));
    }
}
