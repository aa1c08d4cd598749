//! Configuration loading and validation.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TwinstageError};

/// Top-level Twinstage configuration.
///
/// The hosting page injects the backend coordinates and the viewer
/// identity; headless deployments read them from the environment or a
/// JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub backend: BackendConfig,

    /// Identity used for controller election. Generated (UUID v4) when
    /// not injected.
    #[serde(default = "generated_client_id")]
    pub client_id: String,
}

/// Coordinates of the hosted session-row backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://project.example.co`.
    pub url: String,

    /// Anonymous access key sent as `apikey` and bearer token.
    pub anon_key: String,

    #[serde(default = "default_cascade_table")]
    pub cascade_table: String,

    #[serde(default = "default_deck_table")]
    pub deck_table: String,
}

fn default_cascade_table() -> String {
    "cascade_session".into()
}

fn default_deck_table() -> String {
    "deck_session".into()
}

fn generated_client_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl StageConfig {
    /// Read configuration from `TWINSTAGE_BACKEND_URL`,
    /// `TWINSTAGE_ANON_KEY`, and (optionally) `TWINSTAGE_CLIENT_ID`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("TWINSTAGE_BACKEND_URL")
            .map_err(|_| TwinstageError::Config("TWINSTAGE_BACKEND_URL not set".into()))?;
        let anon_key = std::env::var("TWINSTAGE_ANON_KEY")
            .map_err(|_| TwinstageError::Config("TWINSTAGE_ANON_KEY not set".into()))?;
        let client_id =
            std::env::var("TWINSTAGE_CLIENT_ID").unwrap_or_else(|_| generated_client_id());

        let config = Self {
            backend: BackendConfig {
                url,
                anon_key,
                cascade_table: default_cascade_table(),
                deck_table: default_deck_table(),
            },
            client_id,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        debug!(path = %path.as_ref().display(), "Loaded config file");
        Ok(config)
    }

    /// Load from an optional file, letting the environment override the
    /// backend coordinates and identity when set.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => return Self::from_env(),
        };
        if let Ok(url) = std::env::var("TWINSTAGE_BACKEND_URL") {
            config.backend.url = url;
        }
        if let Ok(key) = std::env::var("TWINSTAGE_ANON_KEY") {
            config.backend.anon_key = key;
        }
        if let Ok(id) = std::env::var("TWINSTAGE_CLIENT_ID") {
            config.client_id = id;
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.backend.url.starts_with("http://") && !self.backend.url.starts_with("https://") {
            return Err(TwinstageError::Config(format!(
                "backend url must be http(s): {}",
                self.backend.url
            )));
        }
        if self.backend.anon_key.is_empty() {
            return Err(TwinstageError::Config("anon key is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stage.json");
        std::fs::write(
            &path,
            r#"{"backend":{"url":"https://example.co","anon_key":"anon"},"client_id":"viewer-1"}"#,
        )
        .unwrap();

        let config = StageConfig::from_file(&path).unwrap();
        assert_eq!(config.backend.cascade_table, "cascade_session");
        assert_eq!(config.backend.deck_table, "deck_session");
        assert_eq!(config.client_id, "viewer-1");
    }

    #[test]
    fn test_rejects_non_http_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stage.json");
        std::fs::write(
            &path,
            r#"{"backend":{"url":"ftp://example.co","anon_key":"anon"}}"#,
        )
        .unwrap();

        assert!(StageConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_generated_identity_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stage.json");
        std::fs::write(
            &path,
            r#"{"backend":{"url":"https://example.co","anon_key":"anon"}}"#,
        )
        .unwrap();

        let config = StageConfig::from_file(&path).unwrap();
        assert!(!config.client_id.is_empty());
    }
}
