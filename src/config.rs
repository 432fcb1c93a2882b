//! Configuration types.

use secrecy::SecretString;

use crate::error::ConfigError;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8080/api";
const DEFAULT_PORT: u16 = 8080;

/// Where the remote progress store lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct ProgressApiConfig {
    /// Base URL the `/guide-progress` paths are appended to.
    pub base_url: reqwest::Url,
    /// Bearer token sent with every request, if any.
    pub auth_token: Option<SecretString>,
}

impl ProgressApiConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let base_url = reqwest::Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            key: "GUIDE_TOUR_API_URL".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            base_url,
            auth_token: None,
        })
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(SecretString::from(token.into()));
        self
    }

    /// Read `GUIDE_TOUR_API_URL` and `GUIDE_TOUR_API_TOKEN`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url =
            std::env::var("GUIDE_TOUR_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let config = Self::new(&url)?;
        match std::env::var("GUIDE_TOUR_API_TOKEN") {
            Ok(token) if !token.trim().is_empty() => Ok(config.with_auth_token(token)),
            _ => Ok(config),
        }
    }
}

/// Reference backend server settings.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub port: u16,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl BackendConfig {
    /// Read `GUIDE_TOUR_PORT`, falling back to the default on absent or bad values.
    pub fn from_env() -> Self {
        let port = std::env::var("GUIDE_TOUR_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        Self { port }
    }
}
