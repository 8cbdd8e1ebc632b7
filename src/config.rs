use std::fmt;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigurationError;

/// Everything needed to reach the remote model, resolved once at startup.
#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub model: String,
    pub api_base: Url,
    /// `None` waits for the remote side indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Settings {
    pub fn resolve(
        api_key: Option<String>,
        model: &str,
        api_base: &str,
        timeout_secs: Option<u64>,
    ) -> Result<Self, ConfigurationError> {
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigurationError::MissingApiKey)?;

        let model = model.trim();
        if model.is_empty() {
            return Err(ConfigurationError::InvalidModel);
        }

        let api_base = Url::parse(api_base.trim_end_matches('/'))
            .map_err(|e| ConfigurationError::InvalidApiBase(format!("{api_base}: {e}")))?;
        if api_base.cannot_be_a_base() {
            return Err(ConfigurationError::InvalidApiBase(api_base.to_string()));
        }

        Ok(Self {
            api_key,
            model: model.to_string(),
            api_base,
            request_timeout: timeout_secs.filter(|s| *s > 0).map(Duration::from_secs),
        })
    }
}

// Keeps the credential out of logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base.as_str())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
