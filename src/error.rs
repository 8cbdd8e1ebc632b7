use thiserror::Error;

/// Problems with how the assistant was set up. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("missing Gemini API key (set GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("model name must not be empty")]
    InvalidModel,

    #[error("invalid Gemini API base URL: {0}")]
    InvalidApiBase(String),

    #[error("model gateway used before initialize")]
    NotInitialized,

    #[error("model gateway already initialized with a different instruction")]
    AlreadyInitialized,
}

/// Failures of a single exchange with the remote model.
///
/// These are recovered by the session: the user sees the fallback reply,
/// never the details carried here.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("request to model failed: {0}")]
    Network(String),

    #[error("model API returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("model refused to answer: {0}")]
    Blocked(String),

    #[error("model returned no text")]
    EmptyResponse,

    #[error("malformed model response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Malformed(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}
