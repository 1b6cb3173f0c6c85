use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RecallError>;

/// Errors surfaced by the client adapter and the dashboard controller.
///
/// Three families: configuration (`MissingApiKey`), transport/model
/// (`Request`, `AuthFailed`, `Api`), and contract (`EmptyResponse`,
/// `Contract`). An empty payload is distinct from a payload that fails to
/// parse as the requested shape. `Busy` and `Unavailable` come from the
/// controller's gating, never from the wire.
#[derive(Error, Debug)]
pub enum RecallError {
    /// API key not found in process configuration
    #[error("GEMINI_API_KEY not found in environment")]
    MissingApiKey,

    /// Network-level failure before a response was obtained
    #[error("request failed: {0}")]
    Request(String),

    /// The API rejected the configured key
    #[error("invalid or rejected API key: {0}")]
    AuthFailed(String),

    /// Model-side error returned by the API
    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The model returned no usable text payload
    #[error("empty response from model")]
    EmptyResponse,

    /// The response text did not conform to the requested schema
    #[error("response did not match the requested shape: {0}")]
    Contract(String),

    /// The flow's in-flight guard is already held
    #[error("{0} is already in flight")]
    Busy(&'static str),

    /// A gating invariant blocks the operation
    #[error("{0}")]
    Unavailable(&'static str),
}

impl From<reqwest::Error> for RecallError {
    fn from(err: reqwest::Error) -> Self {
        RecallError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for RecallError {
    fn from(err: serde_json::Error) -> Self {
        RecallError::Contract(err.to_string())
    }
}

impl RecallError {
    /// True for the contract family: the call completed but the model's
    /// payload violated the declared output shape.
    pub fn is_contract(&self) -> bool {
        matches!(self, RecallError::EmptyResponse | RecallError::Contract(_))
    }
}
