use thiserror::Error;

/// Errors surfaced by the generation pipeline, history store and narration.
#[derive(Debug, Error)]
pub enum StudioError {
    /// A template field failed validation. Raised before any network call.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("API key is missing. Set GEMINI_API_KEY or pass a key to the client builder.")]
    MissingCredential,

    /// The backend rejected the request or the stream broke. The message is the
    /// backend's own, unmodified.
    #[error("{0}")]
    GenerationFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Context error: {0}")]
    Context(String),
}

impl From<gemini_rust::ClientError> for StudioError {
    fn from(err: gemini_rust::ClientError) -> Self {
        let message = match &err {
            gemini_rust::ClientError::BadResponse {
                description: Some(description),
                ..
            } => backend_message(description).unwrap_or_else(|| description.clone()),
            _ => err.to_string(),
        };
        Self::GenerationFailed(message)
    }
}

/// Pull `error.message` out of a Gemini error body.
fn backend_message(description: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(description).ok()?;
    json.get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

impl StudioError {
    /// Create a validation error for a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Name of the offending field for validation errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// True when the error was raised before the backend was contacted.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::MissingCredential)
    }

    /// Heuristic check for safety-filter rejections reported by the backend.
    pub fn is_content_policy(&self) -> bool {
        match self {
            Self::GenerationFailed(message) => {
                let lower = message.to_lowercase();
                ["safety", "blocked", "prohibited_content", "content policy"]
                    .iter()
                    .any(|marker| lower.contains(marker))
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn with_context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<StudioError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let base_err = e.into();
            StudioError::Context(format!("{}: {}", context.into(), base_err))
        })
    }
}
