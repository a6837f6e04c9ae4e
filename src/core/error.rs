//! Custom error types for Toolbridge
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for Toolbridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A tool provider failed to spawn, handshake, or report its tools
    #[error("Provider '{provider}' failed to initialize: {reason}")]
    Init { provider: String, reason: String },

    /// A session method was called before a successful initialize
    #[error("'{0}' is not initialized")]
    NotInitialized(String),

    /// initialize was called twice without an intervening cleanup
    #[error("'{0}' is already initialized")]
    AlreadyInitialized(String),

    /// A tool call exhausted its attempts
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    /// The model asked for a provider that is not configured
    #[error("Model requested an unknown server '{name}'. Available: {available}")]
    UnknownServer { name: String, available: String },

    /// The model emitted a tool-call directive that does not decode
    #[error("Invalid tool directive: {0}")]
    InvalidDirective(String),

    /// Retryable failure talking to the model endpoint
    #[error("LLM request failed: {0}")]
    LlmTransient(String),

    /// Recap storage errors
    #[error("Recap error: {0}")]
    Recap(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// A tool call that failed on every attempt.
///
/// This is surfaced to the model as data, never raised past the turn.
#[derive(Error, Debug, Clone)]
#[error("Tool '{tool}' failed after {attempts} attempt(s): {last_cause}")]
pub struct InvokeError {
    pub tool: String,
    pub attempts: u32,
    pub last_cause: String,
}

/// Convenience Result type for Toolbridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider initialization error
    pub fn init(provider: impl Into<String>, reason: impl ToString) -> Self {
        Self::Init {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a recap error
    pub fn recap(msg: impl Into<String>) -> Self {
        Self::Recap(msg.into())
    }

    /// Create a transient LLM error
    pub fn llm_transient(msg: impl Into<String>) -> Self {
        Self::LlmTransient(msg.into())
    }

    /// Wrap an error with additional context
    pub fn with_context<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Whether the error only aborts the current turn, leaving the session usable
    pub fn is_turn_local(&self) -> bool {
        matches!(
            self,
            Self::UnknownServer { .. } | Self::InvalidDirective(_) | Self::Invoke(_)
        )
    }
}
