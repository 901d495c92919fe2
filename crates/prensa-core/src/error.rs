use thiserror::Error;

/// Application-wide error types for prensa.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP fetch of a listing or article page failed.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Browser navigation to an article URL failed.
    ///
    /// Non-fatal to a harvest run; the offending stub is skipped.
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// Browser launch or CDP-level failure.
    #[error("Browser error: {0}")]
    Browser(String),

    /// A bounded wait-for-condition poll expired.
    #[error("Timed out after {waited_ms} ms waiting for {condition}")]
    WaitTimeout { condition: String, waited_ms: u64 },

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// An enrichment provider call failed.
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// Publishing a record to the queue failed after all attempts.
    #[error("Publish error: {0}")]
    Publish(String),

    /// A queue message could not be deserialized into an envelope.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Database operation failed (queue or document store).
    #[error("Database error: {0}")]
    Database(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid or missing configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Timeout(_) | AppError::WaitTimeout { .. } => true,
            AppError::Fetch(msg) | AppError::Publish(msg) | AppError::Database(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            AppError::Provider { message, .. } => {
                message.contains("timeout") || message.contains("429") || message.contains("503")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(AppError::Timeout(30).is_retryable());
        assert!(
            AppError::WaitTimeout {
                condition: "consent control".into(),
                waited_ms: 2000,
            }
            .is_retryable()
        );
        assert!(AppError::Publish("connection reset".into()).is_retryable());
        assert!(AppError::Database("connect refused".into()).is_retryable());
    }

    #[test]
    fn non_retryable_errors() {
        assert!(!AppError::MalformedMessage("bad json".into()).is_retryable());
        assert!(!AppError::Config("missing key".into()).is_retryable());
        assert!(!AppError::Publish("queue does not exist".into()).is_retryable());
    }
}
