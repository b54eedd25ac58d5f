//! Error types for the core flashcard crate.

use flashdeck_rs_protocol::{BlobError, CardId, DeckId, TransportError};
use thiserror::Error;

/// Errors returned by store, completion, and integration operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlashdeckError {
    /// No API credential is configured; nothing was sent.
    #[error("missing API credential")]
    MissingCredential,
    /// Transport-level failure after all retries.
    #[error("network error: {0}")]
    Network(String),
    /// The API reported an error payload.
    #[error("response error: {0}")]
    Response(String),
    /// Malformed body or missing fields.
    #[error("parse error: {0}")]
    Parse(String),
    /// Deck id is unknown to the store.
    #[error("unknown deck: {0}")]
    DeckNotFound(DeckId),
    /// Card id is unknown to the store or deck.
    #[error("unknown card: {0}")]
    CardNotFound(CardId),
    /// The card was edited after an integration started from it.
    #[error("card changed during integration: {0}")]
    CardChanged(CardId),
    /// Persistence read or write failure.
    #[error("io error: {0}")]
    Io(String),
    /// Caller supplied unusable input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The deck service task has stopped.
    #[error("deck service is closed")]
    ServiceClosed,
}

impl FlashdeckError {
    /// Only transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FlashdeckError::Network(_))
    }
}

impl From<TransportError> for FlashdeckError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Network(message) => FlashdeckError::Network(message),
        }
    }
}

impl From<BlobError> for FlashdeckError {
    fn from(err: BlobError) -> Self {
        FlashdeckError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::FlashdeckError;
    use flashdeck_rs_protocol::TransportError;
    use pretty_assertions::assert_eq;

    #[test]
    fn only_network_errors_retry() {
        assert!(FlashdeckError::Network("reset".to_string()).is_retryable());
        assert!(!FlashdeckError::Response("quota".to_string()).is_retryable());
        assert!(!FlashdeckError::Parse("bad".to_string()).is_retryable());
        assert!(!FlashdeckError::MissingCredential.is_retryable());
    }

    #[test]
    fn transport_errors_map_to_network() {
        let err = FlashdeckError::from(TransportError::Network("timed out".to_string()));
        assert_eq!(err, FlashdeckError::Network("timed out".to_string()));
    }
}
