use gatewire_core::{MarshalError, UriError};
use url::Url;

/// Errors surfaced by operation dispatch and the custom-function path.
///
/// Registration conflicts are deliberately *not* represented here: the
/// `bind_*` family reports "already registered" as an ordinary `false` so
/// binding code can probe for collisions without error-based control flow.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// Malformed request, bad operation URI, or empty operation name.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// No handler bound for the resolved operation URI.
    #[error("no operation bound at `{operation_id}`")]
    NotFound { operation_id: Url },
    /// The marshalling layer found no matching codec.
    #[error(transparent)]
    Unsupported(#[from] MarshalError),
    /// The custom-function authorize predicate rejected the caller.
    #[error("caller is not authorized: {reason}")]
    Unauthorized { reason: String },
    /// The call's cancellation signal fired.
    #[error("call was cancelled")]
    Cancelled,
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<UriError> for OperationError {
    fn from(error: UriError) -> Self {
        OperationError::InvalidArgument(error.to_string())
    }
}
