use placedir_core::error::CoreError;
use placedir_core::types::DbId;

/// Failures reported by the data-access collaborator.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The backend could not be reached (network, auth, timeout).
    #[error("Directory backend unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the request.
    #[error("Directory backend rejected the request: {0}")]
    Rejected(String),

    /// The backend answered with something that cannot be used.
    #[error("Malformed response for {entity} {id}: {reason}")]
    Malformed {
        entity: &'static str,
        id: DbId,
        reason: String,
    },
}

/// Session-level error type for console actions.
///
/// Wraps [`CoreError`] for local validation and referential failures and
/// [`GatewayError`] for transport failures. None of these are fatal; each
/// is scoped to the operation that produced it.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;
