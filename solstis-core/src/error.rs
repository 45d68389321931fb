use thiserror::Error;

/// Main error type for SolsTiS operations
///
/// None of these are retried internally. A repeated command may have side
/// effects on the instrument, so retry policy belongs to the caller.
#[derive(Error, Debug)]
pub enum SolstisError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// Stream desynchronized, or a brace-balanced payload is not valid JSON
    #[error("Framing error: {0}")]
    Framing(String),

    #[error("Timeout")]
    Timeout,

    /// Reply op or transmission ID does not match the outstanding request
    #[error("Correlation error: {0}")]
    Correlation(String),

    /// The controller answered with `parse_fail`
    #[error("Device rejected request: {0}")]
    DeviceProtocol(String),

    /// Command-specific non-zero status
    #[error("{op} failed with status {code}: {reason}")]
    DeviceStatus {
        op: &'static str,
        code: i64,
        reason: &'static str,
    },

    /// Invalid caller input, raised before any I/O
    #[error("Validation error: {0}")]
    Validation(String),

    /// A well-framed reply lacks a field the command needs
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SolstisError {
    /// Check whether this error is a deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, SolstisError::Timeout)
    }

    /// Check whether the connection's byte alignment must now be considered suspect
    ///
    /// The only safe recovery after such an error is to close and reopen the
    /// connection.
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(
            self,
            SolstisError::Connection(_) | SolstisError::Framing(_) | SolstisError::Timeout
        )
    }

    /// Status code carried by a [`SolstisError::DeviceStatus`], if any
    pub fn status_code(&self) -> Option<i64> {
        match self {
            SolstisError::DeviceStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias for SolsTiS operations
pub type SolstisResult<T> = Result<T, SolstisError>;
