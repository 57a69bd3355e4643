use swap_types::ValidationError;

/// Errors from request store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The submission was missing a required field. Nothing was stored.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store has been closed or can no longer be accessed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record could not be encoded for the log.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The log holds a frame header no writer could have produced. The file
    /// is left as found.
    #[error("request log corrupt at byte {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` if the failure lies with the backend rather than the
    /// caller's input, i.e. the caller may retry later.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
