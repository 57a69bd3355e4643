use swap_store::StoreError;
use swap_types::ValidationError;
use thiserror::Error;

/// Errors from a match search.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The query's `current` or `desired` section was blank.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store could not serve a lookup.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
