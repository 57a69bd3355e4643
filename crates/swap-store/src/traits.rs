use swap_types::{NewSwapRequest, SwapRequest};

use crate::error::StoreResult;

/// Append-only store of swap requests.
///
/// All implementations must satisfy these invariants:
/// - `insert` is the only mutator. Records are never updated or deleted.
/// - A failed `insert` leaves the store unchanged.
/// - Section names are compared exactly (case-sensitive, no trimming).
/// - Lookups return records in insertion order; `list_all` returns them
///   newest first.
/// - After `close`, every other operation fails with
///   [`StoreError::Unavailable`](crate::StoreError::Unavailable).
pub trait RequestStore: Send + Sync {
    /// Validate a submission, assign it an id and creation time, persist it,
    /// and return the stored record.
    fn insert(&self, request: NewSwapRequest) -> StoreResult<SwapRequest>;

    /// All records ordered by `createdAt` descending. Records created at the
    /// same instant are listed latest-inserted first.
    fn list_all(&self) -> StoreResult<Vec<SwapRequest>>;

    /// All records holding `current` and wanting `desired`.
    fn find_by(&self, current: &str, desired: &str) -> StoreResult<Vec<SwapRequest>>;

    /// The earliest-inserted record holding `current` and wanting `desired`.
    ///
    /// Default implementation takes the head of [`find_by`](Self::find_by).
    /// Indexed backends override it to avoid cloning every hit.
    fn find_one_by(&self, current: &str, desired: &str) -> StoreResult<Option<SwapRequest>> {
        Ok(self.find_by(current, desired)?.into_iter().next())
    }

    /// All records wanting `desired`, whatever they currently hold.
    fn find_by_desired(&self, desired: &str) -> StoreResult<Vec<SwapRequest>>;

    /// Number of records stored.
    fn len(&self) -> StoreResult<usize>;

    /// Returns `true` if nothing has been stored yet.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// End the handle's lifecycle, flushing anything buffered.
    ///
    /// Closing an already closed store is a no-op.
    fn close(&self) -> StoreResult<()>;
}
