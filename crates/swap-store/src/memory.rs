use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use swap_types::{NewSwapRequest, RequestId, SwapRequest};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::index::RecordIndex;
use crate::traits::RequestStore;

/// In-memory request store.
///
/// Intended for tests and embedding. Records are held in a [`RecordIndex`]
/// behind a `RwLock` for safe concurrent access and are cloned on read.
pub struct InMemoryRequestStore {
    index: RwLock<RecordIndex>,
    closed: AtomicBool,
}

impl InMemoryRequestStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            index: RwLock::new(RecordIndex::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("store is closed".into()));
        }
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, RecordIndex>> {
        self.ensure_open()?;
        self.index
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, RecordIndex>> {
        self.ensure_open()?;
        self.index
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }
}

impl Default for InMemoryRequestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestStore for InMemoryRequestStore {
    fn insert(&self, request: NewSwapRequest) -> StoreResult<SwapRequest> {
        let mut index = self.write()?;
        let created_at = index.next_timestamp(Utc::now());
        let record = request.into_record(RequestId::new(), created_at)?;
        index.push(record.clone());
        debug!(
            id = %record.id,
            current = %record.current_section,
            desired = %record.desired_section,
            "swap request stored"
        );
        Ok(record)
    }

    fn list_all(&self) -> StoreResult<Vec<SwapRequest>> {
        Ok(self.read()?.newest_first())
    }

    fn find_by(&self, current: &str, desired: &str) -> StoreResult<Vec<SwapRequest>> {
        Ok(self.read()?.find_by(current, desired))
    }

    fn find_one_by(&self, current: &str, desired: &str) -> StoreResult<Option<SwapRequest>> {
        Ok(self.read()?.find_one_by(current, desired))
    }

    fn find_by_desired(&self, desired: &str) -> StoreResult<Vec<SwapRequest>> {
        Ok(self.read()?.find_by_desired(desired))
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }

    fn close(&self) -> StoreResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("in-memory store closed");
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryRequestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.index.read().map(|index| index.len()).unwrap_or(0);
        f.debug_struct("InMemoryRequestStore")
            .field("record_count", &count)
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}
