//! Append-only storage for swap requests.
//!
//! The store is the only owner of [`SwapRequest`] records. Records are
//! created by [`RequestStore::insert`] and are never updated or deleted.
//! Reads are served from a [`RecordIndex`] that keeps records in insertion
//! order and indexes them by `(currentSection, desiredSection)` and by
//! `desiredSection`, which are exactly the lookups the matcher performs.
//!
//! # Storage Backends
//!
//! All backends implement the [`RequestStore`] trait:
//!
//! - [`InMemoryRequestStore`] -- `RwLock`-guarded index for tests and embedding
//! - [`FileRequestStore`] -- CRC-framed append-only log, replayed on open
//!
//! # Design Rules
//!
//! 1. Records are immutable once written.
//! 2. Write-then-link: a record is persisted before it becomes visible to readers.
//! 3. `createdAt` never goes backwards in insertion order.
//! 4. Concurrent reads are always safe; inserts are atomic per record.
//! 5. A closed store fails every operation with [`StoreError::Unavailable`].
//!
//! [`SwapRequest`]: swap_types::SwapRequest

pub mod error;
pub mod index;
pub mod log;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use index::RecordIndex;
pub use log::{FileRequestStore, SyncMode};
pub use memory::InMemoryRequestStore;
pub use traits::RequestStore;
