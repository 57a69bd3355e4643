//! Swap matching for Section Swap.
//!
//! Given a querying party that holds `current` and wants `desired`, the
//! matcher classifies the best available swap opportunity in a
//! [`RequestStore`](swap_store::RequestStore):
//!
//! 1. **Direct** -- every record holding `desired` and wanting `current`.
//!    Direct matches take absolute priority.
//! 2. **Three-way** -- for each first link `L` wanting `current`, the
//!    earliest second link `S` holding `desired` and wanting what `L` holds.
//!    Each `L` contributes at most one [`SwapGroup`].
//! 3. **None** -- neither search found anything. This is not an error.
//!
//! Only cycles of length 2 and 3 are searched, and results are not ranked.
//! The search reads the store twice without a snapshot, so a record inserted
//! between the phases may or may not be seen; callers simply query again.

pub mod error;
pub mod matcher;
pub mod result;

pub use error::MatchError;
pub use matcher::{find_matches, MatchQuery, Matcher};
pub use result::{MatchResult, MatchType, Party, SwapGroup, SELF_CONTACT_PLACEHOLDER};
