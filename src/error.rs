//! Error types for the page cache.
//!
//! The cache distinguishes contract violations (caller or internal bugs,
//! fatal to the owning session) from propagated I/O failures. A cache that
//! cannot evict because every resident page is pinned is *not* an error:
//! it is reported through the writer's diagnostic channel and the cache
//! keeps running over budget.

extern crate alloc;

use alloc::string::String;
use thiserror::Error;

/// Errors surfaced by [`PageCache`](crate::PageCache) operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// `put` was called for a page whose block range overlaps an entry
    /// that is already cached. Indicates a caller bug.
    #[error("page {position} is already cached")]
    DuplicatePosition {
        /// The cached position that collided with the new page.
        position: u32,
    },

    /// `update` was called with a page object different from the one
    /// cached at that position. The cache never replaces a live entry
    /// in place; indicates a caller bug.
    #[error("update for page {position} does not match the cached entry")]
    ReplaceMismatch {
        /// The position whose cached entry did not match.
        position: u32,
    },

    /// An entry's LRU links were inconsistent when the cache tried to
    /// unlink it, or an unlink targeted a sentinel. Indicates an internal
    /// bug; the cache state must be considered corrupt.
    #[error("entry is not linked into the eviction list")]
    UnlinkViolation,

    /// The writer collaborator failed to persist a page. The failed page
    /// and the rest of its batch remain in the cache; callers must treat
    /// this as fatal to the enclosing transaction.
    #[error("write-back of page {position} failed: {reason}")]
    WriteFailed {
        /// Position of the page whose write-back failed.
        position: u32,
        /// Writer-supplied failure description.
        reason: String,
    },
}
