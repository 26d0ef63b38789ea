//! Cache configuration.
//!
//! All construction parameters live in one struct with public fields, and
//! the cache is created from it with [`PageCache::init`](crate::PageCache::init).
//! [`PageCacheConfig::new`] fills in the defaults for everything except
//! the budget, so the common cases read as either
//!
//! ```
//! use pagecache_rs::PageCacheConfig;
//!
//! let config = PageCacheConfig::new(1 << 20);
//! ```
//!
//! or a struct literal when every knob matters:
//!
//! ```
//! use pagecache_rs::{PageCacheConfig, RetentionPolicy};
//!
//! let config = PageCacheConfig {
//!     max_memory: 1 << 20,
//!     min_records: 64,
//!     retention: RetentionPolicy::Soft,
//!     shadow_max_memory: 1 << 18,
//! };
//! ```

use core::fmt;

/// How evicted clean pages are retained by the second-level shadow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// No second level; evicted pages are simply dropped.
    #[default]
    None,
    /// Keep weak handles. An evicted page is recoverable only while some
    /// caller still holds a strong handle to it; the shadow never extends
    /// a page's lifetime.
    Weak,
    /// Keep strong handles in a bounded second tier with its own memory
    /// ceiling, released oldest-first under pressure.
    Soft,
}

/// Construction-time parameters for a [`PageCache`](crate::PageCache).
#[derive(Clone, Copy)]
pub struct PageCacheConfig {
    /// Memory budget in the same quanta as the pages' `memory_size`.
    ///
    /// Also determines the hash bucket count, which is fixed for the
    /// cache's lifetime; pick the initial budget within an order of
    /// magnitude of the steady state.
    pub max_memory: u64,

    /// Eviction never shrinks the cache below this many entries.
    /// Prevents a small or zero budget from thrashing the cache empty.
    pub min_records: usize,

    /// Second-level retention for evicted clean pages.
    pub retention: RetentionPolicy,

    /// Memory ceiling for the [`RetentionPolicy::Soft`] tier, in quanta.
    /// Ignored by the other policies.
    pub shadow_max_memory: u64,
}

/// Default entry floor during eviction.
pub const DEFAULT_MIN_RECORDS: usize = 16;

impl PageCacheConfig {
    /// Configuration with the given budget and the defaults for the rest:
    /// `min_records = 16`, no retention, and a soft-tier ceiling equal to
    /// the primary budget should retention be switched on.
    pub fn new(max_memory: u64) -> PageCacheConfig {
        PageCacheConfig {
            max_memory,
            min_records: DEFAULT_MIN_RECORDS,
            retention: RetentionPolicy::None,
            shadow_max_memory: max_memory,
        }
    }
}

impl fmt::Debug for PageCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageCacheConfig")
            .field("max_memory", &self.max_memory)
            .field("min_records", &self.min_records)
            .field("retention", &self.retention)
            .field("shadow_max_memory", &self.shadow_max_memory)
            .finish()
    }
}
