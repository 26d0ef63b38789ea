//! The caller-supplied page contract.
//!
//! The cache stores opaque page objects and consults them through this
//! trait. It reads `is_dirty` and `can_remove` but never writes them: the
//! storage engine that owns the page decides when a page becomes dirty and
//! when a successful write-back marks it clean again. Page types that need
//! the writer to flip those flags through a shared handle use interior
//! mutability (`core::cell::Cell`); the cache does not care how the flags
//! are tracked.
//!
//! # Example
//!
//! ```
//! use core::cell::Cell;
//! use pagecache_rs::CachePage;
//!
//! struct DataPage {
//!     position: u32,
//!     bytes: Vec<u8>,
//!     dirty: Cell<bool>,
//!     pinned: Cell<bool>,
//! }
//!
//! impl CachePage for DataPage {
//!     fn position(&self) -> u32 {
//!         self.position
//!     }
//!
//!     fn memory_size(&self) -> u32 {
//!         self.bytes.len() as u32
//!     }
//!
//!     fn is_dirty(&self) -> bool {
//!         self.dirty.get()
//!     }
//!
//!     fn can_remove(&self) -> bool {
//!         !self.pinned.get()
//!     }
//! }
//! ```

/// A cacheable page.
///
/// Implemented by the caller; the cache takes ownership of pages as
/// `Rc<P>` handles on [`put`](crate::PageCache::put) and hands cloned
/// handles back out on [`get`](crate::PageCache::get) /
/// [`find`](crate::PageCache::find).
pub trait CachePage {
    /// The integer key identifying this page. Doubles as the hash key and
    /// as the sort key when dirty pages are written back in batch.
    fn position(&self) -> u32;

    /// Number of contiguous positions this page occupies, at least 1.
    ///
    /// The cache rejects a `put` whose range
    /// `[position, position + block_count)` collides with a cached page.
    fn block_count(&self) -> u32 {
        1
    }

    /// Memory estimate for this page, in the same quanta as the cache's
    /// configured budget.
    fn memory_size(&self) -> u32;

    /// Whether the page's payload differs from the persisted copy.
    ///
    /// Dirty pages are written back before eviction and are never handed
    /// to the second-level shadow.
    fn is_dirty(&self) -> bool;

    /// Whether the page may be evicted at all.
    ///
    /// Returns `false` while the page is pinned by the caller or while its
    /// write-ahead-log record has not yet been persisted. Unremovable
    /// pages are rotated to the MRU end instead of being evicted.
    fn can_remove(&self) -> bool;
}
