//! The write-through collaborator.
//!
//! The cache never performs I/O itself. When eviction selects dirty pages,
//! or when a full traversal finds nothing evictable, it drives the owning
//! storage engine through this trait. The collaborator is handed to each
//! cache operation that may evict rather than stored inside the cache:
//! that keeps the cache free of a writer type parameter and makes the
//! single-writer ownership explicit at every call site.

extern crate alloc;

use alloc::rc::Rc;

use crate::cache::PageCache;
use crate::error::CacheError;
use crate::page::CachePage;

/// Storage-engine callbacks used by eviction and write-back.
pub trait PageWriter<P: CachePage> {
    /// Persist the write-ahead log up to the current point.
    ///
    /// Called at most once per eviction pass, when a full traversal found
    /// no evictable page, typically because resident pages are waiting on
    /// their log records. No page is "in flight" when this is called.
    fn flush_log(&mut self) -> Result<(), CacheError>;

    /// Persist one page's payload.
    ///
    /// Invoked for each dirty page of an eviction batch, in ascending
    /// position order. The implementation may re-enter the cache through
    /// `cache` (for example to consult neighbouring pages); eviction is
    /// suppressed for the duration of the batch, so re-entrant operations
    /// cannot recurse into another write-back. On success the writer is
    /// expected to mark the page clean, though the cache does not depend
    /// on it. An error aborts the rest of the batch and propagates.
    fn write_back(&mut self, cache: &mut PageCache<P>, page: &Rc<P>) -> Result<(), CacheError>;

    /// Diagnostic channel for conditions the cache tolerates but wants
    /// reported, such as "cannot evict; budget too small".
    fn log_info(&mut self, _message: &str) {}
}

/// A writer for caches that never hold dirty or log-dependent pages.
///
/// `flush_log` and `write_back` succeed without doing anything, which is
/// correct only when nothing ever needs persisting. Useful for read caches
/// and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWriter;

impl<P: CachePage> PageWriter<P> for NoopWriter {
    fn flush_log(&mut self) -> Result<(), CacheError> {
        Ok(())
    }

    fn write_back(&mut self, _cache: &mut PageCache<P>, _page: &Rc<P>) -> Result<(), CacheError> {
        Ok(())
    }
}
