//! The page cache.
//!
//! `PageCache` maps integer page positions to caller-owned page objects
//! and evicts in least-recently-used order once a memory budget is
//! exceeded. Every cached page is indexed twice through one intrusive
//! node: a hash chain for O(1) position lookup and a doubly linked list
//! for O(1) recency maintenance.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          PageCache                               │
//! │                                                                  │
//! │  PageTable (buckets)            LruList                          │
//! │  ┌────────────────┐            ┌───────────────────────────┐     │
//! │  │ pos & mask ──────────────▶  │ MRU ◀──▶ ... ◀──▶ LRU     │     │
//! │  │ pos & mask ──────────────▶  │  ▲                  │      │     │
//! │  └────────────────┘            │ head              tail    │     │
//! │                                └───────────────────────────┘     │
//! │  MemoryBudget (quanta, entries)      ShadowCache (evicted clean) │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unlike a plain LRU map, eviction here cooperates with a write-ahead
//! log and a storage writer: pinned or log-dependent pages are rotated
//! back to the MRU end instead of being dropped, dirty pages are written
//! back in position order before they leave, and a pass that cannot make
//! progress asks the writer to flush its log once before giving up.
//!
//! # Ownership and threading
//!
//! The cache owns pages as `Rc` handles and is single-writer by design:
//! one logical session owns the instance and there are no internal locks.
//! Wrap the cache in an external mutex if it must be shared. Handles
//! returned by `get`/`find` stay valid across later cache operations, but
//! recency only tracks calls made through the cache.
//!
//! # Example
//!
//! ```
//! use core::cell::Cell;
//! use std::rc::Rc;
//! use pagecache_rs::{CachePage, NoopWriter, PageCache, PageCacheConfig};
//!
//! struct Page {
//!     position: u32,
//!     size: u32,
//! }
//!
//! impl CachePage for Page {
//!     fn position(&self) -> u32 {
//!         self.position
//!     }
//!     fn memory_size(&self) -> u32 {
//!         self.size
//!     }
//!     fn is_dirty(&self) -> bool {
//!         false
//!     }
//!     fn can_remove(&self) -> bool {
//!         true
//!     }
//! }
//!
//! let mut config = PageCacheConfig::new(100);
//! config.min_records = 0;
//! let mut cache = PageCache::init(config);
//! let mut writer = NoopWriter;
//!
//! for position in 1..=4 {
//!     let page = Rc::new(Page { position, size: 30 });
//!     cache.put(page, &mut writer).unwrap();
//! }
//!
//! // 120 quanta exceeded the budget of 100; the LRU pages were evicted
//! // until usage fell below 75% of the budget.
//! assert!(cache.find(1).is_none());
//! assert!(cache.find(4).is_some());
//! assert!(cache.current_memory() <= 75);
//! ```

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::budget::MemoryBudget;
use crate::config::PageCacheConfig;
use crate::error::CacheError;
use crate::list::LruList;
use crate::metrics::{CacheMetrics, PageCacheMetrics};
use crate::node::PageNode;
use crate::page::CachePage;
use crate::shadow::ShadowCache;
use crate::table::PageTable;
use crate::writer::PageWriter;

/// An LRU page cache with pinning, write-back and second-level retention.
///
/// Created from a [`PageCacheConfig`] via [`PageCache::init`]. Operations
/// that can evict (`put`, `update`, `get` through shadow promotion, and
/// `set_max_memory`) take the [`PageWriter`] collaborator explicitly, so
/// the cache itself stays free of I/O concerns.
///
/// # Safety
///
/// The table and list store raw pointers to nodes allocated by this
/// struct. A pointer stays valid from its allocation until the single
/// free on its removal path; each node is reachable through exactly one
/// table chain and one list membership, so no path frees a node the
/// other still uses.
pub struct PageCache<P: CachePage> {
    pub(crate) table: PageTable<P>,
    pub(crate) list: LruList<P>,
    pub(crate) budget: MemoryBudget,
    pub(crate) shadow: ShadowCache<P>,
    pub(crate) metrics: PageCacheMetrics,
    /// Widest `block_count` ever inserted; bounds the backward overlap
    /// scan in `put`. High-water mark, not shrunk by removals.
    pub(crate) widest_block: u32,
}

impl<P: CachePage> PageCache<P> {
    /// Creates a cache from its configuration.
    ///
    /// The hash bucket array is sized from `config.max_memory` once and
    /// for all; later budget changes do not resize it.
    pub fn init(config: PageCacheConfig) -> PageCache<P> {
        PageCache {
            table: PageTable::with_budget(config.max_memory),
            list: LruList::new(),
            budget: MemoryBudget::new(config.max_memory, config.min_records),
            shadow: ShadowCache::new(config.retention, config.shadow_max_memory),
            metrics: PageCacheMetrics::default(),
            widest_block: 1,
        }
    }

    /// Returns the number of cached pages.
    #[inline]
    pub fn len(&self) -> usize {
        self.budget.entries()
    }

    /// Returns `true` if the cache holds no pages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.budget.entries() == 0
    }

    /// Returns the summed memory estimate of all cached pages, in quanta.
    #[inline]
    pub fn current_memory(&self) -> u64 {
        self.budget.current()
    }

    /// Returns the memory budget, in quanta.
    #[inline]
    pub fn max_memory(&self) -> u64 {
        self.budget.max()
    }

    /// Returns the fixed hash bucket count.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Returns the operation counters.
    #[inline]
    pub fn cache_metrics(&self) -> &PageCacheMetrics {
        &self.metrics
    }

    /// Inserts a page the cache does not yet hold.
    ///
    /// The page enters at the MRU end. If its block range
    /// `[position, position + block_count)` collides with a cached page
    /// the call fails with [`CacheError::DuplicatePosition`]: `put` is
    /// for new pages only; use [`update`](PageCache::update) to touch a
    /// page that may already be cached.
    ///
    /// Inserting may push the cache over budget, in which case an
    /// eviction pass runs before returning and may call into `writer`.
    pub fn put(&mut self, page: Rc<P>, writer: &mut dyn PageWriter<P>) -> Result<(), CacheError> {
        let position = page.position();
        let blocks = page.block_count();
        debug_assert!(blocks >= 1);
        self.check_overlap(position, blocks)?;

        let size = u64::from(page.memory_size());
        let node = PageNode::allocate(page);
        // SAFETY: node is freshly allocated, unlinked and unchained, and
        // the overlap check above ruled out a duplicate position.
        unsafe {
            self.table.insert(node);
            self.list.push_front(node);
        }
        self.widest_block = self.widest_block.max(blocks);
        self.budget.record_insert(size);
        self.metrics.record_insertion(size);

        self.evict_if_over_budget(writer)
    }

    /// Rejects a new range `[position, position + blocks)` that overlaps
    /// any cached entry, in either direction: an existing head inside the
    /// new range, or an earlier wide entry whose own range reaches into
    /// it.
    fn check_overlap(&self, position: u32, blocks: u32) -> Result<(), CacheError> {
        for covered in position..position.saturating_add(blocks) {
            if !self.table.find(covered).is_null() {
                return Err(CacheError::DuplicatePosition { position: covered });
            }
        }
        // An entry starting `back` positions earlier reaches `position`
        // only if its block count exceeds `back`; nothing cached is wider
        // than `widest_block`.
        for back in 1..self.widest_block {
            let Some(earlier) = position.checked_sub(back) else {
                break;
            };
            let node = self.table.find(earlier);
            if node.is_null() {
                continue;
            }
            // SAFETY: node comes from our table.
            if unsafe { (*node).page().block_count() } > back {
                return Err(CacheError::DuplicatePosition { position: earlier });
            }
        }
        Ok(())
    }

    /// Touches the cached page at `position`, or inserts `page` if the
    /// position is absent.
    ///
    /// When the position is present, `page` must be the very object that
    /// is cached there (`Rc::ptr_eq`); the cache never replaces a live
    /// entry in place, and a mismatch fails with
    /// [`CacheError::ReplaceMismatch`].
    pub fn update(
        &mut self,
        position: u32,
        page: Rc<P>,
        writer: &mut dyn PageWriter<P>,
    ) -> Result<(), CacheError> {
        let node = self.table.find(position);
        if node.is_null() {
            return self.put(page, writer);
        }
        // SAFETY: node comes from our table.
        unsafe {
            if !Rc::ptr_eq((*node).page(), &page) {
                return Err(CacheError::ReplaceMismatch { position });
            }
            self.list.move_to_front(node);
        }
        Ok(())
    }

    /// Looks up a page and touches it.
    ///
    /// On a primary miss the second-level shadow is consulted; a page
    /// recovered from it is promoted back into the cache (which may in
    /// turn evict) before being returned.
    pub fn get(
        &mut self,
        position: u32,
        writer: &mut dyn PageWriter<P>,
    ) -> Result<Option<Rc<P>>, CacheError> {
        let node = self.table.find(position);
        if !node.is_null() {
            // SAFETY: node comes from our table.
            let page = unsafe {
                self.list.move_to_front(node);
                Rc::clone((*node).page())
            };
            self.metrics.record_hit();
            return Ok(Some(page));
        }
        self.metrics.record_miss();

        match self.shadow.take(position) {
            Some(page) => {
                self.metrics.record_shadow_hit();
                self.put(Rc::clone(&page), writer)?;
                Ok(Some(page))
            }
            None => Ok(None),
        }
    }

    /// Looks up a page without touching it. Pure read: no LRU movement,
    /// no shadow consultation, no metrics.
    pub fn find(&self, position: u32) -> Option<Rc<P>> {
        let node = self.table.find(position);
        if node.is_null() {
            None
        } else {
            // SAFETY: node comes from our table.
            Some(unsafe { Rc::clone((*node).page()) })
        }
    }

    /// Removes the page at `position` and returns it; `Ok(None)` if the
    /// position is not cached. Explicitly removed pages are not shadowed.
    pub fn remove(&mut self, position: u32) -> Result<Option<Rc<P>>, CacheError> {
        let node = self.table.remove(position);
        if node.is_null() {
            return Ok(None);
        }
        // SAFETY: the node was chained in our table, so it is also linked
        // in our list; it is freed exactly once, after unchaining and
        // unlinking.
        let page = unsafe {
            self.list.unlink(node)?;
            PageNode::free(node)
        };
        self.budget.record_remove(u64::from(page.memory_size()));
        self.metrics.record_eviction();
        Ok(Some(page))
    }

    /// Drops every cached page and everything in the shadow, resetting
    /// the accounting to empty. The bucket array is kept (it is sized for
    /// the cache's lifetime); the operation counters are kept as well.
    pub fn clear(&mut self) {
        self.list.clear();
        self.table.clear();
        self.budget.reset();
        self.shadow.clear();
        self.widest_block = 1;
    }

    /// Replaces the memory budget.
    ///
    /// The bucket array is not resized. If current usage exceeds the new
    /// budget an eviction pass runs immediately; raising the budget never
    /// evicts.
    pub fn set_max_memory(
        &mut self,
        max_memory: u64,
        writer: &mut dyn PageWriter<P>,
    ) -> Result<(), CacheError> {
        self.budget.set_max(max_memory);
        self.evict_if_over_budget(writer)
    }

    /// Returns every dirty page, most recently used first.
    ///
    /// Used by the enclosing engine to drive checkpoints; the cache
    /// itself does not write pages outside eviction.
    pub fn all_dirty(&self) -> Vec<Rc<P>> {
        let mut dirty = Vec::new();
        let mut cursor = self.list.mru_end();
        while !cursor.is_null() {
            // SAFETY: cursor walks the nodes linked in our list.
            unsafe {
                let page = (*cursor).page();
                if page.is_dirty() {
                    dirty.push(Rc::clone(page));
                }
                cursor = self.list.toward_lru(cursor);
            }
        }
        dirty
    }

    /// Returns every cached position, most recently used first.
    pub fn positions(&self) -> Vec<u32> {
        let mut positions = Vec::new();
        let mut cursor = self.list.mru_end();
        while !cursor.is_null() {
            // SAFETY: cursor walks the nodes linked in our list.
            unsafe {
                positions.push((*cursor).page().position());
                cursor = self.list.toward_lru(cursor);
            }
        }
        positions
    }

    /// Checks the structural invariants: every page is in the list
    /// exactly once and findable through its bucket, and the accounting
    /// matches the structures.
    #[cfg(test)]
    pub(crate) fn validate(&self) {
        assert_eq!(self.list.len(), self.budget.entries());
        assert_eq!(self.table.chained_len(), self.budget.entries());

        let mut total_memory = 0u64;
        let mut counted = 0usize;
        let mut cursor = self.list.mru_end();
        while !cursor.is_null() {
            unsafe {
                let page = (*cursor).page();
                total_memory += u64::from(page.memory_size());
                counted += 1;
                assert_eq!(self.table.find(page.position()), cursor);
                cursor = self.list.toward_lru(cursor);
            }
        }
        assert_eq!(counted, self.budget.entries());
        assert_eq!(total_memory, self.budget.current());
    }
}

impl<P: CachePage> CacheMetrics for PageCache<P> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.metrics.to_btreemap();
        metrics.insert(String::from("current_memory"), self.budget.current() as f64);
        metrics.insert(String::from("max_memory"), self.budget.max() as f64);
        metrics.insert(String::from("entries"), self.budget.entries() as f64);
        metrics
    }

    fn algorithm_name(&self) -> &'static str {
        "LRU"
    }
}

impl<P: CachePage> fmt::Debug for PageCache<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageCache")
            .field("entries", &self.budget.entries())
            .field("current_memory", &self.budget.current())
            .field("max_memory", &self.budget.max())
            .field("buckets", &self.table.bucket_count())
            .finish()
    }
}
