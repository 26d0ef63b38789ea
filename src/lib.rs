//! # pagecache-rs
//!
//! An embeddable database page cache: an in-memory map from integer page
//! positions to caller-owned page objects, with LRU eviction that
//! cooperates with a write-ahead log and a storage writer.
//!
//! This is the buffer layer that sits between a storage engine's
//! execution paths and its disk format. Compared to a general-purpose LRU
//! map it adds the semantics that layer needs:
//!
//! - **Pinning and log dependencies**: a page whose
//!   [`can_remove`](CachePage::can_remove) is false is never evicted; the
//!   eviction pass rotates it back to the MRU end and, if a whole
//!   traversal finds nothing evictable, asks the writer to flush the log
//!   once before retrying.
//! - **Batched write-back**: dirty pages leave the cache only after the
//!   [`PageWriter`] persists them, in ascending position order for
//!   sequential I/O. Writer re-entrancy is supported: `write_back` may
//!   call back into the cache without triggering nested eviction.
//! - **Second-level retention**: optionally, evicted clean pages are
//!   remembered by a weak or bounded-strong shadow and can be promoted
//!   back on a later `get` ([`RetentionPolicy`]).
//! - **Budgeted memory accounting**: eviction starts when the summed
//!   page sizes reach a configurable budget and aims at 75% of it,
//!   bounded below by an entry floor.
//!
//! ## Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ PageCache                                                        │
//! │   PageTable ── position & mask ──▶ intrusive hash chains         │
//! │   LruList  ── head ◀──▶ MRU … LRU ◀──▶ tail                      │
//! │   MemoryBudget ── quanta / entries / 75% low-water               │
//! │   ShadowCache ── evicted clean pages (None | Weak | Soft)        │
//! └───────────────┬──────────────────────────────────────────────────┘
//!                 │ flush_log / write_back / log_info
//!                 ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ PageWriter (the storage engine; may re-enter the cache)          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each cached page is wrapped in one intrusive node that threads both
//! the hash chain and the LRU list, so every operation is O(1) with a
//! single allocation per page.
//!
//! ## Threading
//!
//! A cache instance is single-writer: it is owned by one logical session
//! and has no internal locks. Sessions that must share an instance wrap
//! it in an external mutex.
//!
//! ## Example
//!
//! ```
//! use core::cell::Cell;
//! use std::rc::Rc;
//! use pagecache_rs::{CachePage, NoopWriter, PageCache, PageCacheConfig};
//!
//! struct Page {
//!     position: u32,
//!     payload: Vec<u8>,
//!     dirty: Cell<bool>,
//! }
//!
//! impl CachePage for Page {
//!     fn position(&self) -> u32 {
//!         self.position
//!     }
//!     fn memory_size(&self) -> u32 {
//!         self.payload.len() as u32
//!     }
//!     fn is_dirty(&self) -> bool {
//!         self.dirty.get()
//!     }
//!     fn can_remove(&self) -> bool {
//!         true
//!     }
//! }
//!
//! let mut cache = PageCache::init(PageCacheConfig::new(1 << 20));
//! let mut writer = NoopWriter;
//!
//! let page = Rc::new(Page {
//!     position: 42,
//!     payload: vec![0u8; 4096],
//!     dirty: Cell::new(false),
//! });
//! cache.put(Rc::clone(&page), &mut writer).unwrap();
//!
//! let hit = cache.get(42, &mut writer).unwrap().unwrap();
//! assert!(Rc::ptr_eq(&hit, &page));
//! ```
//!
//! ## Modules
//!
//! - [`cache`]: the `PageCache` facade
//! - [`page`]: the caller-supplied page contract
//! - [`writer`]: the storage-writer collaborator
//! - [`config`]: construction-time configuration
//! - [`metrics`]: operation counters and reporting
//! - [`error`]: error types

#![cfg_attr(not(feature = "std"), no_std)]

/// The caller-supplied page contract.
pub mod page;

/// The write-through collaborator driven by eviction.
pub mod writer;

/// Error types.
pub mod error;

/// The intrusive cache record shared by the list and the table.
///
/// Internal infrastructure: raw-pointer nodes with manual allocation.
pub(crate) mod node;

/// The LRU list.
///
/// Internal infrastructure: sentinel-delimited doubly linked list over
/// the intrusive nodes, with directional cursors for the eviction walk.
pub(crate) mod list;

/// The position hash table.
///
/// Internal infrastructure: fixed bucket array with intrusive chains.
pub(crate) mod table;

/// Memory accounting against the configured budget.
pub(crate) mod budget;

/// Cache configuration.
pub mod config;

/// The page cache facade.
pub mod cache;

/// Eviction and write-back (implementation of the engine half of
/// `PageCache`).
mod evict;

/// Second-level retention for evicted clean pages.
pub(crate) mod shadow;

/// Cache metrics.
pub mod metrics;

// Re-export the public surface at the crate root.
pub use cache::PageCache;
pub use config::{PageCacheConfig, RetentionPolicy, DEFAULT_MIN_RECORDS};
pub use error::CacheError;
pub use metrics::{CacheMetrics, PageCacheMetrics};
pub use page::CachePage;
pub use writer::{NoopWriter, PageWriter};
