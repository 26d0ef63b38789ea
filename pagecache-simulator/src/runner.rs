// Trace replay against the page cache

use std::cell::Cell;
use std::rc::Rc;

use ahash::AHashMap;
use pagecache_rs::{
    CacheError, CacheMetrics, CachePage, PageCache, PageCacheConfig, PageWriter, RetentionPolicy,
};

use crate::models::TraceRecord;
use crate::stats::ReplayStats;

/// A simulated data page: position, a payload buffer sized in quanta and
/// the dirty flag the store flips on write-back.
pub struct SimPage {
    position: u32,
    payload: Vec<u8>,
    dirty: Cell<bool>,
}

impl SimPage {
    fn new(position: u32, payload: Vec<u8>) -> Rc<SimPage> {
        Rc::new(SimPage {
            position,
            payload,
            dirty: Cell::new(false),
        })
    }
}

impl CachePage for SimPage {
    fn position(&self) -> u32 {
        self.position
    }
    fn memory_size(&self) -> u32 {
        self.payload.len() as u32
    }
    fn is_dirty(&self) -> bool {
        self.dirty.get()
    }
    fn can_remove(&self) -> bool {
        true
    }
}

/// The simulated storage engine: an in-memory "disk" that counts the I/O
/// the cache asks it to do.
#[derive(Default)]
pub struct SimStore {
    disk: AHashMap<u32, Vec<u8>>,
    pub page_writes: u64,
    pub log_flushes: u64,
    pub info_messages: u64,
}

impl PageWriter<SimPage> for SimStore {
    fn flush_log(&mut self) -> Result<(), CacheError> {
        self.log_flushes += 1;
        Ok(())
    }

    fn write_back(
        &mut self,
        _cache: &mut PageCache<SimPage>,
        page: &Rc<SimPage>,
    ) -> Result<(), CacheError> {
        self.disk.insert(page.position(), page.payload.clone());
        self.page_writes += 1;
        page.dirty.set(false);
        Ok(())
    }

    fn log_info(&mut self, message: &str) {
        self.info_messages += 1;
        eprintln!("cache: {message}");
    }
}

/// Replay parameters.
pub struct ReplayConfig {
    pub max_memory: u64,
    pub min_records: usize,
    pub retention: RetentionPolicy,
}

/// Replays a trace and returns the collected statistics.
///
/// Reads that miss fetch the page from the simulated disk (or fabricate
/// it on first access) and insert it; writes additionally mark the page
/// dirty. Remaining dirty pages are written back at the end, the way a
/// database checkpoint would.
pub fn replay(records: &[TraceRecord], config: &ReplayConfig) -> Result<ReplayStats, CacheError> {
    let cache_config = PageCacheConfig {
        max_memory: config.max_memory,
        min_records: config.min_records,
        retention: config.retention,
        shadow_max_memory: config.max_memory,
    };
    let mut cache: PageCache<SimPage> = PageCache::init(cache_config);
    let mut store = SimStore::default();
    let mut reads = 0u64;
    let mut writes = 0u64;

    for record in records {
        if record.write {
            writes += 1;
        } else {
            reads += 1;
        }

        let page = match cache.get(record.position, &mut store)? {
            Some(page) => page,
            None => {
                // Fetch from the simulated disk, or fabricate the page on
                // its very first access.
                let payload = store
                    .disk
                    .get(&record.position)
                    .cloned()
                    .unwrap_or_else(|| vec![0u8; record.size as usize]);
                let page = SimPage::new(record.position, payload);
                cache.put(Rc::clone(&page), &mut store)?;
                page
            }
        };
        if record.write {
            page.dirty.set(true);
        }
    }

    // Checkpoint: persist whatever is still dirty.
    for page in cache.all_dirty() {
        store.write_back(&mut cache, &page)?;
    }

    let metrics = cache.metrics();
    Ok(ReplayStats {
        requests: reads + writes,
        reads,
        writes,
        hits: metrics["cache_hits"] as u64,
        misses: metrics["cache_misses"] as u64,
        hit_rate: metrics["hit_rate"],
        shadow_hits: metrics["shadow_hits"] as u64,
        evictions: metrics["evictions"] as u64,
        page_writes: store.page_writes,
        log_flushes: store.log_flushes,
        eviction_stalls: metrics["eviction_stalls"] as u64,
        final_entries: cache.len() as u64,
        final_memory: cache.current_memory(),
    })
}
