use core::cell::Cell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pagecache_rs::{CachePage, NoopWriter, PageCache, PageCacheConfig};

struct BenchPage {
    position: u32,
    size: u32,
    dirty: Cell<bool>,
}

impl BenchPage {
    fn new(position: u32, size: u32) -> Rc<BenchPage> {
        Rc::new(BenchPage {
            position,
            size,
            dirty: Cell::new(false),
        })
    }
}

impl CachePage for BenchPage {
    fn position(&self) -> u32 {
        self.position
    }
    fn memory_size(&self) -> u32 {
        self.size
    }
    fn is_dirty(&self) -> bool {
        self.dirty.get()
    }
    fn can_remove(&self) -> bool {
        true
    }
}

fn make_cache(max_memory: u64) -> PageCache<BenchPage> {
    let mut config = PageCacheConfig::new(max_memory);
    config.min_records = 0;
    PageCache::init(config)
}

pub fn criterion_benchmark(c: &mut Criterion) {
    const PAGES: u32 = 1000;
    const PAGE_SIZE: u32 = 64;
    let mut group = c.benchmark_group("Page Cache Operations");

    {
        // Budget large enough that the working set never evicts.
        let mut cache = make_cache(u64::from(PAGES) * u64::from(PAGE_SIZE) * 2);
        for position in 0..PAGES {
            cache
                .put(BenchPage::new(position, PAGE_SIZE), &mut NoopWriter)
                .unwrap();
        }

        group.bench_function("get hit", |b| {
            b.iter(|| {
                for i in 0..100u32 {
                    black_box(cache.get(i % PAGES, &mut NoopWriter).unwrap());
                }
            });
        });

        group.bench_function("get miss", |b| {
            b.iter(|| {
                for i in 0..100u32 {
                    black_box(cache.get(i + PAGES, &mut NoopWriter).unwrap());
                }
            });
        });

        group.bench_function("find", |b| {
            b.iter(|| {
                for i in 0..100u32 {
                    black_box(cache.find(i % PAGES));
                }
            });
        });
    }

    group.bench_function("put and remove", |b| {
        let mut cache = make_cache(u64::from(PAGES) * u64::from(PAGE_SIZE) * 2);
        let mut next = 0u32;
        b.iter(|| {
            for _ in 0..100 {
                cache
                    .put(BenchPage::new(next, PAGE_SIZE), &mut NoopWriter)
                    .unwrap();
                cache.remove(next).unwrap();
                next = next.wrapping_add(1);
            }
        });
    });

    group.bench_function("put with eviction churn", |b| {
        // Budget worth ~100 pages; every put past the budget evicts.
        let mut cache = make_cache(100 * u64::from(PAGE_SIZE));
        let mut next = 0u32;
        b.iter(|| {
            for _ in 0..100 {
                cache
                    .put(BenchPage::new(next, PAGE_SIZE), &mut NoopWriter)
                    .unwrap();
                next = next.wrapping_add(1);
            }
        });
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
