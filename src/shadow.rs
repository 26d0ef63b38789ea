//! The second-level shadow.
//!
//! When the primary cache evicts a *clean* page, the shadow may keep a way
//! back to it so that a later `get` can promote the page instead of
//! rereading it from storage. Dirty pages are never shadowed; they leave
//! the cache only through write-back.
//!
//! Two retention flavours are offered (see
//! [`RetentionPolicy`](crate::RetentionPolicy)):
//!
//! - **Weak** keeps `rc::Weak` handles. Recovery succeeds only while some
//!   caller still holds a strong handle to the evicted page; the shadow
//!   itself never keeps a page alive. Dead handles are swept
//!   opportunistically.
//! - **Soft** keeps strong handles in a bounded tier with its own memory
//!   ceiling, released oldest-first when the tier runs over. This stands
//!   in for runtime-reclaimed soft references on a host without a garbage
//!   collector.

extern crate alloc;

use alloc::collections::VecDeque;
use alloc::rc::{Rc, Weak};
use core::fmt;

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
extern crate std;
#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

use crate::config::RetentionPolicy;
use crate::page::CachePage;

/// Sweep dead weak handles once per this many inserts.
const WEAK_SWEEP_INTERVAL: u64 = 64;

enum Store<P> {
    Disabled,
    Weak {
        map: HashMap<u32, Weak<P>>,
        inserts: u64,
    },
    Soft {
        map: HashMap<u32, Rc<P>>,
        /// Release order: exactly the live keys, oldest shadowing first.
        /// `take` and re-shadowing both drop a key's old slot.
        order: VecDeque<u32>,
        current: u64,
        max: u64,
    },
}

/// Position-keyed retention for evicted clean pages.
pub(crate) struct ShadowCache<P> {
    store: Store<P>,
}

impl<P: CachePage> ShadowCache<P> {
    pub(crate) fn new(policy: RetentionPolicy, max_memory: u64) -> ShadowCache<P> {
        let store = match policy {
            RetentionPolicy::None => Store::Disabled,
            RetentionPolicy::Weak => Store::Weak {
                map: HashMap::new(),
                inserts: 0,
            },
            RetentionPolicy::Soft => Store::Soft {
                map: HashMap::new(),
                order: VecDeque::new(),
                current: 0,
                max: max_memory,
            },
        };
        ShadowCache { store }
    }

    /// Number of shadowed positions. Weak entries count even when their
    /// handle has died and simply not been swept yet.
    pub(crate) fn len(&self) -> usize {
        match &self.store {
            Store::Disabled => 0,
            Store::Weak { map, .. } => map.len(),
            Store::Soft { map, .. } => map.len(),
        }
    }

    /// Records a page the primary just evicted clean.
    pub(crate) fn record_eviction(&mut self, page: &Rc<P>) {
        debug_assert!(!page.is_dirty());
        let position = page.position();
        match &mut self.store {
            Store::Disabled => {}
            Store::Weak { map, inserts } => {
                map.insert(position, Rc::downgrade(page));
                *inserts += 1;
                if *inserts % WEAK_SWEEP_INTERVAL == 0 {
                    map.retain(|_, handle| handle.strong_count() > 0);
                }
            }
            Store::Soft {
                map,
                order,
                current,
                max,
            } => {
                let size = u64::from(page.memory_size());
                if let Some(old) = map.insert(position, Rc::clone(page)) {
                    *current -= u64::from(old.memory_size());
                    order.retain(|p| *p != position);
                }
                order.push_back(position);
                *current += size;
                while *current > *max {
                    let Some(oldest) = order.pop_front() else {
                        break;
                    };
                    if let Some(released) = map.remove(&oldest) {
                        *current -= u64::from(released.memory_size());
                    }
                }
            }
        }
    }

    /// Removes and returns a still-live handle for `position`, if any.
    pub(crate) fn take(&mut self, position: u32) -> Option<Rc<P>> {
        match &mut self.store {
            Store::Disabled => None,
            Store::Weak { map, .. } => map.remove(&position)?.upgrade(),
            Store::Soft {
                map,
                order,
                current,
                ..
            } => {
                let page = map.remove(&position)?;
                order.retain(|p| *p != position);
                *current -= u64::from(page.memory_size());
                Some(page)
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        match &mut self.store {
            Store::Disabled => {}
            Store::Weak { map, inserts } => {
                map.clear();
                *inserts = 0;
            }
            Store::Soft {
                map,
                order,
                current,
                ..
            } => {
                map.clear();
                order.clear();
                *current = 0;
            }
        }
    }
}

impl<P> fmt::Debug for ShadowCache<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let policy = match &self.store {
            Store::Disabled => "None",
            Store::Weak { .. } => "Weak",
            Store::Soft { .. } => "Soft",
        };
        f.debug_struct("ShadowCache")
            .field("policy", &policy)
            .finish()
    }
}
