//! The position hash table.
//!
//! An open bucket array indexed by `position & (buckets - 1)`, with each
//! bucket holding a singly linked chain threaded through the nodes' own
//! `chain` slots. No per-entry allocation beyond the node itself and no
//! rehashing: the array is sized once from the initial memory budget and
//! kept for the cache's lifetime, which bounds the worst-case chain length
//! while accepting some degradation if the budget is later raised far
//! beyond its initial order of magnitude.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::ptr;

use crate::node::PageNode;
use crate::page::CachePage;

/// Fewest buckets worth allocating, even for tiny budgets.
const MIN_BUCKETS: u64 = 16;
/// Most buckets the initial sizing will allocate.
const MAX_BUCKETS: u64 = 1 << 20;

/// Bucket array with intrusive per-bucket chains.
pub(crate) struct PageTable<P> {
    buckets: Vec<*mut PageNode<P>>,
    mask: usize,
}

impl<P: CachePage> PageTable<P> {
    /// Allocates the bucket array for a cache with the given budget.
    ///
    /// One bucket per 64 quanta of budget, rounded up to a power of two,
    /// aims at chains of a handful of entries when pages average a few
    /// hundred quanta. The array is never resized afterwards.
    pub(crate) fn with_budget(max_memory: u64) -> PageTable<P> {
        let buckets = (max_memory / 64)
            .clamp(MIN_BUCKETS, MAX_BUCKETS)
            .next_power_of_two() as usize;
        PageTable {
            buckets: vec![ptr::null_mut(); buckets],
            mask: buckets - 1,
        }
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn index(&self, position: u32) -> usize {
        position as usize & self.mask
    }

    /// Prepends a node to its bucket's chain.
    ///
    /// # Safety
    ///
    /// `node` must be a valid non-sigil node that is not currently in any
    /// chain (its `chain` slot null), and no node with the same position
    /// may already be present.
    pub(crate) unsafe fn insert(&mut self, node: *mut PageNode<P>) {
        // SAFETY: caller guarantees node is valid and unchained.
        unsafe {
            debug_assert!((*node).chain.is_null());
            let index = self.index((*node).page().position());
            (*node).chain = self.buckets[index];
            self.buckets[index] = node;
        }
    }

    /// Finds the node cached at `position`, or null.
    pub(crate) fn find(&self, position: u32) -> *mut PageNode<P> {
        let mut cursor = self.buckets[self.index(position)];
        while !cursor.is_null() {
            // SAFETY: chained nodes are valid non-sigil nodes owned by
            // this cache.
            unsafe {
                if (*cursor).page().position() == position {
                    return cursor;
                }
                cursor = (*cursor).chain;
            }
        }
        ptr::null_mut()
    }

    /// Unchains and returns the node at `position`, or null if absent.
    ///
    /// The returned node's `chain` slot is cleared; the node itself is not
    /// freed.
    pub(crate) fn remove(&mut self, position: u32) -> *mut PageNode<P> {
        let index = self.index(position);
        let mut cursor = self.buckets[index];
        let mut prev: *mut PageNode<P> = ptr::null_mut();
        while !cursor.is_null() {
            // SAFETY: chained nodes are valid; prev is either null or the
            // node whose chain slot points at cursor.
            unsafe {
                if (*cursor).page().position() == position {
                    if prev.is_null() {
                        self.buckets[index] = (*cursor).chain;
                    } else {
                        (*prev).chain = (*cursor).chain;
                    }
                    (*cursor).chain = ptr::null_mut();
                    return cursor;
                }
                prev = cursor;
                cursor = (*cursor).chain;
            }
        }
        ptr::null_mut()
    }

    /// Empties every bucket. The nodes themselves are freed elsewhere.
    pub(crate) fn clear(&mut self) {
        for bucket in &mut self.buckets {
            *bucket = ptr::null_mut();
        }
    }

    /// Sum of all chain lengths. Used by consistency checks.
    #[cfg(test)]
    pub(crate) fn chained_len(&self) -> usize {
        let mut total = 0;
        for &bucket in &self.buckets {
            let mut cursor = bucket;
            while !cursor.is_null() {
                total += 1;
                // SAFETY: chained nodes are valid.
                cursor = unsafe { (*cursor).chain };
            }
        }
        total
    }
}

impl<P> fmt::Debug for PageTable<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTable")
            .field("buckets", &self.buckets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;

    struct Stub(u32);

    impl CachePage for Stub {
        fn position(&self) -> u32 {
            self.0
        }
        fn memory_size(&self) -> u32 {
            1
        }
        fn is_dirty(&self) -> bool {
            false
        }
        fn can_remove(&self) -> bool {
            true
        }
    }

    fn node(position: u32) -> *mut PageNode<Stub> {
        PageNode::allocate(Rc::new(Stub(position)))
    }

    fn free(n: *mut PageNode<Stub>) {
        drop(unsafe { PageNode::free(n) });
    }

    #[test]
    fn test_bucket_sizing_is_power_of_two() {
        let table: PageTable<Stub> = PageTable::with_budget(0);
        assert_eq!(table.bucket_count(), 16);

        let table: PageTable<Stub> = PageTable::with_budget(64 * 1000);
        assert_eq!(table.bucket_count(), 1024);
        assert!(table.bucket_count().is_power_of_two());

        let table: PageTable<Stub> = PageTable::with_budget(u64::MAX);
        assert_eq!(table.bucket_count(), 1 << 20);
    }

    #[test]
    fn test_insert_find_remove() {
        let mut table = PageTable::with_budget(0);
        let a = node(1);
        let b = node(2);
        unsafe {
            table.insert(a);
            table.insert(b);
        }
        assert_eq!(table.find(1), a);
        assert_eq!(table.find(2), b);
        assert!(table.find(3).is_null());

        assert_eq!(table.remove(1), a);
        assert!(table.find(1).is_null());
        assert_eq!(table.find(2), b);
        assert!(table.remove(1).is_null());

        free(a);
        assert_eq!(table.remove(2), b);
        free(b);
        assert_eq!(table.chained_len(), 0);
    }

    #[test]
    fn test_colliding_positions_share_a_bucket() {
        // 16 buckets: positions 5, 21 and 37 all land in bucket 5.
        let mut table = PageTable::with_budget(0);
        let a = node(5);
        let b = node(21);
        let c = node(37);
        unsafe {
            table.insert(a);
            table.insert(b);
            table.insert(c);
        }
        assert_eq!(table.chained_len(), 3);
        assert_eq!(table.find(5), a);
        assert_eq!(table.find(21), b);
        assert_eq!(table.find(37), c);

        // Removing from the middle of the chain relinks around it.
        assert_eq!(table.remove(21), b);
        unsafe {
            assert!((*b).chain.is_null());
        }
        assert_eq!(table.find(5), a);
        assert_eq!(table.find(37), c);
        assert_eq!(table.chained_len(), 2);

        free(b);
        assert_eq!(table.remove(5), a);
        free(a);
        assert_eq!(table.remove(37), c);
        free(c);
    }

    #[test]
    fn test_clear_empties_every_bucket() {
        let mut table = PageTable::with_budget(0);
        let a = node(1);
        let b = node(17);
        unsafe {
            table.insert(a);
            table.insert(b);
        }
        table.clear();
        assert!(table.find(1).is_null());
        assert!(table.find(17).is_null());
        assert_eq!(table.chained_len(), 0);
        // Cleared chain slots are the cache's job; free directly here.
        free(a);
        free(b);
    }
}
