//! The LRU list.
//!
//! A doubly linked list over [`PageNode`]s with sentinel (sigil) nodes at
//! both ends. The most-recently-used page sits just after the head
//! sentinel; the least-recently-used page sits just before the tail
//! sentinel. Eviction walks from the LRU end toward the MRU end, so the
//! list exposes directional cursors in addition to the usual push/unlink
//! operations.
//!
//! ```text
//!  head ◀──▶ MRU ◀──▶ ... ◀──▶ LRU ◀──▶ tail
//! ```
//!
//! Every node is in the list exactly once or not at all; both link fields
//! are nulled on unlink. That makes a double unlink (or an unlink of a
//! node that was never pushed) detectable, and it keeps no stale
//! references alive through dead links.

extern crate alloc;

use core::fmt;
use core::ptr;

use alloc::boxed::Box;

use crate::error::CacheError;
use crate::node::PageNode;

/// Doubly linked LRU list with sentinel nodes.
///
/// The list does not allocate page nodes (the cache does), but it frees
/// them on [`clear`](LruList::clear) and on drop, since at that point it
/// is the last structure referencing them.
pub(crate) struct LruList<P> {
    /// Number of linked page nodes (sentinels excluded).
    len: usize,
    /// Sentinel before the MRU end.
    head: *mut PageNode<P>,
    /// Sentinel after the LRU end.
    tail: *mut PageNode<P>,
}

impl<P> LruList<P> {
    /// Creates an empty list: two sigils linked to each other.
    pub(crate) fn new() -> LruList<P> {
        let head = Box::into_raw(Box::new(PageNode::new_sigil()));
        let tail = Box::into_raw(Box::new(PageNode::new_sigil()));

        // SAFETY: head and tail are newly allocated and valid pointers.
        unsafe {
            (*head).next = tail;
            (*tail).prev = head;
        }

        LruList { len: 0, head, tail }
    }

    /// Returns the number of linked page nodes.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn is_sentinel(&self, node: *mut PageNode<P>) -> bool {
        node == self.head || node == self.tail
    }

    /// Links a node at the MRU end.
    ///
    /// # Safety
    ///
    /// `node` must be a valid non-sigil node that is not currently linked
    /// into any list (both LRU link fields null).
    pub(crate) unsafe fn push_front(&mut self, node: *mut PageNode<P>) {
        // SAFETY: head is a valid sentinel and the caller guarantees node
        // is valid and unlinked.
        unsafe {
            debug_assert!((*node).prev.is_null() && (*node).next.is_null());
            (*node).next = (*self.head).next;
            (*node).prev = self.head;
            (*(*node).next).prev = node;
            (*self.head).next = node;
        }
        self.len += 1;
    }

    /// Unlinks a node and clears both of its LRU link fields.
    ///
    /// Fails with [`CacheError::UnlinkViolation`] if the node is a
    /// sentinel or its links are already null; either means the cache's
    /// structures have diverged and must not be trusted further.
    ///
    /// # Safety
    ///
    /// `node` must be a valid pointer to a node owned by this cache.
    pub(crate) unsafe fn unlink(&mut self, node: *mut PageNode<P>) -> Result<(), CacheError> {
        if node.is_null() || self.is_sentinel(node) {
            return Err(CacheError::UnlinkViolation);
        }
        // SAFETY: caller guarantees node is valid; a linked node's prev
        // and next are valid neighbours.
        unsafe {
            if (*node).prev.is_null() || (*node).next.is_null() {
                return Err(CacheError::UnlinkViolation);
            }
            (*(*node).prev).next = (*node).next;
            (*(*node).next).prev = (*node).prev;
            (*node).prev = ptr::null_mut();
            (*node).next = ptr::null_mut();
        }
        self.len -= 1;
        Ok(())
    }

    /// Moves a linked node to the MRU end (a "touch").
    ///
    /// # Safety
    ///
    /// `node` must be a valid non-sigil node currently linked in this list.
    pub(crate) unsafe fn move_to_front(&mut self, node: *mut PageNode<P>) {
        // SAFETY: head is a valid sentinel.
        if unsafe { (*self.head).next } == node {
            return;
        }
        // SAFETY: caller guarantees node is linked, so both neighbours are
        // valid; detach then reattach at the front without touching len.
        unsafe {
            (*(*node).prev).next = (*node).next;
            (*(*node).next).prev = (*node).prev;
            (*node).next = (*self.head).next;
            (*node).prev = self.head;
            (*(*node).next).prev = node;
            (*self.head).next = node;
        }
    }

    /// Returns the LRU-end node, or null if the list is empty.
    pub(crate) fn lru_end(&self) -> *mut PageNode<P> {
        // SAFETY: tail is a valid sentinel whose prev is always valid.
        let prev = unsafe { (*self.tail).prev };
        if prev == self.head {
            ptr::null_mut()
        } else {
            prev
        }
    }

    /// Returns the MRU-end node, or null if the list is empty.
    pub(crate) fn mru_end(&self) -> *mut PageNode<P> {
        // SAFETY: head is a valid sentinel whose next is always valid.
        let next = unsafe { (*self.head).next };
        if next == self.tail {
            ptr::null_mut()
        } else {
            next
        }
    }

    /// Steps from `node` one position toward the MRU end; null at the end.
    ///
    /// # Safety
    ///
    /// `node` must be a valid node currently linked in this list.
    pub(crate) unsafe fn toward_mru(&self, node: *mut PageNode<P>) -> *mut PageNode<P> {
        // SAFETY: linked nodes always have a valid prev.
        let prev = unsafe { (*node).prev };
        if prev == self.head {
            ptr::null_mut()
        } else {
            prev
        }
    }

    /// Steps from `node` one position toward the LRU end; null at the end.
    ///
    /// # Safety
    ///
    /// `node` must be a valid node currently linked in this list.
    pub(crate) unsafe fn toward_lru(&self, node: *mut PageNode<P>) -> *mut PageNode<P> {
        // SAFETY: linked nodes always have a valid next.
        let next = unsafe { (*node).next };
        if next == self.tail {
            ptr::null_mut()
        } else {
            next
        }
    }

    /// Unlinks and frees every page node, dropping the pages they hold.
    ///
    /// The sentinels are reset to the empty self-loop.
    pub(crate) fn clear(&mut self) {
        // SAFETY: walk the chain of linked nodes from the head sentinel;
        // each node is freed exactly once and never revisited.
        unsafe {
            let mut cursor = (*self.head).next;
            while cursor != self.tail {
                let next = (*cursor).next;
                drop(PageNode::free(cursor));
                cursor = next;
            }
            (*self.head).next = self.tail;
            (*self.tail).prev = self.head;
        }
        self.len = 0;
    }
}

impl<P> Drop for LruList<P> {
    fn drop(&mut self) {
        self.clear();
        // SAFETY: head and tail are the sigils allocated in `new` and are
        // freed exactly once here.
        unsafe {
            PageNode::free_sigil(self.head);
            PageNode::free_sigil(self.tail);
        }
    }
}

impl<P> fmt::Debug for LruList<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruList").field("len", &self.len).finish()
    }
}
