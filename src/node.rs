//! The intrusive cache record.
//!
//! Each cached page is wrapped in a heap-allocated `PageNode` carrying
//! three link slots: `prev`/`next` thread the node into the LRU list, and
//! `chain` threads it into its hash bucket. Embedding the links in the
//! node keeps every structural operation O(1) without a second allocation
//! per membership. Pure data; all structure manipulation lives in
//! [`list`](crate::list) and [`table`](crate::table).

extern crate alloc;

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::mem;
use core::ptr;

/// A node in the cache: one page handle plus its LRU and hash-chain links.
///
/// Contains the page behind `MaybeUninit` to allow for sigil (sentinel)
/// nodes that carry no page. Not meant to be used outside the crate.
pub(crate) struct PageNode<P> {
    /// The cached page. Uses MaybeUninit to allow for sigil nodes.
    page: mem::MaybeUninit<Rc<P>>,
    /// Pointer to the previous node in the LRU list (toward the MRU end).
    pub(crate) prev: *mut PageNode<P>,
    /// Pointer to the next node in the LRU list (toward the LRU end).
    pub(crate) next: *mut PageNode<P>,
    /// Pointer to the next node in the same hash bucket.
    pub(crate) chain: *mut PageNode<P>,
}

impl<P> PageNode<P> {
    /// Creates a new node holding the given page, with all links null.
    fn new(page: Rc<P>) -> Self {
        PageNode {
            page: mem::MaybeUninit::new(page),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
            chain: ptr::null_mut(),
        }
    }

    /// Creates a new sigil (sentinel) node without initializing the page.
    ///
    /// Sigil nodes are used as the head and tail markers of the LRU list.
    pub(crate) fn new_sigil() -> Self {
        PageNode {
            page: mem::MaybeUninit::uninit(),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
            chain: ptr::null_mut(),
        }
    }

    /// Returns the page handle stored in this node.
    ///
    /// # Safety
    ///
    /// The node must not be a sigil: the page slot must be initialized.
    pub(crate) unsafe fn page(&self) -> &Rc<P> {
        // SAFETY: the caller guarantees this is a non-sigil node, whose
        // page slot was initialized in `new`.
        unsafe { self.page.assume_init_ref() }
    }

    /// Heap-allocates a node for `page` and leaks it as a raw pointer.
    ///
    /// Ownership transfers to the cache structures; the node must later be
    /// released through [`PageNode::free`].
    pub(crate) fn allocate(page: Rc<P>) -> *mut PageNode<P> {
        Box::into_raw(Box::new(PageNode::new(page)))
    }

    /// Deallocates a non-sigil node, returning the page it held.
    ///
    /// # Safety
    ///
    /// `node` must come from [`PageNode::allocate`], must not be a sigil,
    /// and must no longer be linked into the LRU list or a hash chain.
    /// After this call the pointer is dangling.
    pub(crate) unsafe fn free(node: *mut PageNode<P>) -> Rc<P> {
        // SAFETY: the caller guarantees node came from Box::into_raw and
        // is not referenced by any list or chain anymore.
        let boxed = unsafe { Box::from_raw(node) };
        // SAFETY: non-sigil nodes always hold an initialized page.
        unsafe { boxed.page.assume_init() }
    }

    /// Deallocates a sigil node without touching the page slot.
    ///
    /// # Safety
    ///
    /// `node` must be a sigil created by [`PageNode::new_sigil`] and boxed
    /// by the list; the page slot must never have been initialized.
    pub(crate) unsafe fn free_sigil(node: *mut PageNode<P>) {
        // SAFETY: caller guarantees node is a heap-allocated sigil; the
        // uninitialized page slot must not be dropped.
        let _ = unsafe { Box::from_raw(node) };
    }
}
