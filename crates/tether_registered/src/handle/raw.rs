use core::cell::{Ref, RefMut};
use core::ptr::NonNull;

use crate::error::{AccessError, NullReferenceError};
use crate::node::InvalidationNode;
use crate::tracked::{Tracked, TrackedInner};

// -----------------------------------------------------------------------------
// RawHandle

/// The state shared by every handle kind.
///
/// While `node` is linked, `target` is the live object it was linked to.
/// Once the node has been invalidated, `target` is stale and never read.
pub struct RawHandle<V> {
    node: InvalidationNode,
    target: Option<NonNull<TrackedInner<V>>>,
}

impl<V> RawHandle<V> {
    #[inline]
    pub(crate) fn null() -> Self {
        Self {
            node: InvalidationNode::new(),
            target: None,
        }
    }

    #[inline]
    pub(crate) fn new(tracked: &Tracked<V>) -> Self {
        let mut raw = Self::null();
        raw.link(tracked.inner());
        raw
    }

    /// Registers with `inner`. The handle must be unlinked.
    fn link(&mut self, inner: &TrackedInner<V>) {
        inner.list.register(&self.node);
        self.target = Some(NonNull::from(inner));
    }

    /// Unregisters from the current target, if any.
    pub(crate) fn unlink(&mut self) {
        if let Some(inner) = self.inner() {
            inner.list.unregister(&self.node);
        }
        self.target = None;
    }

    pub(crate) fn retarget(&mut self, target: Option<&Tracked<V>>) {
        self.unlink();
        if let Some(tracked) = target {
            self.link(tracked.inner());
        }
    }

    #[inline]
    pub(crate) fn inner(&self) -> Option<&TrackedInner<V>> {
        let target = self.target?;
        if !self.node.is_linked() {
            return None;
        }
        // SAFETY: a linked node means the target has not been invalidated,
        // and the block is only freed after invalidation.
        Some(unsafe { target.as_ref() })
    }

    /// The address of the live target, if any.
    #[inline]
    pub(crate) fn target(&self) -> Option<NonNull<TrackedInner<V>>> {
        self.inner().map(NonNull::from)
    }

    #[inline]
    pub(crate) fn is_null(&self) -> bool {
        self.inner().is_none()
    }

    #[inline]
    pub(crate) fn node(&self) -> &InvalidationNode {
        &self.node
    }

    pub(crate) fn borrow(&self) -> Result<Ref<'_, V>, NullReferenceError> {
        let inner = self.inner().ok_or_else(NullReferenceError::of::<V>)?;
        Ok(inner.value.borrow())
    }

    pub(crate) fn borrow_mut(&self) -> Result<RefMut<'_, V>, NullReferenceError> {
        let inner = self.inner().ok_or_else(NullReferenceError::of::<V>)?;
        Ok(inner.value.borrow_mut())
    }

    pub(crate) fn try_borrow(&self) -> Result<Ref<'_, V>, AccessError> {
        let inner = self.inner().ok_or_else(NullReferenceError::of::<V>)?;
        Ok(inner.value.try_borrow()?)
    }

    pub(crate) fn try_borrow_mut(&self) -> Result<RefMut<'_, V>, AccessError> {
        let inner = self.inner().ok_or_else(NullReferenceError::of::<V>)?;
        Ok(inner.value.try_borrow_mut()?)
    }
}

impl<V> Clone for RawHandle<V> {
    fn clone(&self) -> Self {
        let mut raw = Self::null();
        if let Some(inner) = self.inner() {
            raw.link(inner);
        }
        raw
    }
}

impl<V> Drop for RawHandle<V> {
    #[inline]
    fn drop(&mut self) {
        self.unlink();
    }
}
