use alloc::boxed::Box;
use core::any::type_name;
use core::cell::{BorrowError, BorrowMutError, Ref, RefCell, RefMut};
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ptr::NonNull;

use crate::handle::{
    TrackedConstPtr, TrackedFixedConstPtr, TrackedFixedPtr, TrackedNotNullConstPtr,
    TrackedNotNullPtr, TrackedPtr,
};
use crate::list::{ListId, RegistrationList};

// -----------------------------------------------------------------------------
// TrackedInner

/// The heap block shared by a [`Tracked`] and its handles.
pub(crate) struct TrackedInner<V> {
    pub(crate) list: RegistrationList,
    pub(crate) value: RefCell<V>,
}

// -----------------------------------------------------------------------------
// Tracked

/// An owned value that knows every handle pointing at it.
///
/// Handles obtained from a `Tracked` do not keep it alive. When the `Tracked`
/// is dropped, every handle still registered with it is invalidated first and
/// reports null from then on; only then is the value dropped.
///
/// The value and its registration list live in one heap block, so the
/// `Tracked` itself can be moved anywhere without disturbing its handles.
/// Access goes through [`RefCell`] rules, shared with the handles.
///
/// If the value is still borrowed through a handle when the `Tracked` is
/// dropped, the handles are invalidated but the block is leaked.
///
/// # Examples
///
/// ```
/// use tether_registered::Tracked;
///
/// let object = Tracked::new(5);
/// let handle = object.ptr();
/// assert_eq!(*handle.borrow().unwrap(), 5);
///
/// drop(object);
/// assert!(handle.is_null());
/// assert!(handle.borrow().is_err());
/// ```
pub struct Tracked<V> {
    inner: NonNull<TrackedInner<V>>,
    _marker: PhantomData<TrackedInner<V>>,
}

impl<V> Tracked<V> {
    /// Moves `value` into a new tracked block.
    pub fn new(value: V) -> Self {
        let inner = Box::new(TrackedInner {
            list: RegistrationList::new(),
            value: RefCell::new(value),
        });
        Self {
            inner: NonNull::from(Box::leak(inner)),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn inner(&self) -> &TrackedInner<V> {
        // SAFETY: `inner` stays allocated until `self` is dropped.
        unsafe { self.inner.as_ref() }
    }

    /// Gives up ownership of the block without invalidating anything.
    #[inline]
    pub(crate) fn into_raw(self) -> NonNull<TrackedInner<V>> {
        ManuallyDrop::new(self).inner
    }

    /// Takes back ownership of a block released by [`into_raw`](Self::into_raw).
    ///
    /// # Safety
    ///
    /// `inner` must come from `into_raw` and must not be owned by any other
    /// `Tracked`.
    #[inline]
    pub(crate) unsafe fn from_raw(inner: NonNull<TrackedInner<V>>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// The id of this object's registration list.
    ///
    /// The list itself stays private: only the object and the handles that
    /// target it may link or unlink nodes.
    #[inline]
    pub fn list_id(&self) -> ListId {
        self.inner().list.id()
    }

    /// Returns the number of handles currently pointing here.
    #[inline]
    pub fn handle_count(&self) -> usize {
        self.inner().list.len()
    }

    /// Immutably borrows the value.
    ///
    /// # Panics
    ///
    /// If the value is mutably borrowed through a handle.
    #[inline]
    pub fn borrow(&self) -> Ref<'_, V> {
        self.inner().value.borrow()
    }

    /// Mutably borrows the value.
    ///
    /// # Panics
    ///
    /// If the value is borrowed through a handle.
    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, V> {
        self.inner().value.borrow_mut()
    }

    /// Immutably borrows the value, failing instead of panicking.
    ///
    /// # Errors
    ///
    /// [`BorrowError`] if the value is mutably borrowed.
    #[inline]
    pub fn try_borrow(&self) -> Result<Ref<'_, V>, BorrowError> {
        self.inner().value.try_borrow()
    }

    /// Mutably borrows the value, failing instead of panicking.
    ///
    /// # Errors
    ///
    /// [`BorrowMutError`] if the value is borrowed.
    #[inline]
    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, V>, BorrowMutError> {
        self.inner().value.try_borrow_mut()
    }

    /// Replaces the value, returning the old one. Handles observe the change.
    #[inline]
    pub fn replace(&self, value: V) -> V {
        self.inner().value.replace(value)
    }

    /// Replaces the value, dropping the old one.
    #[inline]
    pub fn set(&self, value: V) {
        drop(self.replace(value));
    }

    /// Runs `f` on the value in place.
    #[inline]
    pub fn update<R>(&self, f: impl FnOnce(&mut V) -> R) -> R {
        f(&mut self.borrow_mut())
    }

    /// Invalidates every handle and returns the value.
    ///
    /// # Panics
    ///
    /// If the value is borrowed through a handle. The block is leaked in
    /// that case.
    pub fn into_inner(self) -> V {
        let raw = self.into_raw();
        // SAFETY: `into_raw` handed the block over to this function.
        let inner = unsafe { raw.as_ref() };
        inner.list.invalidate_all();
        assert!(
            inner.value.try_borrow_mut().is_ok(),
            "`Tracked<{}>` consumed while its value is borrowed",
            type_name::<V>(),
        );
        // SAFETY: the block came from `Box::leak` and no handle can reach it.
        let TrackedInner { list, value } = *unsafe { Box::from_raw(raw.as_ptr()) };
        drop(list);
        value.into_inner()
    }

    /// A nullable, retargetable handle with mutable access.
    #[inline]
    pub fn ptr(&self) -> TrackedPtr<V> {
        TrackedPtr::new(self)
    }

    /// A nullable, retargetable handle with shared access only.
    #[inline]
    pub fn const_ptr(&self) -> TrackedConstPtr<V> {
        TrackedConstPtr::new(self)
    }

    /// Creates a not-null handle with mutable access.
    #[inline]
    pub fn not_null_ptr(&self) -> TrackedNotNullPtr<V> {
        TrackedNotNullPtr::new(self)
    }

    /// Creates a not-null handle with shared access.
    #[inline]
    pub fn not_null_const_ptr(&self) -> TrackedNotNullConstPtr<V> {
        TrackedNotNullConstPtr::new(self)
    }

    /// A handle bound to this object for its whole life.
    #[inline]
    pub fn fixed_ptr(&self) -> TrackedFixedPtr<V> {
        TrackedFixedPtr::new(self)
    }

    /// Creates a fixed handle with shared access.
    #[inline]
    pub fn fixed_const_ptr(&self) -> TrackedFixedConstPtr<V> {
        TrackedFixedConstPtr::new(self)
    }
}

impl<V: Copy> Tracked<V> {
    /// Returns a copy of the value.
    #[inline]
    pub fn get(&self) -> V {
        *self.borrow()
    }
}

impl<V: Default> Tracked<V> {
    /// Takes the value, leaving `V::default()` in its place.
    #[inline]
    pub fn take(&self) -> V {
        self.replace(V::default())
    }
}

impl<V> Drop for Tracked<V> {
    fn drop(&mut self) {
        let inner = self.inner();
        inner.list.invalidate_all();

        if inner.value.try_borrow_mut().is_err() {
            log::error!(
                "`Tracked<{}>` dropped while its value is borrowed, leaking its storage",
                type_name::<V>(),
            );
            return;
        }

        // SAFETY: the block came from `Box::leak`, every handle has been
        // invalidated, and no borrow of the value is alive.
        drop(unsafe { Box::from_raw(self.inner.as_ptr()) });
    }
}

// -----------------------------------------------------------------------------
// Traits

impl<V: Clone> Clone for Tracked<V> {
    /// Clones the value into a new object. No handle follows the clone.
    #[inline]
    fn clone(&self) -> Self {
        Self::new(self.borrow().clone())
    }
}

impl<V: Default> Default for Tracked<V> {
    #[inline]
    fn default() -> Self {
        Self::new(V::default())
    }
}

impl<V> From<V> for Tracked<V> {
    #[inline]
    fn from(value: V) -> Self {
        Self::new(value)
    }
}

impl<V: fmt::Debug> fmt::Debug for Tracked<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Tracked");
        match self.try_borrow() {
            Ok(value) => s.field("value", &*value),
            Err(_) => s.field("value", &format_args!("<borrowed>")),
        };
        s.field("handles", &self.handle_count()).finish()
    }
}

impl<V: fmt::Display> fmt::Display for Tracked<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.borrow(), f)
    }
}

impl<V: PartialEq> PartialEq for Tracked<V> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        *self.borrow() == *other.borrow()
    }
}

impl<V: Eq> Eq for Tracked<V> {}

impl<V: PartialOrd> PartialOrd for Tracked<V> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.borrow().partial_cmp(&*other.borrow())
    }
}

impl<V: Ord> Ord for Tracked<V> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.borrow().cmp(&*other.borrow())
    }
}

impl<V: Hash> Hash for Tracked<V> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.borrow().hash(state);
    }
}

// -----------------------------------------------------------------------------
// Tests
