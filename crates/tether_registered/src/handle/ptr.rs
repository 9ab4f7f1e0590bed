use core::cell::{Ref, RefMut};
use core::fmt;
use core::hash::{Hash, Hasher};
use core::ptr::NonNull;

use super::raw::RawHandle;
use super::{impl_handle, impl_handle_mut, impl_retarget};
use crate::error::{AccessError, NullReferenceError};
use crate::tracked::Tracked;

// -----------------------------------------------------------------------------
// TrackedPtr

/// A nullable, retargetable handle with mutable access.
///
/// # Examples
///
/// ```
/// use tether_registered::{Tracked, TrackedPtr};
///
/// let a = Tracked::new(1);
/// let b = Tracked::new(2);
///
/// let mut ptr = TrackedPtr::null();
/// assert!(ptr.is_null());
///
/// ptr.retarget(&a);
/// *ptr.borrow_mut().unwrap() += 10;
/// assert_eq!(a.get(), 11);
///
/// ptr.retarget(&b);
/// assert_eq!(a.handle_count(), 0);
/// assert_eq!(*ptr.borrow().unwrap(), 2);
/// ```
pub struct TrackedPtr<V>(pub(crate) RawHandle<V>);

impl<V> TrackedPtr<V> {
    /// Creates a handle registered with `tracked`.
    #[inline]
    pub fn new(tracked: &Tracked<V>) -> Self {
        Self(RawHandle::new(tracked))
    }

    /// Creates a handle that points nowhere.
    #[inline]
    pub fn null() -> Self {
        Self(RawHandle::null())
    }

    /// Unregisters from the current target, if any.
    #[inline]
    pub fn set_null(&mut self) {
        self.0.unlink();
    }
}

impl<V> Default for TrackedPtr<V> {
    #[inline]
    fn default() -> Self {
        Self::null()
    }
}

impl_handle!(TrackedPtr);
impl_handle_mut!(TrackedPtr);
impl_retarget!(TrackedPtr);

// -----------------------------------------------------------------------------
// TrackedNotNullPtr

/// A retargetable handle with mutable access that starts out non-null.
///
/// It still turns null when its target is destroyed.
pub struct TrackedNotNullPtr<V>(pub(crate) RawHandle<V>);

impl<V> TrackedNotNullPtr<V> {
    /// Creates a handle registered with `tracked`.
    #[inline]
    pub fn new(tracked: &Tracked<V>) -> Self {
        Self(RawHandle::new(tracked))
    }
}

impl_handle!(TrackedNotNullPtr);
impl_handle_mut!(TrackedNotNullPtr);
impl_retarget!(TrackedNotNullPtr);

// -----------------------------------------------------------------------------
// TrackedFixedPtr

/// A handle with mutable access bound to one object.
///
/// It can not be retargeted, but it still turns null when its target is
/// destroyed.
pub struct TrackedFixedPtr<V>(pub(crate) RawHandle<V>);

impl<V> TrackedFixedPtr<V> {
    /// Creates a handle bound to `tracked`.
    #[inline]
    pub fn new(tracked: &Tracked<V>) -> Self {
        Self(RawHandle::new(tracked))
    }
}

impl_handle!(TrackedFixedPtr);
impl_handle_mut!(TrackedFixedPtr);

// -----------------------------------------------------------------------------
// Tests
