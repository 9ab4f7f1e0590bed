use core::cell::Ref;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::ptr::NonNull;

use super::raw::RawHandle;
use super::{impl_handle, impl_retarget};
use crate::error::{AccessError, NullReferenceError};
use crate::tracked::Tracked;

// -----------------------------------------------------------------------------
// TrackedConstPtr

/// A nullable, retargetable handle with shared access only.
///
/// Every mutable handle converts into its const counterpart; the reverse is
/// not possible.
pub struct TrackedConstPtr<V>(pub(crate) RawHandle<V>);

impl<V> TrackedConstPtr<V> {
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

impl<V> Default for TrackedConstPtr<V> {
    #[inline]
    fn default() -> Self {
        Self::null()
    }
}

impl_handle!(TrackedConstPtr);
impl_retarget!(TrackedConstPtr);

// -----------------------------------------------------------------------------
// TrackedNotNullConstPtr

/// A retargetable handle with shared access that starts out non-null.
///
/// Obtained from [`Tracked::not_null_const_ptr`], by widening a
/// [`TrackedFixedConstPtr`] or a mutable not-null handle, or through
/// `TryFrom<TrackedConstPtr>`. Like every handle it turns null when its
/// target is destroyed.
pub struct TrackedNotNullConstPtr<V>(pub(crate) RawHandle<V>);

impl<V> TrackedNotNullConstPtr<V> {
    /// Creates a handle registered with `tracked`.
    #[inline]
    pub fn new(tracked: &Tracked<V>) -> Self {
        Self(RawHandle::new(tracked))
    }
}

impl_handle!(TrackedNotNullConstPtr);
impl_retarget!(TrackedNotNullConstPtr);

// -----------------------------------------------------------------------------
// TrackedFixedConstPtr

/// A handle with shared access bound to one object.
///
/// # Examples
///
/// ```
/// use tether_registered::Tracked;
///
/// let object = Tracked::new('x');
/// let view = object.fixed_const_ptr();
/// assert_eq!(*view.borrow().unwrap(), 'x');
///
/// drop(object);
/// assert!(view.is_null());
/// ```
pub struct TrackedFixedConstPtr<V>(pub(crate) RawHandle<V>);

impl<V> TrackedFixedConstPtr<V> {
    /// Creates a handle bound to `tracked`.
    #[inline]
    pub fn new(tracked: &Tracked<V>) -> Self {
        Self(RawHandle::new(tracked))
    }
}

impl_handle!(TrackedFixedConstPtr);

// -----------------------------------------------------------------------------
// Tests
