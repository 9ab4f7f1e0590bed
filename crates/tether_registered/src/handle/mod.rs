//! Non-owning handles to a [`Tracked`](crate::Tracked) object.
//!
//! | handle                     | access | may be null        | retarget |
//! |----------------------------|--------|--------------------|----------|
//! | [`TrackedPtr`]             | mut    | always             | yes      |
//! | [`TrackedNotNullPtr`]      | mut    | after target dies  | yes      |
//! | [`TrackedFixedPtr`]        | mut    | after target dies  | no       |
//! | [`TrackedConstPtr`]        | shared | always             | yes      |
//! | [`TrackedNotNullConstPtr`] | shared | after target dies  | yes      |
//! | [`TrackedFixedConstPtr`]   | shared | after target dies  | no       |
//!
//! "Not null" is checked when the handle is built. A not-null or fixed handle
//! still turns null when its target is destroyed, and then reports
//! [`NullReferenceError`](crate::NullReferenceError) like any other handle.

mod const_ptr;
mod ptr;
mod raw;

pub use const_ptr::{TrackedConstPtr, TrackedFixedConstPtr, TrackedNotNullConstPtr};
pub use ptr::{TrackedFixedPtr, TrackedNotNullPtr, TrackedPtr};

use core::num::NonZeroUsize;

use crate::error::NullReferenceError;
use crate::node::NodeKey;

pub(crate) mod sealed {
    pub trait Sealed<V> {
        fn raw(&self) -> &super::raw::RawHandle<V>;
    }
}

// -----------------------------------------------------------------------------
// TrackedHandle

/// Read-only view shared by every handle kind.
///
/// This trait is sealed.
pub trait TrackedHandle<V>: sealed::Sealed<V> {
    /// Returns `true` if the handle does not refer to a live object.
    #[inline]
    fn is_null(&self) -> bool {
        self.raw().is_null()
    }

    /// The address of the live target, if any.
    #[inline]
    fn address(&self) -> Option<NonZeroUsize> {
        self.raw().target().map(|target| target.addr())
    }

    /// The arena key of the handle's invalidation node.
    #[inline]
    fn node_key(&self) -> NodeKey {
        self.raw().node().key()
    }
}

// -----------------------------------------------------------------------------
// Macros

/// Methods and traits common to every handle kind.
macro_rules! impl_handle {
    ($handle:ident) => {
        impl<V> $handle<V> {
            /// Returns `true` if the handle does not refer to a live object.
            #[inline]
            pub fn is_null(&self) -> bool {
                self.0.is_null()
            }

            /// Immutably borrows the target.
            ///
            /// # Errors
            ///
            /// [`NullReferenceError`] if the handle is null.
            ///
            /// # Panics
            ///
            /// If the target is mutably borrowed.
            #[inline]
            pub fn borrow(&self) -> Result<Ref<'_, V>, NullReferenceError> {
                self.0.borrow()
            }

            /// Immutably borrows the target without panicking.
            #[inline]
            pub fn try_borrow(&self) -> Result<Ref<'_, V>, AccessError> {
                self.0.try_borrow()
            }

            /// Returns `true` if this handle points at `tracked`.
            #[inline]
            pub fn points_to(&self, tracked: &Tracked<V>) -> bool {
                self.0.target() == Some(NonNull::from(tracked.inner()))
            }
        }

        impl<V> Clone for $handle<V> {
            /// Registers a new handle with the same target.
            #[inline]
            fn clone(&self) -> Self {
                Self(self.0.clone())
            }
        }

        impl<V> PartialEq for $handle<V> {
            #[inline]
            fn eq(&self, other: &Self) -> bool {
                self.0.target() == other.0.target()
            }
        }

        impl<V> Eq for $handle<V> {}

        impl<V> Hash for $handle<V> {
            #[inline]
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.target().hash(state);
            }
        }

        impl<V> fmt::Debug for $handle<V> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.0.target() {
                    Some(target) => write!(f, "{}({:p})", stringify!($handle), target),
                    None => write!(f, "{}(null)", stringify!($handle)),
                }
            }
        }

        impl<V> From<&Tracked<V>> for $handle<V> {
            #[inline]
            fn from(tracked: &Tracked<V>) -> Self {
                Self(RawHandle::new(tracked))
            }
        }

        impl<V> $crate::handle::sealed::Sealed<V> for $handle<V> {
            #[inline]
            fn raw(&self) -> &RawHandle<V> {
                &self.0
            }
        }

        impl<V> $crate::handle::TrackedHandle<V> for $handle<V> {}
    };
}

/// Mutable access for the non-const handle kinds.
macro_rules! impl_handle_mut {
    ($handle:ident) => {
        impl<V> $handle<V> {
            /// Mutably borrows the target.
            ///
            /// # Errors
            ///
            /// [`NullReferenceError`] if the handle is null.
            ///
            /// # Panics
            ///
            /// If the target is already borrowed.
            #[inline]
            pub fn borrow_mut(&self) -> Result<RefMut<'_, V>, NullReferenceError> {
                self.0.borrow_mut()
            }

            /// Mutably borrows the target without panicking.
            #[inline]
            pub fn try_borrow_mut(&self) -> Result<RefMut<'_, V>, AccessError> {
                self.0.try_borrow_mut()
            }

            /// Replaces the target's value, returning the old one.
            ///
            /// # Errors
            ///
            /// [`NullReferenceError`] if the handle is null; `value` is
            /// dropped.
            #[inline]
            pub fn replace(&self, value: V) -> Result<V, NullReferenceError> {
                Ok(core::mem::replace(&mut *self.borrow_mut()?, value))
            }

            /// Overwrites the target's value.
            ///
            /// # Errors
            ///
            /// [`NullReferenceError`] if the handle is null.
            #[inline]
            pub fn set(&self, value: V) -> Result<(), NullReferenceError> {
                self.replace(value).map(drop)
            }
        }
    };
}

/// Retargeting for the non-fixed handle kinds.
macro_rules! impl_retarget {
    ($handle:ident) => {
        impl<V> $handle<V> {
            /// Unregisters from the current target and registers with `tracked`.
            #[inline]
            pub fn retarget(&mut self, tracked: &Tracked<V>) {
                self.0.retarget(Some(tracked));
            }
        }
    };
}

/// Infallible conversions that only widen what a handle may do.
macro_rules! impl_widen {
    ($($from:ident => $to:ident),* $(,)?) => {
        $(
            impl<V> From<$from<V>> for $to<V> {
                #[inline]
                fn from(handle: $from<V>) -> Self {
                    Self(handle.0)
                }
            }
        )*
    };
}

/// Conversions that fail on a null source.
macro_rules! impl_narrow {
    ($($from:ident => $to:ident),* $(,)?) => {
        $(
            impl<V> TryFrom<$from<V>> for $to<V> {
                type Error = NullReferenceError;

                #[inline]
                fn try_from(handle: $from<V>) -> Result<Self, Self::Error> {
                    if handle.0.is_null() {
                        return Err(NullReferenceError::of::<V>());
                    }
                    Ok(Self(handle.0))
                }
            }
        )*
    };
}

pub(crate) use {impl_handle, impl_handle_mut, impl_retarget};

impl_widen! {
    TrackedFixedPtr => TrackedNotNullPtr,
    TrackedFixedPtr => TrackedPtr,
    TrackedNotNullPtr => TrackedPtr,

    TrackedFixedConstPtr => TrackedNotNullConstPtr,
    TrackedFixedConstPtr => TrackedConstPtr,
    TrackedNotNullConstPtr => TrackedConstPtr,

    TrackedPtr => TrackedConstPtr,
    TrackedNotNullPtr => TrackedNotNullConstPtr,
    TrackedNotNullPtr => TrackedConstPtr,
    TrackedFixedPtr => TrackedFixedConstPtr,
    TrackedFixedPtr => TrackedNotNullConstPtr,
    TrackedFixedPtr => TrackedConstPtr,
}

impl_narrow! {
    TrackedPtr => TrackedNotNullPtr,
    TrackedPtr => TrackedFixedPtr,
    TrackedConstPtr => TrackedNotNullConstPtr,
    TrackedConstPtr => TrackedFixedConstPtr,
}

// -----------------------------------------------------------------------------
// Tests
