use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::sync::Arc;
use core::cell::{Ref, RefMut};
use core::fmt;
use core::ops::{Deref, DerefMut};

use tether_registered::{
    NullReferenceError, Tracked, TrackedConstPtr, TrackedFixedConstPtr, TrackedFixedPtr,
    TrackedNotNullConstPtr, TrackedNotNullPtr, TrackedPtr,
};

// -----------------------------------------------------------------------------
// Target

/// Shared access produced by [`Dereference`].
///
/// Either a plain reference or a [`RefCell`](core::cell::RefCell) guard,
/// depending on where the value lives. Both deref to `&T`.
pub enum Target<'a, T: ?Sized> {
    Ref(&'a T),
    Cell(Ref<'a, T>),
}

impl<'a, T: ?Sized> Target<'a, T> {
    /// Narrows the target to a part of it.
    ///
    /// An associated function, like [`Ref::map`].
    #[inline]
    pub fn map<U: ?Sized>(this: Self, f: impl FnOnce(&T) -> &U) -> Target<'a, U> {
        match this {
            Target::Ref(value) => Target::Ref(f(value)),
            Target::Cell(guard) => Target::Cell(Ref::map(guard, f)),
        }
    }
}

impl<T: ?Sized> Deref for Target<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        match self {
            Self::Ref(value) => value,
            Self::Cell(guard) => guard,
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Target<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

// -----------------------------------------------------------------------------
// TargetMut

/// Exclusive access produced by [`DereferenceMut`].
pub enum TargetMut<'a, T: ?Sized> {
    Mut(&'a mut T),
    Cell(RefMut<'a, T>),
}

impl<'a, T: ?Sized> TargetMut<'a, T> {
    /// Narrows the target to a part of it.
    #[inline]
    pub fn map<U: ?Sized>(this: Self, f: impl FnOnce(&mut T) -> &mut U) -> TargetMut<'a, U> {
        match this {
            TargetMut::Mut(value) => TargetMut::Mut(f(value)),
            TargetMut::Cell(guard) => TargetMut::Cell(RefMut::map(guard, f)),
        }
    }
}

impl<T: ?Sized> Deref for TargetMut<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        match self {
            Self::Mut(value) => value,
            Self::Cell(guard) => guard,
        }
    }
}

impl<T: ?Sized> DerefMut for TargetMut<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        match self {
            Self::Mut(value) => value,
            Self::Cell(guard) => guard,
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for TargetMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

// -----------------------------------------------------------------------------
// Dereference

/// Something that can be read as a `T`, or turns out to be null.
///
/// This is the common contract of every reference kind accepted by
/// [`PolyConstRef`](crate::PolyConstRef) and [`AnyConstPtr`](crate::AnyConstPtr).
/// Implement it to make a new kind usable through them.
///
/// Kinds backed by a `RefCell` panic if the value is mutably borrowed.
pub trait Dereference<T: ?Sized> {
    /// # Errors
    ///
    /// [`NullReferenceError`] if the reference no longer has a target.
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError>;
}

/// Something that can be written as a `T`, or turns out to be null.
///
/// The contract of the kinds accepted by [`PolyRef`](crate::PolyRef) and
/// [`AnyPtr`](crate::AnyPtr).
pub trait DereferenceMut<T: ?Sized>: Dereference<T> {
    /// # Errors
    ///
    /// [`NullReferenceError`] if the reference no longer has a target.
    fn dereference_mut(&mut self) -> Result<TargetMut<'_, T>, NullReferenceError>;
}

// -----------------------------------------------------------------------------
// Plain references and owners

impl<T: ?Sized> Dereference<T> for &T {
    #[inline]
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        Ok(Target::Ref(self))
    }
}

impl<T: ?Sized> Dereference<T> for &mut T {
    #[inline]
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        Ok(Target::Ref(self))
    }
}

impl<T: ?Sized> DereferenceMut<T> for &mut T {
    #[inline]
    fn dereference_mut(&mut self) -> Result<TargetMut<'_, T>, NullReferenceError> {
        Ok(TargetMut::Mut(self))
    }
}

impl<T: ?Sized> Dereference<T> for Box<T> {
    #[inline]
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        Ok(Target::Ref(self))
    }
}

impl<T: ?Sized> DereferenceMut<T> for Box<T> {
    #[inline]
    fn dereference_mut(&mut self) -> Result<TargetMut<'_, T>, NullReferenceError> {
        Ok(TargetMut::Mut(self))
    }
}

impl<T: ?Sized> Dereference<T> for Rc<T> {
    #[inline]
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        Ok(Target::Ref(self))
    }
}

impl<T: ?Sized> Dereference<T> for Arc<T> {
    #[inline]
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        Ok(Target::Ref(self))
    }
}

// -----------------------------------------------------------------------------
// Tracked objects and handles

impl<V> Dereference<V> for Tracked<V> {
    #[inline]
    fn dereference(&self) -> Result<Target<'_, V>, NullReferenceError> {
        Ok(Target::Cell(self.borrow()))
    }
}

impl<V> DereferenceMut<V> for Tracked<V> {
    #[inline]
    fn dereference_mut(&mut self) -> Result<TargetMut<'_, V>, NullReferenceError> {
        Ok(TargetMut::Cell(self.borrow_mut()))
    }
}

macro_rules! impl_handle_dereference {
    ($($handle:ident),* $(,)?) => {
        $(
            impl<V> Dereference<V> for $handle<V> {
                #[inline]
                fn dereference(&self) -> Result<Target<'_, V>, NullReferenceError> {
                    self.borrow().map(Target::Cell)
                }
            }
        )*
    };
}

macro_rules! impl_handle_dereference_mut {
    ($($handle:ident),* $(,)?) => {
        $(
            impl<V> DereferenceMut<V> for $handle<V> {
                #[inline]
                fn dereference_mut(&mut self) -> Result<TargetMut<'_, V>, NullReferenceError> {
                    self.borrow_mut().map(TargetMut::Cell)
                }
            }
        )*
    };
}

impl_handle_dereference!(
    TrackedPtr,
    TrackedNotNullPtr,
    TrackedFixedPtr,
    TrackedConstPtr,
    TrackedNotNullConstPtr,
    TrackedFixedConstPtr,
);

impl_handle_dereference_mut!(TrackedPtr, TrackedNotNullPtr, TrackedFixedPtr);

// -----------------------------------------------------------------------------
// Tests
