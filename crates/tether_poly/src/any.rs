use alloc::boxed::Box;
use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

use tether_registered::NullReferenceError;

use crate::deref::{Dereference, DereferenceMut, Target, TargetMut};

// -----------------------------------------------------------------------------
// AnyPtr

/// A type-erased [`DereferenceMut<T>`] of any kind.
///
/// Unlike [`PolyRef`](crate::PolyRef), the set of accepted kinds is open:
/// anything implementing the trait can be stored.
pub struct AnyPtr<'a, T: ?Sized>(Box<dyn DereferenceMut<T> + 'a>);

impl<'a, T: ?Sized> AnyPtr<'a, T> {
    /// Boxes `ptr`.
    #[inline]
    pub fn new(ptr: impl DereferenceMut<T> + 'a) -> Self {
        Self(Box::new(ptr))
    }
}

impl<T: ?Sized> Dereference<T> for AnyPtr<'_, T> {
    #[inline]
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        (*self.0).dereference()
    }
}

impl<T: ?Sized> DereferenceMut<T> for AnyPtr<'_, T> {
    #[inline]
    fn dereference_mut(&mut self) -> Result<TargetMut<'_, T>, NullReferenceError> {
        (*self.0).dereference_mut()
    }
}

impl<T: ?Sized> fmt::Debug for AnyPtr<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AnyPtr(..)")
    }
}

// -----------------------------------------------------------------------------
// AnyConstPtr

/// A type-erased [`Dereference<T>`] of any kind.
pub struct AnyConstPtr<'a, T: ?Sized>(Box<dyn Dereference<T> + 'a>);

impl<'a, T: ?Sized> AnyConstPtr<'a, T> {
    /// Boxes `ptr`.
    #[inline]
    pub fn new(ptr: impl Dereference<T> + 'a) -> Self {
        Self(Box::new(ptr))
    }
}

impl<'a, T: ?Sized> From<AnyPtr<'a, T>> for AnyConstPtr<'a, T> {
    #[inline]
    fn from(ptr: AnyPtr<'a, T>) -> Self {
        Self(ptr.0)
    }
}

impl<T: ?Sized> Dereference<T> for AnyConstPtr<'_, T> {
    #[inline]
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        (*self.0).dereference()
    }
}

impl<T: ?Sized> fmt::Debug for AnyConstPtr<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AnyConstPtr(..)")
    }
}

// -----------------------------------------------------------------------------
// RawRef

/// An unchecked pointer with the access rights of `&'a mut T`.
///
/// Nothing tracks the target, so the caller vouches for it at construction.
pub struct RawRef<'a, T: ?Sized> {
    ptr: NonNull<T>,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T: ?Sized> RawRef<'a, T> {
    /// # Safety
    ///
    /// For all of `'a`, `ptr` must be valid for reads and writes, and no
    /// other access to the target may happen except through this value.
    #[inline]
    pub const unsafe fn new(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    /// The stored pointer.
    #[inline]
    pub const fn as_ptr(&self) -> NonNull<T> {
        self.ptr
    }
}

impl<T: ?Sized> Dereference<T> for RawRef<'_, T> {
    #[inline]
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        // SAFETY: guaranteed by the caller of `new`.
        Ok(Target::Ref(unsafe { self.ptr.as_ref() }))
    }
}

impl<T: ?Sized> DereferenceMut<T> for RawRef<'_, T> {
    #[inline]
    fn dereference_mut(&mut self) -> Result<TargetMut<'_, T>, NullReferenceError> {
        // SAFETY: guaranteed by the caller of `new`; `&mut self` makes the
        // access exclusive.
        Ok(TargetMut::Mut(unsafe { self.ptr.as_mut() }))
    }
}

impl<T: ?Sized> fmt::Debug for RawRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawRef({:p})", self.ptr)
    }
}

// -----------------------------------------------------------------------------
// RawConstRef

/// An unchecked pointer with the access rights of `&'a T`.
pub struct RawConstRef<'a, T: ?Sized> {
    ptr: NonNull<T>,
    _marker: PhantomData<&'a T>,
}

impl<'a, T: ?Sized> RawConstRef<'a, T> {
    /// # Safety
    ///
    /// For all of `'a`, `ptr` must be valid for reads, and the target must
    /// not be written.
    #[inline]
    pub const unsafe fn new(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    /// The stored pointer.
    #[inline]
    pub const fn as_ptr(&self) -> NonNull<T> {
        self.ptr
    }
}

impl<'a, T: ?Sized> From<RawRef<'a, T>> for RawConstRef<'a, T> {
    #[inline]
    fn from(raw: RawRef<'a, T>) -> Self {
        // SAFETY: the exclusive access of `raw` covers shared access.
        unsafe { Self::new(raw.ptr) }
    }
}

impl<T: ?Sized> Clone for RawConstRef<'_, T> {
    #[inline]
    fn clone(&self) -> Self {
        // SAFETY: shared access may be duplicated.
        unsafe { Self::new(self.ptr) }
    }
}

impl<T: ?Sized> Dereference<T> for RawConstRef<'_, T> {
    #[inline]
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        // SAFETY: guaranteed by the caller of `new`.
        Ok(Target::Ref(unsafe { self.ptr.as_ref() }))
    }
}

impl<T: ?Sized> fmt::Debug for RawConstRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawConstRef({:p})", self.ptr)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::ptr::NonNull;

    use tether_registered::Tracked;

    use super::{AnyConstPtr, AnyPtr, RawConstRef, RawRef};
    use crate::deref::{Dereference, DereferenceMut};

    #[test]
    fn any_ptr_erases_the_kind() {
        let object = Tracked::new(1);
        let mut local = 2;
        let mut ptrs: Vec<AnyPtr<'_, i32>> = Vec::new();
        ptrs.push(AnyPtr::new(object.ptr()));
        ptrs.push(AnyPtr::new(&mut local));
        ptrs.push(AnyPtr::new(Box::new(3)));

        for ptr in &mut ptrs {
            *ptr.dereference_mut().unwrap() *= 10;
        }
        let values: Vec<i32> = ptrs.iter().map(|p| *p.dereference().unwrap()).collect();
        assert_eq!(values, [10, 20, 30]);

        drop(ptrs);
        assert_eq!(object.get(), 10);
        assert_eq!(local, 20);
    }

    #[test]
    fn boxed_kinds_reach_the_erased_target() {
        let mut boxed: AnyPtr<'_, u32> = AnyPtr::new(Box::new(4_u32));
        let before: u32 = *boxed.dereference().unwrap();
        *boxed.dereference_mut().unwrap() += 1;
        assert_eq!(*boxed.dereference().unwrap(), before + 1);

        let object = Tracked::new(7_u32);
        let nested: AnyConstPtr<'_, u32> = AnyConstPtr::new(AnyConstPtr::new(object.const_ptr()));
        let seen: u32 = *nested.dereference().unwrap();
        assert_eq!(seen, 7);
    }

    #[test]
    fn any_ptr_converts_to_const() {
        let object = Tracked::new('a');
        let view: AnyConstPtr<'_, char> = AnyPtr::new(object.fixed_ptr()).into();
        assert_eq!(*view.dereference().unwrap(), 'a');

        let shared = AnyConstPtr::new(Rc::new('b'));
        assert_eq!(*shared.dereference().unwrap(), 'b');

        drop(object);
        assert!(view.dereference().is_err());
    }

    #[test]
    fn raw_refs() {
        let mut value = 5_u16;
        // SAFETY: `value` is only reached through `raw` while it lives.
        let mut raw = unsafe { RawRef::new(NonNull::from(&mut value)) };
        *raw.dereference_mut().unwrap() += 1;

        let shared = RawConstRef::from(raw);
        let copy = shared.clone();
        assert_eq!(*copy.dereference().unwrap(), 6);
        assert_eq!(shared.as_ptr(), copy.as_ptr());
    }
}
