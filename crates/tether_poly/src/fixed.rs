use alloc::rc::Rc;
use alloc::sync::Arc;
use core::cell::RefCell;
use core::fmt;

use tether_registered::{NullReferenceError, TrackedFixedConstPtr, TrackedFixedPtr};
use tether_union::{Member, TaggedUnion, TypeMismatchError, UnionKind};

use crate::any::{RawConstRef, RawRef};
use crate::deref::{Dereference, DereferenceMut, Target, TargetMut};
use crate::poly::{PolyConstKind, PolyConstRef, PolyKind, PolyRef, poly_kind};

// -----------------------------------------------------------------------------
// Member lists

poly_kind! {
    /// The reference kinds a [`PolyFixedRef`] can hold.
    ///
    /// Every member is bound to one target when it is created and cannot
    /// start out null.
    #[derive(Debug)]
    pub enum PolyFixedKind<'a, T>: PolyFixedTag {
        Borrowed(&'a mut T),
        TrackedFixed(TrackedFixedPtr<T>),
        Shared(Rc<RefCell<T>>),
        Raw(RawRef<'a, T>),
    }
}

poly_kind! {
    /// The reference kinds a [`PolyFixedConstRef`] can hold.
    #[derive(Debug)]
    pub enum PolyFixedConstKind<'a, T>: PolyFixedConstTag {
        Borrowed(&'a T),
        TrackedFixed(TrackedFixedConstPtr<T>),
        Shared(Rc<RefCell<T>>),
        Atomic(Arc<T>),
        Raw(RawConstRef<'a, T>),
    }
}

impl<T> Dereference<T> for PolyFixedKind<'_, T> {
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        match self {
            Self::Borrowed(value) => Ok(Target::Ref(value)),
            Self::TrackedFixed(ptr) => ptr.dereference(),
            Self::Shared(cell) => Ok(Target::Cell(cell.borrow())),
            Self::Raw(raw) => raw.dereference(),
        }
    }
}

impl<T> DereferenceMut<T> for PolyFixedKind<'_, T> {
    fn dereference_mut(&mut self) -> Result<TargetMut<'_, T>, NullReferenceError> {
        match self {
            Self::Borrowed(value) => Ok(TargetMut::Mut(value)),
            Self::TrackedFixed(ptr) => ptr.dereference_mut(),
            Self::Shared(cell) => Ok(TargetMut::Cell(cell.borrow_mut())),
            Self::Raw(raw) => raw.dereference_mut(),
        }
    }
}

impl<T> Dereference<T> for PolyFixedConstKind<'_, T> {
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        match self {
            Self::Borrowed(value) => Ok(Target::Ref(value)),
            Self::TrackedFixed(ptr) => ptr.dereference(),
            Self::Shared(cell) => Ok(Target::Cell(cell.borrow())),
            Self::Atomic(arc) => Ok(Target::Ref(arc)),
            Self::Raw(raw) => raw.dereference(),
        }
    }
}

impl<'a, T> From<PolyFixedKind<'a, T>> for PolyFixedConstKind<'a, T> {
    fn from(kind: PolyFixedKind<'a, T>) -> Self {
        match kind {
            PolyFixedKind::Borrowed(value) => Self::Borrowed(value),
            PolyFixedKind::TrackedFixed(ptr) => Self::TrackedFixed(ptr.into()),
            PolyFixedKind::Shared(cell) => Self::Shared(cell),
            PolyFixedKind::Raw(raw) => Self::Raw(raw.into()),
        }
    }
}

impl<'a, T> From<PolyFixedKind<'a, T>> for PolyKind<'a, T> {
    fn from(kind: PolyFixedKind<'a, T>) -> Self {
        match kind {
            PolyFixedKind::Borrowed(value) => Self::Borrowed(value),
            PolyFixedKind::TrackedFixed(ptr) => Self::TrackedFixed(ptr),
            PolyFixedKind::Shared(cell) => Self::Shared(cell),
            PolyFixedKind::Raw(raw) => Self::Raw(raw),
        }
    }
}

impl<'a, T> From<PolyFixedConstKind<'a, T>> for PolyConstKind<'a, T> {
    fn from(kind: PolyFixedConstKind<'a, T>) -> Self {
        match kind {
            PolyFixedConstKind::Borrowed(value) => Self::Borrowed(value),
            PolyFixedConstKind::TrackedFixed(ptr) => Self::TrackedFixed(ptr),
            PolyFixedConstKind::Shared(cell) => Self::Shared(cell),
            PolyFixedConstKind::Atomic(arc) => Self::Atomic(arc),
            PolyFixedConstKind::Raw(raw) => Self::Raw(raw),
        }
    }
}

// -----------------------------------------------------------------------------
// PolyFixedRef

/// A reference to `T` that is bound to one target for its whole life.
///
/// Only kinds in [`PolyFixedKind`] are accepted, so nullable handles and
/// open-set [`AnyPtr`](crate::AnyPtr) values are rejected at compile time:
///
/// ```compile_fail
/// use tether_poly::PolyFixedRef;
/// use tether_registered::TrackedPtr;
///
/// let _ = PolyFixedRef::from(TrackedPtr::<i32>::null());
/// ```
///
/// The stored kind is never handed out mutably, so it cannot be
/// retargeted. A stored [`TrackedFixedPtr`] still reports null once its
/// object is dropped.
///
/// # Examples
///
/// ```
/// use tether_poly::{DereferenceMut, PolyFixedRef, PolyRef, PolyTag};
/// use tether_registered::Tracked;
///
/// let object = Tracked::new(1);
/// let mut fixed = PolyFixedRef::from(object.fixed_ptr());
/// *fixed.dereference_mut().unwrap() += 1;
/// assert_eq!(object.get(), 2);
///
/// let widened = PolyRef::from(fixed);
/// assert_eq!(widened.tag(), Some(PolyTag::TrackedFixed));
/// ```
pub struct PolyFixedRef<'a, T> {
    union: TaggedUnion<PolyFixedKind<'a, T>>,
}

impl<'a, T> PolyFixedRef<'a, T> {
    /// Stores `kind`.
    #[inline]
    pub fn new<K>(kind: K) -> Self
    where
        PolyFixedKind<'a, T>: Member<K>,
    {
        Self {
            union: TaggedUnion::with(kind),
        }
    }

    /// Returns `true` if the stored kind is `K`.
    #[inline]
    pub fn is<K>(&self) -> bool
    where
        PolyFixedKind<'a, T>: Member<K>,
    {
        self.union.is::<K>()
    }

    /// Returns the stored kind.
    ///
    /// # Errors
    ///
    /// [`TypeMismatchError`] if another kind is stored.
    #[inline]
    pub fn get<K>(&self) -> Result<&K, TypeMismatchError>
    where
        PolyFixedKind<'a, T>: Member<K>,
    {
        self.union.get::<K>()
    }

    /// The identity of the stored kind.
    #[inline]
    pub fn tag(&self) -> Option<PolyFixedTag> {
        self.union.tag()
    }

    /// The type name of the stored kind.
    #[inline]
    pub fn kind_name(&self) -> &'static str {
        self.union.type_name().unwrap_or_default()
    }

    /// Gives back the stored kind.
    #[inline]
    pub fn into_kind(self) -> Option<PolyFixedKind<'a, T>> {
        self.union.into_kind()
    }
}

impl<T> Dereference<T> for PolyFixedRef<'_, T> {
    #[inline]
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        self.union
            .as_kind()
            .ok_or_else(NullReferenceError::of::<T>)?
            .dereference()
    }
}

impl<T> DereferenceMut<T> for PolyFixedRef<'_, T> {
    #[inline]
    fn dereference_mut(&mut self) -> Result<TargetMut<'_, T>, NullReferenceError> {
        self.union
            .as_kind_mut()
            .ok_or_else(NullReferenceError::of::<T>)?
            .dereference_mut()
    }
}

impl<T> fmt::Debug for PolyFixedRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PolyFixedRef").field(&self.kind_name()).finish()
    }
}

// -----------------------------------------------------------------------------
// PolyFixedConstRef

/// The read-only form of [`PolyFixedRef`].
pub struct PolyFixedConstRef<'a, T> {
    union: TaggedUnion<PolyFixedConstKind<'a, T>>,
}

impl<'a, T> PolyFixedConstRef<'a, T> {
    /// Stores `kind`.
    #[inline]
    pub fn new<K>(kind: K) -> Self
    where
        PolyFixedConstKind<'a, T>: Member<K>,
    {
        Self {
            union: TaggedUnion::with(kind),
        }
    }

    /// Returns `true` if the stored kind is `K`.
    #[inline]
    pub fn is<K>(&self) -> bool
    where
        PolyFixedConstKind<'a, T>: Member<K>,
    {
        self.union.is::<K>()
    }

    /// Returns the stored kind.
    ///
    /// # Errors
    ///
    /// [`TypeMismatchError`] if another kind is stored.
    #[inline]
    pub fn get<K>(&self) -> Result<&K, TypeMismatchError>
    where
        PolyFixedConstKind<'a, T>: Member<K>,
    {
        self.union.get::<K>()
    }

    /// The identity of the stored kind.
    #[inline]
    pub fn tag(&self) -> Option<PolyFixedConstTag> {
        self.union.tag()
    }

    /// The type name of the stored kind.
    #[inline]
    pub fn kind_name(&self) -> &'static str {
        self.union.type_name().unwrap_or_default()
    }

    /// Gives back the stored kind.
    #[inline]
    pub fn into_kind(self) -> Option<PolyFixedConstKind<'a, T>> {
        self.union.into_kind()
    }
}

impl<T> Dereference<T> for PolyFixedConstRef<'_, T> {
    #[inline]
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        self.union
            .as_kind()
            .ok_or_else(NullReferenceError::of::<T>)?
            .dereference()
    }
}

impl<T> fmt::Debug for PolyFixedConstRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PolyFixedConstRef").field(&self.kind_name()).finish()
    }
}

// -----------------------------------------------------------------------------
// Conversions

macro_rules! impl_from_fixed_kind {
    ($poly:ident, $kind:ident; $($ty:ty),* $(,)?) => {
        $(
            impl<'a, T> From<$ty> for $poly<'a, T> {
                #[inline]
                fn from(value: $ty) -> Self {
                    Self::new(value)
                }
            }
        )*

        impl<'a, T> From<$kind<'a, T>> for $poly<'a, T> {
            #[inline]
            fn from(kind: $kind<'a, T>) -> Self {
                Self {
                    union: TaggedUnion::from(kind),
                }
            }
        }
    };
}

impl_from_fixed_kind! {
    PolyFixedRef, PolyFixedKind;
    &'a mut T,
    TrackedFixedPtr<T>,
    Rc<RefCell<T>>,
    RawRef<'a, T>,
}

impl_from_fixed_kind! {
    PolyFixedConstRef, PolyFixedConstKind;
    &'a T,
    TrackedFixedConstPtr<T>,
    Rc<RefCell<T>>,
    Arc<T>,
    RawConstRef<'a, T>,
}

impl<'a, T> From<&'a mut T> for PolyFixedConstRef<'a, T> {
    #[inline]
    fn from(value: &'a mut T) -> Self {
        Self::new::<&'a T>(value)
    }
}

impl<T> From<TrackedFixedPtr<T>> for PolyFixedConstRef<'_, T> {
    #[inline]
    fn from(ptr: TrackedFixedPtr<T>) -> Self {
        Self::new(TrackedFixedConstPtr::from(ptr))
    }
}

impl<'a, T> From<RawRef<'a, T>> for PolyFixedConstRef<'a, T> {
    #[inline]
    fn from(raw: RawRef<'a, T>) -> Self {
        Self::new(RawConstRef::from(raw))
    }
}

impl<'a, T> From<PolyFixedRef<'a, T>> for PolyFixedConstRef<'a, T> {
    fn from(fixed: PolyFixedRef<'a, T>) -> Self {
        Self {
            union: match fixed.union.into_kind() {
                Some(kind) => TaggedUnion::from(PolyFixedConstKind::from(kind)),
                None => TaggedUnion::new(),
            },
        }
    }
}

impl<'a, T> From<PolyFixedRef<'a, T>> for PolyRef<'a, T> {
    fn from(fixed: PolyFixedRef<'a, T>) -> Self {
        PolyRef {
            union: match fixed.union.into_kind() {
                Some(kind) => TaggedUnion::from(PolyKind::from(kind)),
                None => TaggedUnion::new(),
            },
        }
    }
}

impl<'a, T> From<PolyFixedConstRef<'a, T>> for PolyConstRef<'a, T> {
    fn from(fixed: PolyFixedConstRef<'a, T>) -> Self {
        PolyConstRef {
            union: match fixed.union.into_kind() {
                Some(kind) => TaggedUnion::from(PolyConstKind::from(kind)),
                None => TaggedUnion::new(),
            },
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::rc::Rc;
    use alloc::sync::Arc;
    use core::cell::RefCell;
    use core::ptr::NonNull;

    use tether_registered::{Tracked, TrackedFixedConstPtr, TrackedFixedPtr};

    use super::{PolyFixedConstRef, PolyFixedConstTag, PolyFixedRef, PolyFixedTag};
    use crate::{Dereference, DereferenceMut, PolyConstRef, PolyConstTag, PolyRef, PolyTag, RawRef};

    fn bump(fixed: &mut PolyFixedRef<'_, i32>) {
        *fixed.dereference_mut().unwrap() += 1;
    }

    fn read(fixed: &PolyFixedConstRef<'_, i32>) -> i32 {
        *fixed.dereference().unwrap()
    }

    #[test]
    fn every_fixed_kind_is_accepted() {
        let object = Tracked::new(0);
        let shared = Rc::new(RefCell::new(10));
        let mut local = 20;
        let mut raw_target = 30;

        {
            let mut fixed = [
                PolyFixedRef::from(object.fixed_ptr()),
                PolyFixedRef::from(Rc::clone(&shared)),
                PolyFixedRef::from(&mut local),
                // SAFETY: `raw_target` is only reached through this value.
                unsafe { PolyFixedRef::new(RawRef::new(NonNull::from(&mut raw_target))) },
            ];
            for entry in &mut fixed {
                bump(entry);
            }
            assert_eq!(fixed[0].tag(), Some(PolyFixedTag::TrackedFixed));
            assert_eq!(fixed[1].tag(), Some(PolyFixedTag::Shared));
            assert_eq!(fixed[2].tag(), Some(PolyFixedTag::Borrowed));
            assert_eq!(fixed[3].tag(), Some(PolyFixedTag::Raw));
        }

        assert_eq!(object.get(), 1);
        assert_eq!(*shared.borrow(), 11);
        assert_eq!(local, 21);
        assert_eq!(raw_target, 31);
    }

    #[test]
    fn stored_fixed_kind_is_inspectable() {
        let object = Tracked::new(4);
        let fixed = PolyFixedRef::from(object.fixed_ptr());

        assert!(fixed.is::<TrackedFixedPtr<i32>>());
        assert!(!fixed.is::<Rc<RefCell<i32>>>());
        assert!(fixed.get::<Rc<RefCell<i32>>>().is_err());
        assert_eq!(*fixed.get::<TrackedFixedPtr<i32>>().unwrap().borrow().unwrap(), 4);
        assert_eq!(format!("{fixed:?}"), format!("PolyFixedRef({:?})", fixed.kind_name()));
        assert_eq!(object.handle_count(), 1);
    }

    #[test]
    fn fixed_tracked_kind_still_sees_the_drop() {
        let object = Tracked::new(3);
        let fixed = PolyFixedConstRef::from(object.fixed_ptr());
        assert_eq!(read(&fixed), 3);

        drop(object);
        assert!(fixed.dereference().is_err());
    }

    #[test]
    fn const_form_accepts_mutable_kinds() {
        let object = Tracked::new(5);
        let mut local = 6;

        let from_handle = PolyFixedConstRef::from(object.fixed_ptr());
        assert!(from_handle.is::<TrackedFixedConstPtr<i32>>());
        assert_eq!(read(&from_handle), 5);

        let from_fixed = PolyFixedConstRef::from(PolyFixedRef::from(&mut local));
        assert_eq!(from_fixed.tag(), Some(PolyFixedConstTag::Borrowed));
        assert_eq!(read(&from_fixed), 6);

        assert_eq!(read(&PolyFixedConstRef::from(Arc::new(7))), 7);
        assert_eq!(read(&PolyFixedConstRef::from(&8)), 8);
    }

    #[test]
    fn fixed_refs_widen_to_the_open_forms() {
        let object = Tracked::new(9);
        let shared = Rc::new(RefCell::new(12));

        let mut widened = PolyRef::from(PolyFixedRef::from(object.fixed_ptr()));
        assert_eq!(widened.tag(), Some(PolyTag::TrackedFixed));
        *widened.dereference_mut().unwrap() = 10;
        assert_eq!(object.get(), 10);

        let widened = PolyRef::from(PolyFixedRef::from(Rc::clone(&shared)));
        assert_eq!(widened.tag(), Some(PolyTag::Shared));
        assert_eq!(*widened.dereference().unwrap(), 12);

        let read_only = PolyConstRef::from(PolyFixedConstRef::from(Arc::new(11)));
        assert_eq!(read_only.tag(), Some(PolyConstTag::Atomic));
        assert_eq!(*read_only.dereference().unwrap(), 11);
    }
}
