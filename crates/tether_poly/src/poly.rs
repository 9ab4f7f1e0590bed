use alloc::rc::Rc;
use alloc::sync::Arc;
use core::cell::RefCell;
use core::fmt;
use core::ptr::NonNull;

use tether_registered::{
    NullReferenceError, TrackedConstPtr, TrackedFixedConstPtr, TrackedFixedPtr,
    TrackedNotNullConstPtr, TrackedNotNullPtr, TrackedPtr,
};
use tether_union::{Member, TaggedUnion, TypeMismatchError, UnionKind};

use crate::any::{AnyConstPtr, AnyPtr, RawConstRef, RawRef};
use crate::deref::{Dereference, DereferenceMut, Target, TargetMut};

// -----------------------------------------------------------------------------
// Member lists

/// Declares a member list generic over a lifetime and a target type.
macro_rules! poly_kind {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident<$lt:lifetime, $t:ident>: $tag:ident {
            $( $(#[$vmeta:meta])* $variant:ident($ty:ty) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name<$lt, $t> {
            $( $(#[$vmeta])* $variant($ty), )+
        }

        #[doc = concat!("Member identity of [`", stringify!($name), "`].")]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        $vis enum $tag {
            $( $variant, )+
        }

        impl<$lt, $t> UnionKind for $name<$lt, $t> {
            type Tag = $tag;

            #[inline]
            fn tag(&self) -> $tag {
                match self {
                    $( Self::$variant(_) => $tag::$variant, )+
                }
            }

            #[inline]
            fn type_name(&self) -> &'static str {
                match self {
                    $( Self::$variant(_) => core::any::type_name::<$ty>(), )+
                }
            }
        }

        $(
            impl<$lt, $t> Member<$ty> for $name<$lt, $t> {
                const TAG: $tag = $tag::$variant;

                #[inline]
                fn from_member(value: $ty) -> Self {
                    Self::$variant(value)
                }

                #[inline]
                fn as_member(&self) -> Option<&$ty> {
                    match self {
                        Self::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                #[inline]
                fn as_member_mut(&mut self) -> Option<&mut $ty> {
                    match self {
                        Self::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                #[inline]
                fn into_member(self) -> Result<$ty, Self> {
                    match self {
                        Self::$variant(value) => Ok(value),
                        other => Err(other),
                    }
                }
            }

            impl<$lt, $t> From<$ty> for $name<$lt, $t> {
                #[inline]
                fn from(value: $ty) -> Self {
                    $name::$variant(value)
                }
            }
        )+
    };
}

pub(crate) use poly_kind;

poly_kind! {
    /// The reference kinds a [`PolyRef`] can hold.
    #[derive(Debug)]
    pub enum PolyKind<'a, T>: PolyTag {
        Borrowed(&'a mut T),
        Tracked(TrackedPtr<T>),
        TrackedNotNull(TrackedNotNullPtr<T>),
        TrackedFixed(TrackedFixedPtr<T>),
        Shared(Rc<RefCell<T>>),
        Raw(RawRef<'a, T>),
        Any(AnyPtr<'a, T>),
    }
}

poly_kind! {
    /// The reference kinds a [`PolyConstRef`] can hold.
    #[derive(Debug)]
    pub enum PolyConstKind<'a, T>: PolyConstTag {
        Borrowed(&'a T),
        Tracked(TrackedConstPtr<T>),
        TrackedNotNull(TrackedNotNullConstPtr<T>),
        TrackedFixed(TrackedFixedConstPtr<T>),
        Shared(Rc<RefCell<T>>),
        Atomic(Arc<T>),
        Raw(RawConstRef<'a, T>),
        Any(AnyConstPtr<'a, T>),
    }
}

impl<T> Dereference<T> for PolyKind<'_, T> {
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        match self {
            Self::Borrowed(value) => Ok(Target::Ref(value)),
            Self::Tracked(ptr) => ptr.dereference(),
            Self::TrackedNotNull(ptr) => ptr.dereference(),
            Self::TrackedFixed(ptr) => ptr.dereference(),
            Self::Shared(cell) => Ok(Target::Cell(cell.borrow())),
            Self::Raw(raw) => raw.dereference(),
            Self::Any(any) => any.dereference(),
        }
    }
}

impl<T> DereferenceMut<T> for PolyKind<'_, T> {
    fn dereference_mut(&mut self) -> Result<TargetMut<'_, T>, NullReferenceError> {
        match self {
            Self::Borrowed(value) => Ok(TargetMut::Mut(value)),
            Self::Tracked(ptr) => ptr.dereference_mut(),
            Self::TrackedNotNull(ptr) => ptr.dereference_mut(),
            Self::TrackedFixed(ptr) => ptr.dereference_mut(),
            Self::Shared(cell) => Ok(TargetMut::Cell(cell.borrow_mut())),
            Self::Raw(raw) => raw.dereference_mut(),
            Self::Any(any) => any.dereference_mut(),
        }
    }
}

impl<T> Dereference<T> for PolyConstKind<'_, T> {
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        match self {
            Self::Borrowed(value) => Ok(Target::Ref(value)),
            Self::Tracked(ptr) => ptr.dereference(),
            Self::TrackedNotNull(ptr) => ptr.dereference(),
            Self::TrackedFixed(ptr) => ptr.dereference(),
            Self::Shared(cell) => Ok(Target::Cell(cell.borrow())),
            Self::Atomic(arc) => Ok(Target::Ref(arc)),
            Self::Raw(raw) => raw.dereference(),
            Self::Any(any) => any.dereference(),
        }
    }
}

impl<'a, T> From<PolyKind<'a, T>> for PolyConstKind<'a, T> {
    fn from(kind: PolyKind<'a, T>) -> Self {
        match kind {
            PolyKind::Borrowed(value) => Self::Borrowed(value),
            PolyKind::Tracked(ptr) => Self::Tracked(ptr.into()),
            PolyKind::TrackedNotNull(ptr) => Self::TrackedNotNull(ptr.into()),
            PolyKind::TrackedFixed(ptr) => Self::TrackedFixed(ptr.into()),
            PolyKind::Shared(cell) => Self::Shared(cell),
            PolyKind::Raw(raw) => Self::Raw(raw.into()),
            PolyKind::Any(any) => Self::Any(any.into()),
        }
    }
}

// -----------------------------------------------------------------------------
// PolyRef

/// A reference to `T` of any kind in [`PolyKind`].
///
/// Code that takes a `PolyRef` accepts a plain `&mut T`, any mutable
/// tracked handle, an `Rc<RefCell<T>>`, an unchecked [`RawRef`] or any
/// [`AnyPtr`], and reads or writes through it the same way. The stored kind
/// keeps its own behavior: a tracked handle still reports null once its
/// target is gone.
///
/// # Examples
///
/// ```
/// use tether_poly::{Dereference, DereferenceMut, PolyRef};
/// use tether_registered::Tracked;
///
/// fn double(mut value: PolyRef<'_, i32>) {
///     *value.dereference_mut().unwrap() *= 2;
/// }
///
/// let object = Tracked::new(21);
/// double(object.ptr().into());
/// assert_eq!(object.get(), 42);
///
/// let mut local = 5;
/// double(PolyRef::from(&mut local));
/// assert_eq!(local, 10);
/// ```
pub struct PolyRef<'a, T> {
    pub(crate) union: TaggedUnion<PolyKind<'a, T>>,
}

impl<'a, T> PolyRef<'a, T> {
    /// Stores `kind`.
    #[inline]
    pub fn new<K>(kind: K) -> Self
    where
        PolyKind<'a, T>: Member<K>,
    {
        Self {
            union: TaggedUnion::with(kind),
        }
    }

    /// Stores an unchecked pointer.
    ///
    /// # Safety
    ///
    /// See [`RawRef::new`].
    #[inline]
    pub unsafe fn from_raw(ptr: NonNull<T>) -> Self {
        // SAFETY: forwarded to the caller.
        Self::new(unsafe { RawRef::new(ptr) })
    }

    /// Stores any [`DereferenceMut`] kind, type-erased.
    #[inline]
    pub fn from_any(ptr: impl DereferenceMut<T> + 'a) -> Self {
        Self::new(AnyPtr::new(ptr))
    }

    /// Returns `true` if the stored kind is `K`.
    #[inline]
    pub fn is<K>(&self) -> bool
    where
        PolyKind<'a, T>: Member<K>,
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
        PolyKind<'a, T>: Member<K>,
    {
        self.union.get::<K>()
    }

    /// Returns the stored kind mutably.
    ///
    /// # Errors
    ///
    /// [`TypeMismatchError`] if another kind is stored.
    #[inline]
    pub fn get_mut<K>(&mut self) -> Result<&mut K, TypeMismatchError>
    where
        PolyKind<'a, T>: Member<K>,
    {
        self.union.get_mut::<K>()
    }

    /// The identity of the stored kind.
    #[inline]
    pub fn tag(&self) -> Option<PolyTag> {
        self.union.tag()
    }

    /// The type name of the stored kind.
    #[inline]
    pub fn kind_name(&self) -> &'static str {
        self.union.type_name().unwrap_or_default()
    }

    /// Gives back the stored kind.
    #[inline]
    pub fn into_kind(self) -> Option<PolyKind<'a, T>> {
        self.union.into_kind()
    }
}

impl<T> Dereference<T> for PolyRef<'_, T> {
    #[inline]
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        self.union
            .as_kind()
            .ok_or_else(NullReferenceError::of::<T>)?
            .dereference()
    }
}

impl<T> DereferenceMut<T> for PolyRef<'_, T> {
    #[inline]
    fn dereference_mut(&mut self) -> Result<TargetMut<'_, T>, NullReferenceError> {
        self.union
            .as_kind_mut()
            .ok_or_else(NullReferenceError::of::<T>)?
            .dereference_mut()
    }
}

impl<T> fmt::Debug for PolyRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PolyRef").field(&self.kind_name()).finish()
    }
}

// -----------------------------------------------------------------------------
// PolyConstRef

/// A read-only reference to `T` of any kind in [`PolyConstKind`].
///
/// Everything a [`PolyRef`] accepts converts into a `PolyConstRef`, with
/// mutable handles turned into their const counterparts. There is no way
/// back.
pub struct PolyConstRef<'a, T> {
    pub(crate) union: TaggedUnion<PolyConstKind<'a, T>>,
}

impl<'a, T> PolyConstRef<'a, T> {
    /// Stores `kind`.
    #[inline]
    pub fn new<K>(kind: K) -> Self
    where
        PolyConstKind<'a, T>: Member<K>,
    {
        Self {
            union: TaggedUnion::with(kind),
        }
    }

    /// Stores an unchecked pointer.
    ///
    /// # Safety
    ///
    /// See [`RawConstRef::new`].
    #[inline]
    pub unsafe fn from_raw(ptr: NonNull<T>) -> Self {
        // SAFETY: forwarded to the caller.
        Self::new(unsafe { RawConstRef::new(ptr) })
    }

    /// Stores any [`Dereference`] kind, type-erased.
    #[inline]
    pub fn from_any(ptr: impl Dereference<T> + 'a) -> Self {
        Self::new(AnyConstPtr::new(ptr))
    }

    /// Returns `true` if the stored kind is `K`.
    #[inline]
    pub fn is<K>(&self) -> bool
    where
        PolyConstKind<'a, T>: Member<K>,
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
        PolyConstKind<'a, T>: Member<K>,
    {
        self.union.get::<K>()
    }

    /// The identity of the stored kind.
    #[inline]
    pub fn tag(&self) -> Option<PolyConstTag> {
        self.union.tag()
    }

    /// The type name of the stored kind.
    #[inline]
    pub fn kind_name(&self) -> &'static str {
        self.union.type_name().unwrap_or_default()
    }

    /// Gives back the stored kind.
    #[inline]
    pub fn into_kind(self) -> Option<PolyConstKind<'a, T>> {
        self.union.into_kind()
    }
}

impl<T> Dereference<T> for PolyConstRef<'_, T> {
    #[inline]
    fn dereference(&self) -> Result<Target<'_, T>, NullReferenceError> {
        self.union
            .as_kind()
            .ok_or_else(NullReferenceError::of::<T>)?
            .dereference()
    }
}

impl<T> fmt::Debug for PolyConstRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PolyConstRef").field(&self.kind_name()).finish()
    }
}

// -----------------------------------------------------------------------------
// Conversions

macro_rules! impl_from_kind {
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

impl_from_kind! {
    PolyRef, PolyKind;
    &'a mut T,
    TrackedPtr<T>,
    TrackedNotNullPtr<T>,
    TrackedFixedPtr<T>,
    Rc<RefCell<T>>,
    RawRef<'a, T>,
    AnyPtr<'a, T>,
}

impl_from_kind! {
    PolyConstRef, PolyConstKind;
    &'a T,
    TrackedConstPtr<T>,
    TrackedNotNullConstPtr<T>,
    TrackedFixedConstPtr<T>,
    Rc<RefCell<T>>,
    Arc<T>,
    RawConstRef<'a, T>,
    AnyConstPtr<'a, T>,
}

/// Accepts the mutable kinds by converting them to their const form.
macro_rules! impl_from_mutable_kind {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<'a, T> From<$ty> for PolyConstRef<'a, T> {
                #[inline]
                fn from(value: $ty) -> Self {
                    Self::from(PolyConstKind::from(PolyKind::from(value)))
                }
            }
        )*
    };
}

impl_from_mutable_kind! {
    &'a mut T,
    TrackedPtr<T>,
    TrackedNotNullPtr<T>,
    TrackedFixedPtr<T>,
    RawRef<'a, T>,
    AnyPtr<'a, T>,
}

impl<'a, T> From<PolyRef<'a, T>> for PolyConstRef<'a, T> {
    fn from(poly: PolyRef<'a, T>) -> Self {
        Self {
            union: match poly.union.into_kind() {
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
    use alloc::boxed::Box;
    use alloc::format;
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::sync::Arc;
    use core::cell::RefCell;
    use core::ptr::NonNull;

    use proptest::prelude::*;
    use tether_registered::{Tracked, TrackedConstPtr, TrackedPtr};

    use super::{PolyConstRef, PolyConstTag, PolyRef, PolyTag};
    use crate::{AnyPtr, Dereference, DereferenceMut, UpcastMut};

    fn read(poly: &PolyConstRef<'_, i64>) -> i64 {
        *poly.dereference().unwrap()
    }

    fn write(poly: &mut PolyRef<'_, i64>, value: i64) {
        *poly.dereference_mut().unwrap() = value;
    }

    #[test]
    fn aliasing_not_copying() {
        let object = Tracked::new(5_i64);
        let ptr = object.ptr();
        let poly = PolyRef::from(ptr.clone());
        assert_eq!(*poly.dereference().unwrap(), *ptr.borrow().unwrap());

        object.set(6);
        assert_eq!(*poly.dereference().unwrap(), 6);

        drop(object);
        assert!(poly.dereference().is_err());
    }

    #[test]
    fn every_kind_is_accepted() {
        let object = Tracked::new(0_i64);
        let shared = Rc::new(RefCell::new(0_i64));
        let mut local = 0_i64;
        let mut raw_target = 0_i64;

        {
            let mut polys = [
                PolyRef::from(object.ptr()),
                PolyRef::from(object.not_null_ptr()),
                PolyRef::from(object.fixed_ptr()),
                PolyRef::from(Rc::clone(&shared)),
                PolyRef::from(&mut local),
                // SAFETY: `raw_target` is only reached through this value.
                unsafe { PolyRef::from_raw(NonNull::from(&mut raw_target)) },
                PolyRef::from_any(Box::new(0_i64)),
            ];
            for (value, poly) in (1..).zip(&mut polys) {
                write(poly, value);
                assert_eq!(*(*poly).dereference().unwrap(), value);
            }
        }

        assert_eq!(object.get(), 3);
        assert_eq!(*shared.borrow(), 4);
        assert_eq!(local, 5);
        assert_eq!(raw_target, 6);
    }

    fn read_shared(poly: &PolyRef<'_, i64>) -> i64 {
        *poly.dereference().unwrap()
    }

    fn read_exclusive(poly: &mut PolyRef<'_, i64>) -> i64 {
        let value: i64 = *(*poly).dereference().unwrap();
        *poly.dereference_mut().unwrap() += 1;
        value
    }

    #[test]
    fn access_through_references_reaches_the_target() {
        let object = Tracked::new(10_i64);
        let mut poly = PolyRef::from(object.ptr());

        assert_eq!(read_shared(&poly), 10);
        assert_eq!(read_exclusive(&mut poly), 10);
        assert_eq!(read_shared(&poly), 11);

        let view = PolyConstRef::from(object.const_ptr());
        let by_ref = &view;
        let seen: i64 = *by_ref.dereference().unwrap();
        assert_eq!(seen, 11);
    }

    #[test]
    fn stored_kind_is_inspectable() {
        let object = Tracked::new(1_i64);
        let mut poly = PolyRef::from(object.ptr());

        assert!(poly.is::<TrackedPtr<i64>>());
        assert!(!poly.is::<Rc<RefCell<i64>>>());
        assert_eq!(poly.tag(), Some(PolyTag::Tracked));
        assert!(poly.kind_name().contains("TrackedPtr"));
        assert!(poly.get::<Rc<RefCell<i64>>>().is_err());

        let other = Tracked::new(2_i64);
        poly.get_mut::<TrackedPtr<i64>>().unwrap().retarget(&other);
        assert_eq!(*poly.dereference().unwrap(), 2);
        assert_eq!(object.handle_count(), 0);
    }

    #[test]
    fn const_ref_accepts_mutable_kinds() {
        let object = Tracked::new(7_i64);
        let mut local = 8_i64;

        let from_handle = PolyConstRef::from(object.ptr());
        assert_eq!(from_handle.tag(), Some(PolyConstTag::Tracked));
        assert!(from_handle.is::<TrackedConstPtr<i64>>());
        assert_eq!(read(&from_handle), 7);

        let from_poly = PolyConstRef::from(PolyRef::from(&mut local));
        assert_eq!(from_poly.tag(), Some(PolyConstTag::Borrowed));
        assert_eq!(read(&from_poly), 8);

        assert_eq!(read(&PolyConstRef::from(Arc::new(9_i64))), 9);
        assert_eq!(read(&PolyConstRef::from(&10_i64)), 10);
        assert_eq!(read(&PolyConstRef::from(AnyPtr::new(Box::new(11_i64)))), 11);
        assert_eq!(read(&PolyConstRef::from_any(Rc::new(12_i64))), 12);
    }

    struct Named {
        name: String,
    }

    fn name(named: &Named) -> &String {
        &named.name
    }

    fn name_mut(named: &mut Named) -> &mut String {
        &mut named.name
    }

    #[test]
    fn projections_join_the_set() {
        let object = Tracked::new(Named {
            name: String::from("old"),
        });
        let mut poly = PolyRef::from_any(UpcastMut::<_, Named, String>::new(
            object.ptr(),
            name,
            name_mut,
        ));

        poly.dereference_mut().unwrap().push_str("er");
        assert_eq!(object.borrow().name, "older");
        assert_eq!(format!("{poly:?}"), format!("PolyRef({:?})", poly.kind_name()));
    }

    proptest! {
        #[test]
        fn all_kinds_see_the_same_target(value in any::<i64>()) {
            let object = Tracked::new(value);
            let polys = [
                PolyConstRef::from(object.ptr()),
                PolyConstRef::from(object.const_ptr()),
                PolyConstRef::from(object.not_null_const_ptr()),
                PolyConstRef::from(object.fixed_const_ptr()),
                PolyConstRef::from(PolyRef::from(object.fixed_ptr())),
                PolyConstRef::from_any(object.const_ptr()),
            ];
            for poly in &polys {
                prop_assert_eq!(read(poly), value);
            }

            let new_value = value.wrapping_add(1);
            object.set(new_value);
            for poly in &polys {
                prop_assert_eq!(read(poly), new_value);
            }

            drop(object);
            for poly in &polys {
                prop_assert!(poly.dereference().is_err());
            }
        }
    }
}
