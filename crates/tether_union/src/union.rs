use core::any::type_name;
use core::fmt;

use crate::{Member, TypeMismatchError, UnionKind};

// -----------------------------------------------------------------------------
// TaggedUnion

/// Inline storage for at most one value of the member list `K`.
///
/// The union is either empty or holds exactly one live member together with
/// that member's tag. Storage is the enum `K` itself, so its size is the size
/// of the largest member plus the discriminant.
///
/// - [`set`](Self::set) drops the current member before storing the new one.
/// - [`get`](Self::get) is type-checked against the active tag.
/// - [`Clone`] copies the active member under the same tag.
/// - [`take`](Self::take) moves the member out and leaves `self` empty.
pub struct TaggedUnion<K> {
    kind: Option<K>,
}

impl<K: UnionKind> TaggedUnion<K> {
    /// Creates an empty union.
    #[inline]
    pub const fn new() -> Self {
        Self { kind: None }
    }

    /// Creates a union holding `value`.
    #[inline]
    pub fn with<T>(value: T) -> Self
    where
        K: Member<T>,
    {
        Self {
            kind: Some(<K as Member<T>>::from_member(value)),
        }
    }

    /// Returns `true` if a member is stored.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.kind.is_some()
    }

    /// The identity of the active member, if any.
    #[inline]
    pub fn tag(&self) -> Option<K::Tag> {
        self.kind.as_ref().map(K::tag)
    }

    /// The type name of the active member, if any.
    #[inline]
    pub fn type_name(&self) -> Option<&'static str> {
        self.kind.as_ref().map(K::type_name)
    }

    /// Returns `true` if the active member is `T`.
    #[inline]
    pub fn is<T>(&self) -> bool
    where
        K: Member<T>,
    {
        self.tag() == Some(<K as Member<T>>::TAG)
    }

    /// Replaces the stored member with `value`.
    ///
    /// The previous member, if any, is dropped before `value` is stored.
    pub fn set<T>(&mut self, value: T)
    where
        K: Member<T>,
    {
        self.kind = None;
        self.kind = Some(<K as Member<T>>::from_member(value));
    }

    /// Drops the stored member, then stores the value produced by `f`.
    ///
    /// Unlike [`set`](Self::set), the new value is only constructed after
    /// the old one is gone.
    pub fn set_with<T>(&mut self, f: impl FnOnce() -> T)
    where
        K: Member<T>,
    {
        self.kind = None;
        self.kind = Some(<K as Member<T>>::from_member(f()));
    }

    /// Returns the stored `T`.
    ///
    /// # Errors
    ///
    /// [`TypeMismatchError`] if the union is empty or holds another member.
    pub fn get<T>(&self) -> Result<&T, TypeMismatchError>
    where
        K: Member<T>,
    {
        let Some(kind) = &self.kind else {
            return Err(TypeMismatchError::Empty {
                requested: type_name::<T>(),
            });
        };
        <K as Member<T>>::as_member(kind).ok_or_else(|| TypeMismatchError::WrongType {
            requested: type_name::<T>(),
            active: kind.type_name(),
        })
    }

    /// Returns the stored `T` mutably.
    ///
    /// # Errors
    ///
    /// [`TypeMismatchError`] if the union is empty or holds another member.
    pub fn get_mut<T>(&mut self) -> Result<&mut T, TypeMismatchError>
    where
        K: Member<T>,
    {
        let Some(kind) = &mut self.kind else {
            return Err(TypeMismatchError::Empty {
                requested: type_name::<T>(),
            });
        };
        let active = kind.type_name();
        <K as Member<T>>::as_member_mut(kind).ok_or(TypeMismatchError::WrongType {
            requested: type_name::<T>(),
            active,
        })
    }

    /// Moves the stored `T` out, leaving the union empty.
    ///
    /// # Errors
    ///
    /// [`TypeMismatchError`] if the union is empty or holds another member.
    /// The union is left unchanged in that case.
    pub fn take_as<T>(&mut self) -> Result<T, TypeMismatchError>
    where
        K: Member<T>,
    {
        let Some(kind) = self.kind.take() else {
            return Err(TypeMismatchError::Empty {
                requested: type_name::<T>(),
            });
        };
        <K as Member<T>>::into_member(kind).map_err(|kind| {
            let active = kind.type_name();
            self.kind = Some(kind);
            TypeMismatchError::WrongType {
                requested: type_name::<T>(),
                active,
            }
        })
    }

    /// Moves the whole union out, leaving `self` empty.
    #[inline]
    pub fn take(&mut self) -> Self {
        Self {
            kind: self.kind.take(),
        }
    }

    /// Drops the stored member, if any.
    #[inline]
    pub fn clear(&mut self) {
        self.kind = None;
    }

    /// The raw member list value, for exhaustive matching.
    #[inline]
    pub const fn as_kind(&self) -> Option<&K> {
        self.kind.as_ref()
    }

    /// The raw member list value, for exhaustive matching.
    #[inline]
    pub fn as_kind_mut(&mut self) -> Option<&mut K> {
        self.kind.as_mut()
    }

    /// Consumes the union, returning the raw member list value.
    #[inline]
    pub fn into_kind(self) -> Option<K> {
        self.kind
    }
}

// -----------------------------------------------------------------------------
// Traits

impl<K: UnionKind> Default for TaggedUnion<K> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: UnionKind> From<K> for TaggedUnion<K> {
    #[inline]
    fn from(kind: K) -> Self {
        Self { kind: Some(kind) }
    }
}

impl<K: Clone> Clone for TaggedUnion<K> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
        }
    }
}

impl<K: PartialEq> PartialEq for TaggedUnion<K> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl<K: fmt::Debug> fmt::Debug for TaggedUnion<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Some(kind) => f.debug_tuple("TaggedUnion").field(kind).finish(),
            None => f.write_str("TaggedUnion(<empty>)"),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use super::TaggedUnion;
    use crate::{Member, TypeMismatchError, UnionKind};

    crate::tagged_union! {
        #[derive(Clone, Debug, PartialEq)]
        enum Number: NumberTag {
            Int(i32),
            Float(f64),
            Text(&'static str),
        }
    }

    #[test]
    fn set_then_get() {
        let mut u = TaggedUnion::<Number>::new();
        assert!(!u.is_valid());

        u.set(42_i32);
        assert!(u.is_valid());
        assert!(u.is::<i32>());
        assert_eq!(u.get::<i32>(), Ok(&42));
        assert_eq!(u.tag(), Some(NumberTag::Int));
        assert_eq!(u.type_name(), Some("i32"));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let u = TaggedUnion::<Number>::with(42_i32);
        assert_eq!(
            u.get::<f64>(),
            Err(TypeMismatchError::WrongType {
                requested: "f64",
                active: "i32",
            })
        );

        let empty = TaggedUnion::<Number>::new();
        assert_eq!(
            empty.get::<i32>(),
            Err(TypeMismatchError::Empty { requested: "i32" })
        );
    }

    #[test]
    fn set_switches_active_member() {
        let mut u = TaggedUnion::<Number>::with(1_i32);
        u.set(2.5_f64);
        assert!(u.get::<i32>().is_err());
        assert_eq!(u.get::<f64>(), Ok(&2.5));

        *u.get_mut::<f64>().unwrap() += 1.0;
        assert_eq!(u.get::<f64>(), Ok(&3.5));
        assert!(u.get_mut::<&'static str>().is_err());
    }

    #[test]
    fn clone_keeps_tag_and_value() {
        let u = TaggedUnion::<Number>::with("tether");
        let copy = u.clone();
        assert_eq!(copy.tag(), u.tag());
        assert_eq!(copy.get::<&'static str>(), Ok(&"tether"));
        assert_eq!(copy, u);
    }

    #[test]
    fn take_moves_and_empties_source() {
        let mut u = TaggedUnion::<Number>::with(7_i32);
        let moved = u.take();
        assert!(!u.is_valid());
        assert_eq!(u.tag(), None);
        assert_eq!(moved.get::<i32>(), Ok(&7));
    }

    #[test]
    fn take_as_checks_type() {
        let mut u = TaggedUnion::<Number>::with(7_i32);
        assert!(u.take_as::<f64>().is_err());
        assert!(u.is::<i32>());
        assert_eq!(u.take_as::<i32>(), Ok(7));
        assert!(!u.is_valid());
    }

    #[test]
    fn kind_glue() {
        let kind = Number::from_member(1.5_f64);
        assert_eq!(kind.tag(), <Number as Member<f64>>::TAG);
        assert!(kind.type_name().ends_with("f64"));
        assert!(matches!(
            Member::<i32>::into_member(kind),
            Err(Number::Float(_))
        ));
    }

    static DROPS: AtomicUsize = AtomicUsize::new(0);

    struct Loud(u8);

    impl Drop for Loud {
        fn drop(&mut self) {
            DROPS.fetch_add(1, Ordering::SeqCst);
        }
    }

    crate::tagged_union! {
        enum Noisy: NoisyTag {
            Loud(Loud),
            Quiet(u8),
        }
    }

    #[test]
    fn set_and_clear_drop_previous_member() {
        let mut u = TaggedUnion::<Noisy>::with(Loud(1));
        assert_eq!(u.get::<Loud>().map(|l| l.0), Ok(1));

        u.set(Loud(2));
        assert_eq!(DROPS.load(Ordering::SeqCst), 1);

        u.set_with(|| {
            // The previous member is gone before the new one is built.
            assert_eq!(DROPS.load(Ordering::SeqCst), 2);
            3_u8
        });
        assert_eq!(u.get::<u8>(), Ok(&3));

        u.set(Loud(4));
        u.clear();
        assert_eq!(DROPS.load(Ordering::SeqCst), 3);

        drop(TaggedUnion::<Noisy>::with(Loud(5)));
        assert_eq!(DROPS.load(Ordering::SeqCst), 4);
    }
}
