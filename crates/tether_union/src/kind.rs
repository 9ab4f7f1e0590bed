use core::fmt::Debug;
use core::hash::Hash;

// -----------------------------------------------------------------------------
// UnionKind

/// The closed member list of a [`TaggedUnion`](crate::TaggedUnion).
///
/// Implemented by an enum with one single-field variant per member type.
/// Usually generated by [`tagged_union!`](crate::tagged_union), but generic
/// member lists (which the macro does not cover) implement it by hand.
pub trait UnionKind: Sized {
    /// A field-less identity for each member.
    type Tag: Copy + Eq + Hash + Debug;

    /// The identity of the member stored in `self`.
    fn tag(&self) -> Self::Tag;

    /// The type name of the member stored in `self`.
    fn type_name(&self) -> &'static str;
}

// -----------------------------------------------------------------------------
// Member

/// States that `T` is one of the members of the list `Self`.
///
/// Implemented once per member type, which is what keeps member identities
/// distinct. The list is the implementing type, so generic lists may name
/// members such as `&'a mut T` without running into coherence limits.
pub trait Member<T>: UnionKind {
    /// The identity of `T` in this list.
    const TAG: Self::Tag;

    /// Wraps `value` into the list.
    fn from_member(value: T) -> Self;

    /// Returns the stored value if `self` holds `T`.
    fn as_member(&self) -> Option<&T>;

    /// Returns the stored value if `self` holds `T`.
    fn as_member_mut(&mut self) -> Option<&mut T>;

    /// Unwraps the stored value, or gives `self` back unchanged.
    fn into_member(self) -> Result<T, Self>;
}

// -----------------------------------------------------------------------------
// Macro

/// Declares a member-list enum, its tag enum, and the glue impls.
///
/// The syntax is `enum Name: TagName { Variant(Type), ... }`. Attributes on
/// the enum (such as derives) are kept on the generated `Name`.
///
/// # Examples
///
/// ```
/// use tether_union::{Member, UnionKind, tagged_union};
///
/// tagged_union! {
///     #[derive(Debug)]
///     enum Scalar: ScalarTag {
///         Byte(u8),
///         Wide(u64),
///     }
/// }
///
/// let kind = Scalar::from_member(7_u64);
/// assert_eq!(kind.tag(), ScalarTag::Wide);
/// assert_eq!(<Scalar as Member<u64>>::TAG, ScalarTag::Wide);
/// assert_eq!(Member::<u64>::as_member(&kind), Some(&7));
/// assert_eq!(Member::<u8>::as_member(&kind), None);
/// ```
#[macro_export]
macro_rules! tagged_union {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $tag:ident {
            $( $(#[$vmeta:meta])* $variant:ident($ty:ty) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $( $(#[$vmeta])* $variant($ty), )+
        }

        #[doc = concat!("Member identity of [`", stringify!($name), "`].")]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        $vis enum $tag {
            $( $variant, )+
        }

        impl $crate::UnionKind for $name {
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
                    $( Self::$variant(_) => ::core::any::type_name::<$ty>(), )+
                }
            }
        }

        $(
            impl $crate::Member<$ty> for $name {
                const TAG: $tag = $tag::$variant;

                #[inline]
                fn from_member(value: $ty) -> Self {
                    Self::$variant(value)
                }

                #[inline]
                fn as_member(&self) -> ::core::option::Option<&$ty> {
                    match self {
                        Self::$variant(value) => ::core::option::Option::Some(value),
                        #[allow(unreachable_patterns)]
                        _ => ::core::option::Option::None,
                    }
                }

                #[inline]
                fn as_member_mut(&mut self) -> ::core::option::Option<&mut $ty> {
                    match self {
                        Self::$variant(value) => ::core::option::Option::Some(value),
                        #[allow(unreachable_patterns)]
                        _ => ::core::option::Option::None,
                    }
                }

                #[inline]
                fn into_member(self) -> ::core::result::Result<$ty, Self> {
                    match self {
                        Self::$variant(value) => ::core::result::Result::Ok(value),
                        #[allow(unreachable_patterns)]
                        other => ::core::result::Result::Err(other),
                    }
                }
            }
        )+
    };
}
