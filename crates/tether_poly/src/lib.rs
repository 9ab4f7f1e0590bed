//! One reference type for many reference kinds.
//!
//! **Dereference**
//!
//! [`Dereference`] and [`DereferenceMut`] are the common contract: read or
//! write a `T`, or learn that the reference is null. Plain references,
//! boxes, shared pointers, [`Tracked`] objects and every tracked handle
//! implement them.
//!
//! **PolyRef**
//!
//! [`PolyRef`] stores one reference out of the closed set [`PolyKind`] in a
//! [`TaggedUnion`] and forwards every access to it. [`PolyConstRef`] does the
//! same for read-only kinds and accepts everything a `PolyRef` accepts. The
//! stored kind keeps its own semantics: a stored tracked handle still turns
//! null when its object is dropped.
//!
//! [`PolyFixedRef`] and [`PolyFixedConstRef`] take only the kinds that are
//! bound to one target when created: no nullable handles and no open-set
//! erasure. They widen into the general forms.
//!
//! **Open kinds**
//!
//! [`AnyPtr`] and [`AnyConstPtr`] erase any implementor, including
//! [`Upcast`] adapters that present a reference to one type as a reference
//! to another.
//!
//! [`Tracked`]: tether_registered::Tracked
//! [`TaggedUnion`]: tether_union::TaggedUnion
#![expect(unsafe_code, reason = "RawRef stores caller-vouched pointers.")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

#[cfg(test)]
extern crate std;

// -----------------------------------------------------------------------------
// Modules

mod any;
mod deref;
mod fixed;
mod poly;
mod upcast;

// -----------------------------------------------------------------------------
// Top-level exports

pub use any::{AnyConstPtr, AnyPtr, RawConstRef, RawRef};
pub use deref::{Dereference, DereferenceMut, Target, TargetMut};
pub use fixed::{
    PolyFixedConstKind, PolyFixedConstRef, PolyFixedConstTag, PolyFixedKind, PolyFixedRef,
    PolyFixedTag,
};
pub use poly::{PolyConstKind, PolyConstRef, PolyConstTag, PolyKind, PolyRef, PolyTag};
pub use upcast::{Upcast, UpcastMut};
