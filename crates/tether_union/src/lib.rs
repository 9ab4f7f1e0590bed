//! Closed-set tagged unions.
//!
//! A [`TaggedUnion<K>`] holds at most one value drawn from a fixed,
//! compile-time list of member types, together with the identity of the
//! active member. The member list is an ordinary enum `K`; the
//! [`tagged_union!`] macro declares such an enum together with a field-less
//! tag enum and the [`UnionKind`]/[`Member`] impls that connect them.
//!
//! **Typed access**
//!
//! [`TaggedUnion::get`] returns the stored value only when the requested type
//! is the active one, otherwise a [`TypeMismatchError`].
//!
//! **Closed set**
//!
//! Asking for a type outside the member list does not compile, and listing the
//! same type twice produces conflicting [`Member`] impls, so member identities
//! are always distinct.
//!
//! # Examples
//!
//! ```
//! use tether_union::{TaggedUnion, tagged_union};
//!
//! tagged_union! {
//!     #[derive(Clone, Debug, PartialEq)]
//!     pub enum Number: NumberTag {
//!         Int(i32),
//!         Float(f64),
//!     }
//! }
//!
//! let mut u = TaggedUnion::<Number>::new();
//! u.set(42_i32);
//!
//! assert_eq!(u.get::<i32>(), Ok(&42));
//! assert!(u.get::<f64>().is_err());
//! assert_eq!(u.tag(), Some(NumberTag::Int));
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// Modules

mod error;
mod kind;
mod union;

// -----------------------------------------------------------------------------
// Top-level exports

pub use error::TypeMismatchError;
pub use kind::{Member, UnionKind};
pub use union::TaggedUnion;
