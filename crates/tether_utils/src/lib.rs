//! Small support containers shared by the `tether` crates.
//!
//! - [`hash`]: fixed-seed and pass-through hash states plus `hashbrown`
//!   container aliases that use them.
//! - [`TypeIdMap`]: a map keyed by [`TypeId`](core::any::TypeId), used to keep
//!   one ledger per concrete type.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod typeid_map;

pub mod hash;

// -----------------------------------------------------------------------------
// Top-level exports

pub use typeid_map::TypeIdMap;
