//! Owned objects that invalidate their non-owning handles on destruction.
//!
//! **Tracked**
//!
//! [`Tracked<V>`] owns a value together with a [`RegistrationList`] of every
//! handle that currently points at it. Dropping the `Tracked` walks that list
//! once and turns each handle null before the value itself is dropped.
//!
//! **Handles**
//!
//! [`TrackedPtr`], [`TrackedNotNullPtr`] and [`TrackedFixedPtr`] give mutable
//! access; the `Const` kinds give shared access only. A handle never keeps
//! its target alive and never dangles: after the target is gone every access
//! returns [`NullReferenceError`].
//!
//! **Registration lists**
//!
//! Each handle embeds an [`InvalidationNode`], a generational key into a
//! per-thread arena. Lists thread their nodes through that arena, so neither
//! handles nor objects depend on staying at a fixed address.
//!
//! **AllocationRegistry**
//!
//! [`AllocationRegistry`] creates heap objects that are owned by nobody but
//! the ledger, and destroys them through any of their handles.
//!
//! Everything here is single-threaded. All types are `!Send` and `!Sync`.
#![expect(unsafe_code, reason = "Handles reach their targets through raw pointers.")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;
extern crate std;

// -----------------------------------------------------------------------------
// Modules

mod error;
mod handle;
mod list;
mod node;
mod registry;
mod tracked;

// -----------------------------------------------------------------------------
// Top-level exports

pub use error::{AccessError, InvalidDeallocationError, NullReferenceError};
pub use handle::{
    TrackedConstPtr, TrackedFixedConstPtr, TrackedFixedPtr, TrackedHandle, TrackedNotNullConstPtr,
    TrackedNotNullPtr, TrackedPtr,
};
pub use list::{ListId, RegistrationList};
pub use node::{InvalidationNode, NodeKey};
pub use registry::AllocationRegistry;
pub use tracked::Tracked;
