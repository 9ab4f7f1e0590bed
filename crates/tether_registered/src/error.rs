use core::any::type_name;
use core::cell::{BorrowError, BorrowMutError};

use thiserror::Error;

// -----------------------------------------------------------------------------
// NullReferenceError

/// A handle was dereferenced while it did not refer to a live object.
///
/// Either the handle was never given a target, or its target has been
/// destroyed since.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Null reference to `{type_name}`")]
pub struct NullReferenceError {
    type_name: &'static str,
}

impl NullReferenceError {
    /// Creates an error for a handle to `V`.
    #[inline]
    pub fn of<V: ?Sized>() -> Self {
        Self {
            type_name: type_name::<V>(),
        }
    }

    /// The name of the target type.
    #[inline]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }
}

// -----------------------------------------------------------------------------
// AccessError

/// Failure of a non-panicking access through a handle.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccessError {
    #[error(transparent)]
    Null(#[from] NullReferenceError),

    #[error("Target is already mutably borrowed")]
    Borrowed(#[from] BorrowError),

    #[error("Target is already borrowed")]
    BorrowedMut(#[from] BorrowMutError),
}

// -----------------------------------------------------------------------------
// InvalidDeallocationError

/// A deallocation request that does not match a live allocation.
///
/// Nothing is freed when this error is returned.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidDeallocationError {
    #[error("Cannot deallocate through a null `{type_name}` handle")]
    NullHandle { type_name: &'static str },

    #[error("No `{type_name}` allocation is tracked at {address:#x}")]
    NotTracked {
        type_name: &'static str,
        address: usize,
    },
}
