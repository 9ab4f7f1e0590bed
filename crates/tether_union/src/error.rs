use thiserror::Error;

// -----------------------------------------------------------------------------
// Error

/// Typed access asked for a member type that is not the active one.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TypeMismatchError {
    #[error("requested `{requested}` but the union holds `{active}`")]
    WrongType {
        requested: &'static str,
        active: &'static str,
    },

    #[error("requested `{requested}` from an empty union")]
    Empty { requested: &'static str },
}

impl TypeMismatchError {
    /// The type name that was asked for.
    pub const fn requested(&self) -> &'static str {
        match self {
            Self::WrongType { requested, .. } | Self::Empty { requested } => requested,
        }
    }
}
