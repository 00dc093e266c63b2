//! Error types for nsim_core.

use thiserror::Error;

/// Result type alias using nsim_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during namespace operations.
///
/// Every error is recoverable: an operation that returns one has left the
/// tree exactly as it found it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Named entry is absent in the searched directory.
    #[error("Not found: {name}")]
    NotFound { name: String },

    /// Insertion or navigation target is a file.
    #[error("Not a directory: {name}")]
    NotADirectory { name: String },

    /// A file operation named a directory.
    #[error("Is a directory: {name}")]
    IsADirectory { name: String },

    /// Name is already taken in the target directory.
    #[error("'{name}' already exists in '{scope}'")]
    Collision { name: String, scope: String },

    /// Source and target of a move/rename are identical.
    #[error("Source and target are the same: {name}")]
    NoOpRejected { name: String },

    /// A directory would be moved into itself or one of its descendants.
    #[error("Cannot move '{name}' beneath itself")]
    Cycle { name: String },

    /// Parent navigation requested at the root.
    #[error("Already at the root directory")]
    AtRoot,

    /// Name violates the naming rules.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Handle refers to a node that has been released.
    #[error("Stale node handle")]
    StaleHandle,

    /// Destroy requested for a node that is still linked into a directory.
    #[error("Node is still attached: {name}")]
    Attached { name: String },
}

impl Error {
    /// Create a NotFound error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Error::NotFound { name: name.into() }
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(name: impl Into<String>) -> Self {
        Error::NotADirectory { name: name.into() }
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(name: impl Into<String>) -> Self {
        Error::IsADirectory { name: name.into() }
    }

    /// Create a Collision error.
    pub fn collision(name: impl Into<String>, scope: impl Into<String>) -> Self {
        Error::Collision {
            name: name.into(),
            scope: scope.into(),
        }
    }

    /// Create a NoOpRejected error.
    pub fn no_op(name: impl Into<String>) -> Self {
        Error::NoOpRejected { name: name.into() }
    }

    /// Create a Cycle error.
    pub fn cycle(name: impl Into<String>) -> Self {
        Error::Cycle { name: name.into() }
    }

    /// Create an InvalidName error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an Attached error.
    pub fn attached(name: impl Into<String>) -> Self {
        Error::Attached { name: name.into() }
    }

    /// Stable numeric code for front-ends that report errors as values.
    pub fn code(&self) -> u8 {
        match self {
            Error::NotFound { .. } => 2,
            Error::NotADirectory { .. } => 3,
            Error::IsADirectory { .. } => 4,
            Error::Collision { .. } => 5,
            Error::NoOpRejected { .. } => 6,
            Error::Cycle { .. } => 7,
            Error::AtRoot => 8,
            Error::InvalidName { .. } => 9,
            Error::StaleHandle => 10,
            Error::Attached { .. } => 11,
        }
    }
}
