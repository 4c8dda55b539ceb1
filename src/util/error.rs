//! Error types for the lumen library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for tree construction, packing and caching.
#[derive(Error, Debug)]
pub enum Error {
    /// A tree was requested over a collection with no elements
    #[error("Cannot build a {0} over an empty collection")]
    EmptyInput(&'static str),

    /// `pack()` was called on a tree that is already in packed form
    #[error("Tree is already packed")]
    AlreadyPacked,

    /// Operation needs the packed form but the tree is still linked
    #[error("Tree is not packed")]
    NotPacked,

    /// Cache file was written by a build with a different node layout
    #[error("Node size mismatch: expected {expected} bytes, file has {found}")]
    NodeSizeMismatch { expected: usize, found: usize },

    /// Cache file is truncated or references nodes outside its array
    #[error("Invalid tree file: {0}")]
    InvalidFormat(String),

    /// Cache or settings file does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Settings file could not be parsed
    #[error("Invalid settings: {0}")]
    Settings(#[from] serde_json::Error),

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid format error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }
}

/// Result type alias for lumen operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::NodeSizeMismatch { expected: 64, found: 56 };
        assert!(e.to_string().contains("64"));
        assert!(e.to_string().contains("56"));

        let e = Error::EmptyInput("BVH");
        assert!(e.to_string().contains("BVH"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
