//! Error types for game loading and preprocessing
//!
//! All load-time failures carry the originating path so the host can report
//! which asset or source file broke the load.

use std::fmt;

/// Errors produced while resolving game files or preprocessing the dialect
#[derive(Debug)]
pub enum DialectError {
    /// A directive referenced a file that the resolver does not contain
    AssetNotFound {
        /// Path as written in the directive
        path: String,
    },
    /// A relative path tried to escape the game root
    PathTraversal {
        /// The offending path
        path: String,
    },
    /// An underlying filesystem read failed
    Io {
        /// Path that was being read
        path: String,
        /// The OS error
        source: std::io::Error,
    },
    /// The archive could not be opened or decoded
    Archive {
        /// Archive path or entry name
        path: String,
        /// The zip error
        source: zip::result::ZipError,
    },
    /// A source file was not valid UTF-8
    InvalidUtf8 {
        /// Path of the offending file
        path: String,
    },
    /// A directive's arguments are malformed
    Syntax {
        /// Human-readable description of the malformed directive
        message: String,
    },
}

impl fmt::Display for DialectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssetNotFound { path } => write!(f, "Asset not found: {path}"),
            Self::PathTraversal { path } => write!(f, "Path escapes the game root: {path}"),
            Self::Io { path, source } => write!(f, "Failed to read {path}: {source}"),
            Self::Archive { path, source } => write!(f, "Archive error in {path}: {source}"),
            Self::InvalidUtf8 { path } => write!(f, "File is not valid UTF-8: {path}"),
            Self::Syntax { message } => write!(f, "Preprocess syntax error: {message}"),
        }
    }
}

impl std::error::Error for DialectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Archive { source, .. } => Some(source),
            _ => None,
        }
    }
}
