//! Runtime error types
//!
//! Load-time failures abort the game load and carry the originating asset
//! path; per-frame failures are logged at the call site and the frame
//! continues with the previous content.

use std::fmt;
use wgslbox_dialect::DialectError;

/// Errors surfaced while loading or running a game
#[derive(Debug)]
pub enum EngineError {
    /// The dialect preprocessor rejected the source
    Preprocess(DialectError),
    /// The generated WGSL failed validation
    ShaderCompile {
        /// Validator output
        message: String,
    },
    /// A referenced image could not be decoded
    ImageDecode {
        /// Asset path as referenced by the game
        path: String,
        /// Decoder output
        message: String,
    },
    /// A referenced sound could not be decoded
    AudioDecode {
        /// Asset path as referenced by the game
        path: String,
        /// Decoder output
        message: String,
    },
    /// A referenced OBJ model could not be parsed
    ObjParse {
        /// Asset path as referenced by the game
        path: String,
        /// Parser output
        message: String,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preprocess(inner) => write!(f, "{inner}"),
            Self::ShaderCompile { message } => write!(f, "Generated shader failed to compile: {message}"),
            Self::ImageDecode { path, message } => write!(f, "Failed to decode image {path}: {message}"),
            Self::AudioDecode { path, message } => write!(f, "Failed to decode sound {path}: {message}"),
            Self::ObjParse { path, message } => write!(f, "Failed to parse model {path}: {message}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Preprocess(inner) => Some(inner),
            _ => None,
        }
    }
}

impl From<DialectError> for EngineError {
    fn from(error: DialectError) -> Self {
        Self::Preprocess(error)
    }
}
