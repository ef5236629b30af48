//! Unified error type for devstream.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in devstream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found (or the device is offline).
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "dash manifest", "device").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Frame extraction did not produce a usable result.
    ///
    /// The underlying cause is logged where it happens and deliberately not
    /// carried here, so it never reaches the caller.
    #[error("frame extraction failed")]
    ExtractionFailed,

    /// The configuration is unusable. Only raised during start-up.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The device registry could not be queried.
    #[error("Registry error: {0}")]
    Registry(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (the transcoder) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::ExtractionFailed => 400,
            Error::Config(_) => 500,
            Error::Registry(_) => 500,
            Error::Io { .. } => 500,
            Error::Tool { .. } => 502,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
