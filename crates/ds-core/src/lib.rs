//! ds-core: shared types, IDs, errors, configuration, and stream path
//! resolution.
//!
//! This crate is the foundational dependency for the other ds-* crates. It
//! has no I/O beyond reading the configuration file.

pub mod config;
pub mod error;
pub mod ids;
pub mod paths;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::DeviceId;
pub use paths::{FrameOutputSpec, PathResolver, StreamKind, StreamLocation};
