//! # ds-av
//!
//! External transcoder management and frame extraction for devstream.
//!
//! This crate provides:
//!
//! - **Command execution** ([`ToolCommand`]) -- async builder for running an
//!   external program from a tokenized argument vector, with captured output,
//!   a mandatory timeout, and forced termination.
//! - **Tool discovery** ([`ToolRegistry`]) -- locate the transcoder binary.
//! - **Per-device locking** ([`DeviceLocks`]) -- serialize work that targets
//!   the same device's output files.
//! - **Frame extraction** ([`FrameExtractor`], [`FfmpegFrameExtractor`]) --
//!   materialize still frames from a device's live RTMP stream.

pub mod command;
pub mod frames;
pub mod locks;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolError, ToolOutput};
pub use frames::{
    frame_extraction_args, FfmpegFrameExtractor, FrameExtractionRequest, FrameExtractionResult,
    FrameExtractor,
};
pub use locks::DeviceLocks;
pub use tools::{ToolInfo, ToolRegistry};
