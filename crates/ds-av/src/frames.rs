//! Still-frame extraction from a device's live stream.
//!
//! [`FfmpegFrameExtractor`] runs the transcoder against the device's RTMP
//! location and writes `count` JPEG frames into the shared frames directory,
//! named by the device's [`FrameOutputSpec`]. Every failure of the external
//! process (missing binary, non-zero exit, timeout) collapses into an
//! unsuccessful [`FrameExtractionResult`]; the cause is only logged.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ds_core::config::FramesConfig;
use ds_core::{DeviceId, Error, FrameOutputSpec, PathResolver, Result, StreamKind, StreamLocation};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::command::{ToolCommand, ToolError};
use crate::locks::DeviceLocks;
use crate::tools::ToolRegistry;

/// A validated request for `count` frames of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameExtractionRequest {
    pub device: DeviceId,
    pub count: u32,
}

impl FrameExtractionRequest {
    /// Validate a raw frame count. Counts below 1 or above `max_count` are
    /// rejected with [`Error::Validation`].
    pub fn new(device: DeviceId, count: i64, max_count: u32) -> Result<Self> {
        if count <= 0 {
            return Err(Error::Validation(format!(
                "frame count must be positive, got {count}"
            )));
        }
        if count > i64::from(max_count) {
            return Err(Error::Validation(format!(
                "frame count {count} exceeds the maximum of {max_count}"
            )));
        }
        Ok(Self {
            device,
            count: count as u32,
        })
    }
}

/// Outcome of one extraction.
///
/// `uris` lists only frames that exist on disk, in sequence order, and is
/// empty whenever `success` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameExtractionResult {
    pub success: bool,
    pub uris: Vec<String>,
}

impl FrameExtractionResult {
    pub fn failed() -> Self {
        Self {
            success: false,
            uris: Vec::new(),
        }
    }

    pub fn succeeded(uris: Vec<String>) -> Self {
        Self {
            success: true,
            uris,
        }
    }
}

/// Something that can produce frames for a device.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Extract up to `count` frames from `device`'s live stream.
    ///
    /// Returns `Err(Error::Validation)` for an invalid count without starting
    /// any process. All process-level failures are reported as
    /// `Ok(FrameExtractionResult { success: false, .. })`.
    async fn extract(&self, device: DeviceId, count: i64) -> Result<FrameExtractionResult>;
}

/// Build the transcoder argument vector.
///
/// Each element is handed to the process as one `argv` entry; the source
/// location is never split or interpreted, whatever it contains.
pub fn frame_extraction_args(
    source: &StreamLocation,
    count: u32,
    output: &FrameOutputSpec,
) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-nostdin".into(),
        "-y".into(),
        "-i".into(),
        source.location.clone(),
        "-frames:v".into(),
        count.to_string(),
        "-f".into(),
        "image2".into(),
        output.output_template().to_string_lossy().into_owned(),
    ]
}

/// Frame extractor backed by an ffmpeg child process.
pub struct FfmpegFrameExtractor {
    resolver: Arc<PathResolver>,
    program: PathBuf,
    timeout: Duration,
    kill_grace: Duration,
    max_count: u32,
    locks: Arc<DeviceLocks>,
    permits: Arc<Semaphore>,
}

impl FfmpegFrameExtractor {
    pub fn new(resolver: Arc<PathResolver>, tools: &ToolRegistry, config: &FramesConfig) -> Self {
        Self {
            resolver,
            program: tools.ffmpeg(),
            timeout: config.timeout(),
            kill_grace: config.kill_grace(),
            max_count: config.max_count,
            locks: Arc::new(DeviceLocks::new()),
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        }
    }

    /// Use a different transcoder executable.
    pub fn with_program(mut self, program: PathBuf) -> Self {
        self.program = program;
        self
    }

    pub fn locks(&self) -> &Arc<DeviceLocks> {
        &self.locks
    }

    async fn run(&self, request: FrameExtractionRequest) -> FrameExtractionResult {
        let device = request.device;
        let source = self.resolver.resolve(device, StreamKind::Rtmp);
        let output = self.resolver.frame_output_spec(device);

        if let Err(e) = prepare_output(&output, self.max_count).await {
            tracing::error!(
                device = %device,
                dir = %output.directory.display(),
                "Cannot prepare frames directory: {e}"
            );
            return FrameExtractionResult::failed();
        }

        let mut cmd = ToolCommand::new(self.program.clone());
        cmd.args(frame_extraction_args(&source, request.count, &output))
            .timeout(self.timeout)
            .kill_grace(self.kill_grace);

        match cmd.execute().await {
            Ok(_) => {}
            Err(e @ ToolError::Spawn { .. }) => {
                tracing::error!(
                    device = %device,
                    program = %self.program.display(),
                    "Transcoder could not be started: {e}"
                );
                return FrameExtractionResult::failed();
            }
            Err(e) => {
                tracing::warn!(device = %device, "Frame extraction failed: {e}");
                return FrameExtractionResult::failed();
            }
        }

        let produced = collect_frames(&output, request.count).await;
        tracing::info!(
            device = %device,
            requested = request.count,
            produced = produced.len(),
            "Frames extracted"
        );

        FrameExtractionResult::succeeded(
            produced
                .iter()
                .map(|name| self.resolver.frame_uri(name))
                .collect(),
        )
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract(&self, device: DeviceId, count: i64) -> Result<FrameExtractionResult> {
        let request = FrameExtractionRequest::new(device, count, self.max_count)?;

        let _device_guard = self.locks.lock(device).await;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::Internal("extraction semaphore closed".into()))?;

        Ok(self.run(request).await)
    }
}

/// Ensure the output directory exists and remove frames left by an earlier
/// run, so a short run never reports stale files.
async fn prepare_output(output: &FrameOutputSpec, max_count: u32) -> std::io::Result<()> {
    tokio::fs::create_dir_all(&output.directory).await?;

    // Frames are numbered contiguously from 1, so the first gap ends the
    // previous run's files.
    for n in 1..=max_count {
        match tokio::fs::remove_file(output.file_path(n)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => break,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// File names of produced frames, ascending, stopping at the first missing
/// sequence number and never exceeding `count`.
async fn collect_frames(output: &FrameOutputSpec, count: u32) -> Vec<String> {
    let mut names = Vec::new();
    for n in 1..=count {
        match tokio::fs::metadata(output.file_path(n)).await {
            Ok(meta) if meta.is_file() => names.push(output.file_name(n)),
            _ => break,
        }
    }
    names
}
