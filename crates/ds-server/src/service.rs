//! Stream access service.
//!
//! Composes the path resolver, the manifest prober, the device status gate
//! and the frame extractor into the four operations the HTTP routes expose.

use std::sync::Arc;

use ds_av::FrameExtractor;
use ds_core::{DeviceId, Error, PathResolver, Result, StreamKind, StreamLocation};

use crate::probe::LocationProber;
use crate::registry::DeviceStatusGate;

#[derive(Clone)]
pub struct StreamAccessService {
    resolver: Arc<PathResolver>,
    prober: Arc<dyn LocationProber>,
    gate: DeviceStatusGate,
    extractor: Arc<dyn FrameExtractor>,
}

impl StreamAccessService {
    pub fn new(
        resolver: Arc<PathResolver>,
        prober: Arc<dyn LocationProber>,
        gate: DeviceStatusGate,
        extractor: Arc<dyn FrameExtractor>,
    ) -> Self {
        Self {
            resolver,
            prober,
            gate,
            extractor,
        }
    }

    /// DASH manifest location, only if the manifest currently exists.
    pub async fn get_dash_manifest(&self, device: DeviceId) -> Result<StreamLocation> {
        self.probed_location(device, StreamKind::Dash).await
    }

    /// HLS manifest location, only if the manifest currently exists.
    pub async fn get_hls_manifest(&self, device: DeviceId) -> Result<StreamLocation> {
        self.probed_location(device, StreamKind::Hls).await
    }

    /// RTMP ingest location. Never probed; live endpoints cannot be checked
    /// with a plain existence test.
    pub fn get_rtmp_location(&self, device: DeviceId) -> StreamLocation {
        self.resolver.resolve(device, StreamKind::Rtmp)
    }

    /// Extract `count` frames from a streaming device and return their URIs.
    ///
    /// - device unknown or not streaming: [`Error::NotFound`], no extraction
    /// - invalid `count`: [`Error::Validation`]
    /// - extraction failed: [`Error::ExtractionFailed`]
    pub async fn get_frames(&self, device: DeviceId, count: i64) -> Result<Vec<String>> {
        if !self.gate.is_streaming(device).await {
            tracing::warn!(device = %device, "Frame request for device that is not streaming");
            return Err(Error::not_found("streaming device", device));
        }

        match self.extractor.extract(device, count).await {
            Ok(result) if result.success => {
                tracing::debug!(device = %device, frames = result.uris.len(), "Returning frame URIs");
                Ok(result.uris)
            }
            Ok(_) => Err(Error::ExtractionFailed),
            Err(e @ Error::Validation(_)) => Err(e),
            Err(e) => {
                tracing::error!(device = %device, "Frame extractor error: {e}");
                Err(Error::ExtractionFailed)
            }
        }
    }

    async fn probed_location(&self, device: DeviceId, kind: StreamKind) -> Result<StreamLocation> {
        let location = self.resolver.resolve(device, kind);
        if self.prober.exists(&location).await {
            Ok(location)
        } else {
            tracing::warn!(device = %device, kind = %kind, location = %location, "Manifest not available");
            Err(Error::not_found(format!("{kind} manifest"), device))
        }
    }
}
