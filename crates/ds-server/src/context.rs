//! Application context shared by all route handlers via Axum state.

use std::sync::Arc;

use ds_av::{FfmpegFrameExtractor, FrameExtractor, ToolRegistry};
use ds_core::config::Config;
use ds_core::{PathResolver, Result};

use crate::probe::{HttpLocationProber, LocationProber};
use crate::registry::{registry_from_config, DeviceRegistry, DeviceStatusGate};
use crate::service::StreamAccessService;

/// Cheaply cloneable; holds only `Arc`s.
#[derive(Clone)]
pub struct AppContext {
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// Stream location resolver.
    pub resolver: Arc<PathResolver>,
    /// Stream access operations.
    pub streams: StreamAccessService,
    /// External tool registry.
    pub tools: Arc<ToolRegistry>,
}

impl AppContext {
    /// Wire up the production components described by `config`.
    pub fn from_config(config: Config, tools: Arc<ToolRegistry>) -> Result<Self> {
        let registry = registry_from_config(&config.registry)?;
        let prober: Arc<dyn LocationProber> =
            Arc::new(HttpLocationProber::new(config.probe.timeout())?);
        Self::with_components(config, tools, registry, prober, None)
    }

    /// Like [`AppContext::from_config`] but with caller-supplied registry and
    /// prober, and optionally a custom extractor.
    pub fn with_components(
        config: Config,
        tools: Arc<ToolRegistry>,
        registry: Arc<dyn DeviceRegistry>,
        prober: Arc<dyn LocationProber>,
        extractor: Option<Arc<dyn FrameExtractor>>,
    ) -> Result<Self> {
        let resolver = Arc::new(PathResolver::new(&config.streams)?);
        let extractor = match extractor {
            Some(e) => e,
            None => Arc::new(FfmpegFrameExtractor::new(
                resolver.clone(),
                &tools,
                &config.frames,
            )),
        };

        let streams = StreamAccessService::new(
            resolver.clone(),
            prober,
            DeviceStatusGate::new(registry),
            extractor,
        );

        Ok(Self {
            config: Arc::new(config),
            resolver,
            streams,
            tools,
        })
    }
}
