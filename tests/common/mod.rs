//! Shared test harness for integration tests.
//!
//! [`TestHarness`] builds a full [`AppContext`] around a scratch directory:
//! frames land in `<tmp>/frames`, the transcoder is a shell script standing in
//! for ffmpeg, and devices come from a [`StaticDeviceRegistry`] the test can
//! edit. [`TestHarness::with_server`] serves the router on a random port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ds_av::ToolRegistry;
use ds_core::config::Config;
use ds_core::DeviceId;
use ds_server::context::AppContext;
use ds_server::probe::HttpLocationProber;
use ds_server::registry::{DeviceDetails, StaticDeviceRegistry};
use ds_server::router::build_router;
use tempfile::TempDir;

pub const DEVICE: &str = "11111111-1111-1111-1111-111111111111";
pub const OTHER_DEVICE: &str = "22222222-2222-2222-2222-222222222222";
pub const RTMP_BASE: &str = "rtmp://ingest.test/live";

pub fn device() -> DeviceId {
    DEVICE.parse().unwrap()
}

pub fn other_device() -> DeviceId {
    OTHER_DEVICE.parse().unwrap()
}

/// Write an executable shell script standing in for the transcoder.
///
/// `-version` prints a banner; otherwise the script runs `body` with `$last`
/// set to the final argument (the output template).
#[cfg(unix)]
pub fn fake_transcoder(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ffmpeg");
    let script = format!(
        "#!/bin/sh\n\
         if [ \"$1\" = \"-version\" ]; then echo \"ffmpeg version fake\"; exit 0; fi\n\
         for last; do :; done\n\
         {body}\n"
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Script body that writes frames 1..=n through the output template.
pub fn writes_frames(n: u32) -> String {
    format!(
        "i=1\nwhile [ $i -le {n} ]; do\n  : > \"$(printf \"$last\" $i)\"\n  i=$((i+1))\ndone"
    )
}

pub struct TestHarness {
    pub ctx: AppContext,
    pub registry: Arc<StaticDeviceRegistry>,
    pub dir: TempDir,
}

impl TestHarness {
    /// Harness whose manifests live under `manifest_base_url` and whose
    /// transcoder runs `transcoder_body`.
    #[cfg(unix)]
    pub fn new(manifest_base_url: &str, transcoder_body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = fake_transcoder(dir.path(), transcoder_body);

        let mut config = Config::default();
        config.streams.manifest_base_url = manifest_base_url.to_string();
        config.streams.rtmp_base_url = RTMP_BASE.to_string();
        config.streams.frames_dir = dir.path().join("frames");
        config.frames.timeout_secs = 5;
        config.frames.kill_grace_millis = 200;
        config.probe.timeout_secs = 2;
        config.tools.ffmpeg_path = Some(transcoder);

        Self::with_config(config, dir)
    }

    pub fn with_config(config: Config, dir: TempDir) -> Self {
        let tools = Arc::new(ToolRegistry::discover(&config.tools));
        let registry = Arc::new(StaticDeviceRegistry::from_config(&config.registry));
        let prober = Arc::new(HttpLocationProber::new(config.probe.timeout()).unwrap());

        let ctx = AppContext::with_components(config, tools, registry.clone(), prober, None)
            .expect("failed to build context");

        Self { ctx, registry, dir }
    }

    /// Register a device with the given streaming status.
    pub fn add_device(&self, id: DeviceId, streaming: bool) {
        self.registry.insert(DeviceDetails::new(id, "test camera", streaming));
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.dir.path().join("frames")
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server(self) -> (Self, SocketAddr) {
        let app = build_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }
}

/// Serve an already-built context on a random port.
pub async fn serve(ctx: AppContext) -> SocketAddr {
    let app = build_router(ctx);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind random port");
    let addr = listener.local_addr().expect("failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    addr
}
