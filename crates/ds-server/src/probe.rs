//! Manifest existence probing.
//!
//! A probe answers one question, "is this manifest there right now?", with a
//! plain `bool`. Network errors, timeouts, DNS failures, 404s and permission
//! problems are all just `false`. There are no retries: one probe per call.

use std::time::Duration;

use async_trait::async_trait;
use ds_core::{Error, Result, StreamLocation};

/// Checks whether a stream location currently exists.
#[async_trait]
pub trait LocationProber: Send + Sync {
    async fn exists(&self, location: &StreamLocation) -> bool;
}

/// Prober for HTTP(S) URLs and local files.
///
/// - `http://` / `https://`: a single `HEAD` request; any 2xx means present.
/// - `file://` URIs and bare paths: the target must be a regular file.
/// - Anything else (e.g. `rtmp://`) cannot be probed and reports `false`.
#[derive(Debug, Clone)]
pub struct HttpLocationProber {
    client: reqwest::Client,
}

impl HttpLocationProber {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("cannot build probe HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn probe_url(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(resp) => {
                let status = resp.status();
                tracing::debug!(url, %status, "Manifest probe answered");
                status.is_success()
            }
            Err(e) => {
                tracing::debug!(url, "Manifest probe failed: {e}");
                false
            }
        }
    }
}

async fn probe_file(path: &str) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file(),
        Err(e) => {
            tracing::debug!(path, "Manifest file probe failed: {e}");
            false
        }
    }
}

#[async_trait]
impl LocationProber for HttpLocationProber {
    async fn exists(&self, location: &StreamLocation) -> bool {
        let loc = location.as_str();

        if loc.starts_with("http://") || loc.starts_with("https://") {
            self.probe_url(loc).await
        } else if let Some(path) = loc.strip_prefix("file://") {
            probe_file(path).await
        } else if loc.contains("://") {
            tracing::debug!(location = loc, "Unsupported scheme for manifest probe");
            false
        } else {
            probe_file(loc).await
        }
    }
}
