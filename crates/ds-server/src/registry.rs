//! Device registry access and the device status gate.
//!
//! The registry itself (device CRUD and persistence) is an external service.
//! This module only reads from it: [`DeviceRegistry`] fetches a device's
//! details and [`DeviceStatusGate`] turns that into a yes/no "is it streaming
//! right now" answer that fails safe towards "no".

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ds_core::config::RegistryConfig;
use ds_core::{DeviceId, Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A device as described by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDetails {
    pub id: DeviceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub config: Option<String>,
    /// Whether the device itself is reachable.
    #[serde(default)]
    pub device_status: bool,
    #[serde(default, with = "lenient_datetime")]
    pub last_activity_date: Option<DateTime<Utc>>,
    /// Whether the device is currently publishing its stream.
    #[serde(default)]
    pub streaming_status: bool,
    #[serde(default, with = "lenient_datetime")]
    pub last_streaming_date: Option<DateTime<Utc>>,
}

impl DeviceDetails {
    pub fn new(id: DeviceId, name: impl Into<String>, streaming: bool) -> Self {
        Self {
            id,
            name: name.into(),
            ip_address: None,
            config: None,
            device_status: streaming,
            last_activity_date: None,
            streaming_status: streaming,
            last_streaming_date: None,
        }
    }
}

/// Registry timestamps are RFC 3339, but some deployments emit them without
/// an offset; those are read as UTC.
mod lenient_datetime {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(Some(dt.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Some(naive.and_utc()))
            .map_err(serde::de::Error::custom)
    }
}

/// Read access to the device registry.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Look a device up. `Ok(None)` means the registry does not know it.
    async fn get_device(&self, id: DeviceId) -> Result<Option<DeviceDetails>>;
}

// ---------------------------------------------------------------------------
// HTTP registry
// ---------------------------------------------------------------------------

/// Registry reached over HTTP at `GET {base_url}/api/devices/{id}`.
#[derive(Debug, Clone)]
pub struct HttpDeviceRegistry {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDeviceRegistry {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("cannot build registry HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl DeviceRegistry for HttpDeviceRegistry {
    async fn get_device(&self, id: DeviceId) -> Result<Option<DeviceDetails>> {
        let url = format!("{}/api/devices/{id}", self.base_url);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Registry(format!("GET {url}: {e}")))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Error::Registry(format!("GET {url}: HTTP {}", resp.status())));
        }

        let details = resp
            .json::<DeviceDetails>()
            .await
            .map_err(|e| Error::Registry(format!("GET {url}: invalid body: {e}")))?;
        Ok(Some(details))
    }
}

// ---------------------------------------------------------------------------
// Static registry
// ---------------------------------------------------------------------------

/// In-memory registry, seeded from configuration.
#[derive(Debug, Default)]
pub struct StaticDeviceRegistry {
    devices: RwLock<HashMap<DeviceId, DeviceDetails>>,
}

impl StaticDeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        let registry = Self::new();
        for device in &config.devices {
            registry.insert(DeviceDetails::new(device.id, device.name.clone(), device.streaming));
        }
        registry
    }

    pub fn insert(&self, details: DeviceDetails) {
        self.devices.write().insert(details.id, details);
    }

    /// Update a known device's streaming flag. Returns false for unknown devices.
    pub fn set_streaming(&self, id: DeviceId, streaming: bool) -> bool {
        match self.devices.write().get_mut(&id) {
            Some(details) => {
                details.streaming_status = streaming;
                if streaming {
                    details.last_streaming_date = Some(Utc::now());
                }
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl DeviceRegistry for StaticDeviceRegistry {
    async fn get_device(&self, id: DeviceId) -> Result<Option<DeviceDetails>> {
        Ok(self.devices.read().get(&id).cloned())
    }
}

/// Pick the registry backend described by the configuration.
pub fn registry_from_config(config: &RegistryConfig) -> Result<Arc<dyn DeviceRegistry>> {
    match config.base_url.as_deref() {
        Some(url) if !url.trim().is_empty() => {
            tracing::info!("Using HTTP device registry at {url}");
            Ok(Arc::new(HttpDeviceRegistry::new(url, config.timeout())?))
        }
        _ => {
            tracing::info!(
                "Using static device registry with {} device(s)",
                config.devices.len()
            );
            Ok(Arc::new(StaticDeviceRegistry::from_config(config)))
        }
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Answers whether a device is currently streaming.
#[derive(Clone)]
pub struct DeviceStatusGate {
    registry: Arc<dyn DeviceRegistry>,
}

impl DeviceStatusGate {
    pub fn new(registry: Arc<dyn DeviceRegistry>) -> Self {
        Self { registry }
    }

    /// Unknown devices and registry failures both count as "not streaming".
    pub async fn is_streaming(&self, id: DeviceId) -> bool {
        match self.registry.get_device(id).await {
            Ok(Some(details)) => details.streaming_status,
            Ok(None) => {
                tracing::debug!(device = %id, "Device not found in registry");
                false
            }
            Err(e) => {
                tracing::warn!(device = %id, "Device registry lookup failed: {e}");
                false
            }
        }
    }
}
