//! Per-device mutual exclusion.
//!
//! Two transcoder runs for the same device write the same file names, so they
//! must not overlap. [`DeviceLocks`] hands out one async mutex per device,
//! created on first use and kept for the lifetime of the registry.

use std::sync::Arc;

use dashmap::DashMap;
use ds_core::DeviceId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily populated map from device to its lock.
#[derive(Debug, Default)]
pub struct DeviceLocks {
    locks: DashMap<DeviceId, Arc<Mutex<()>>>,
}

impl DeviceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the lock for `device`, creating it if needed.
    pub fn get(&self, device: DeviceId) -> Arc<Mutex<()>> {
        self.locks
            .entry(device)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Wait until no other holder is working on `device` and take the lock.
    pub async fn lock(&self, device: DeviceId) -> OwnedMutexGuard<()> {
        // Clone the Arc out first so the DashMap shard guard is not held
        // across the await.
        let lock = self.get(device);
        lock.lock_owned().await
    }

    /// Number of devices that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn same_device_shares_one_lock() {
        let locks = DeviceLocks::new();
        let id = DeviceId::new_random();
        let a = locks.get(id);
        let b = locks.get(id);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn different_devices_get_different_locks() {
        let locks = DeviceLocks::new();
        let a = locks.get(DeviceId::new_random());
        let b = locks.get(DeviceId::new_random());
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn second_holder_waits_for_first() {
        let locks = Arc::new(DeviceLocks::new());
        let id = DeviceId::new_random();

        let guard = locks.lock(id).await;
        assert!(locks.get(id).try_lock().is_err());

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock(id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should acquire the lock once released")
            .unwrap();
    }

    #[tokio::test]
    async fn other_devices_are_not_blocked() {
        let locks = DeviceLocks::new();
        let _held = locks.lock(DeviceId::new_random()).await;
        let other = tokio::time::timeout(
            Duration::from_millis(100),
            locks.lock(DeviceId::new_random()),
        )
        .await;
        assert!(other.is_ok());
    }
}
