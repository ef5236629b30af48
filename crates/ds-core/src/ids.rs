//! Typed device identifier.
//!
//! [`DeviceId`] is a newtype over `Uuid`. Its canonical string form (lowercase,
//! hyphenated) is what every derived path and file name is built from, so it
//! can never carry path separators or shell metacharacters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a streaming device, assigned by the device registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(Uuid);

impl DeviceId {
    /// Create a random ID. Real device IDs come from the registry; this is for
    /// tooling and tests.
    #[must_use]
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return the inner UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for DeviceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for DeviceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<DeviceId> for Uuid {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_lowercase_hyphenated() {
        let id: DeviceId = "AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE".parse().unwrap();
        assert_eq!(id.to_string(), "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee");
    }

    #[test]
    fn display_and_from_str() {
        let id = DeviceId::new_random();
        let parsed: DeviceId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn invalid_from_str() {
        assert!(DeviceId::from_str("; rm -rf /").is_err());
        assert!(DeviceId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn serde_is_transparent() {
        let id: DeviceId = "11111111-1111-1111-1111-111111111111".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"11111111-1111-1111-1111-111111111111\"");
    }

    #[test]
    fn uuid_conversions() {
        let uuid = Uuid::new_v4();
        let id = DeviceId::from(uuid);
        assert_eq!(*id.as_uuid(), uuid);
        let back: Uuid = id.into();
        assert_eq!(back, uuid);
    }
}
