//! Device enumeration payloads.
//!
//! The merchant device roster comes back from the cloud REST API as a JSON
//! body with an `elements` array. Emulator registrations carry the literal
//! serial `"unknown"` and are excluded from pairing.

use serde::{Deserialize, Serialize};

/// Serial reported by emulator registrations. Never pairable.
pub const UNKNOWN_SERIAL: &str = "unknown";

/// One device registration under a merchant.
///
/// Extra fields returned by the API are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    /// Device id used to address the device in a session configuration.
    pub id: String,
    /// Hardware serial number, or `"unknown"` for emulators.
    pub serial: String,
}

impl DeviceSummary {
    /// Returns true if this registration can be paired with.
    pub fn is_pairable(&self) -> bool {
        self.serial != UNKNOWN_SERIAL
    }
}

/// Response body of the merchant device enumeration endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeviceList {
    /// All registrations, in API order.
    pub elements: Vec<DeviceSummary>,
}

impl DeviceList {
    /// Returns the pairable subset, preserving the relative order of the
    /// remaining entries.
    pub fn pairable(self) -> Vec<DeviceSummary> {
        self.elements
            .into_iter()
            .filter(DeviceSummary::is_pairable)
            .collect()
    }
}
