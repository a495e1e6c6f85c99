//! Unix timestamp utilities for payment records.
//!
//! This module provides the [`UnixTimestamp`] type used on payment records to
//! mark when the device created them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::ops::Add;
use std::time::SystemTime;

/// A Unix timestamp representing seconds since the Unix epoch (1970-01-01T00:00:00Z).
///
/// # Serialization
///
/// Serialized as a stringified integer to avoid loss of precision in JSON,
/// since JavaScript's `Number` type cannot safely represent all 64-bit
/// integers and the cloud relay's reference consumers are JavaScript.
///
/// ```json
/// "1699999999"
/// ```
///
/// # Example
///
/// ```
/// use remotepay_types::timestamp::UnixTimestamp;
///
/// let now = UnixTimestamp::now();
/// let later = now + 3600;
/// assert!(later.as_secs() > now.as_secs());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq)]
pub struct UnixTimestamp(u64);

impl Serialize for UnixTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for UnixTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let ts = s
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom("timestamp must be a non-negative integer"))?;
        Ok(UnixTimestamp(ts))
    }
}

impl Display for UnixTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<u64> for UnixTimestamp {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        UnixTimestamp(self.0 + rhs)
    }
}

impl UnixTimestamp {
    /// Creates a new [`UnixTimestamp`] from a raw seconds value.
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Returns the current system time as a [`UnixTimestamp`].
    ///
    /// # Panics
    ///
    /// Panics if the system clock is set to a time before the Unix epoch,
    /// which should never happen on properly configured systems.
    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("SystemTime before UNIX epoch?!?")
            .as_secs();
        Self(now)
    }

    /// Returns the timestamp as raw seconds since the Unix epoch.
    pub fn as_secs(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_string() {
        let ts = UnixTimestamp::from_secs(1699999999);
        let encoded = serde_json::to_string(&ts).unwrap();
        assert_eq!(encoded, "\"1699999999\"");

        let decoded: UnixTimestamp = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, ts);
    }

    #[test]
    fn test_rejects_non_integer() {
        assert!(serde_json::from_str::<UnixTimestamp>("\"soon\"").is_err());
        assert!(serde_json::from_str::<UnixTimestamp>("\"-5\"").is_err());
    }
}
