//! Device connection configuration assembly.
//!
//! A session configuration is built from three sources: caller credentials
//! (merchant id, access token), the [`CloudEnvironment`] switch, and the
//! hard-coded application identifiers below. The result is a read-only
//! [`DeviceConnectionConfig`] handed to the session transport unmodified.

use std::time::Duration;
use url::Url;

use crate::client::CloudEnvironment;
use remotepay_types::connector::DeviceConnectionConfig;

/// Identifier of this integrating application, issued by the relay operator.
pub const REMOTE_APPLICATION_ID: &str = "CLOVERDEV.655VQ41Z9CVF8";

/// Default operator-facing name for a point of sale.
pub const DEFAULT_FRIENDLY_ID: &str = "Primary POS";

/// Default pairing wait.
pub const DEFAULT_PAIRING_TIMEOUT: Duration = Duration::from_secs(30);

/// Default wait for a terminal response to a request.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(60);

/// Path of the cloud session endpoint under the relay base URL.
const SESSION_PATH: &str = "support/remote_pay/cs";

/// Errors assembling a [`DeviceConnectionConfig`].
#[derive(Debug, thiserror::Error)]
pub enum CloudConfigError {
    /// The session endpoint could not be derived from the relay base URL.
    #[error("Invalid session endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Builder for the cloud session configuration.
///
/// # Example
///
/// ```
/// use remotepay_cloud::builder::{CloudDeviceConfigurationBuilder, REMOTE_APPLICATION_ID};
/// use remotepay_cloud::CloudEnvironment;
///
/// let config = CloudDeviceConfigurationBuilder::new(
///     REMOTE_APPLICATION_ID,
///     "d6c3d2e7-9f10-4d9f",
///     "6QDCVBB8T1AJ1",
///     "f9b2c86f-73d0-53ff",
/// )
/// .with_environment(CloudEnvironment::Sandbox)
/// .with_friendly_id("Counter 2")
/// .build()
/// .unwrap();
///
/// assert_eq!(config.friendly_id, "Counter 2");
/// ```
pub struct CloudDeviceConfigurationBuilder {
    remote_application_id: String,
    device_id: String,
    merchant_id: String,
    access_token: String,
    environment: CloudEnvironment,
    cloud_server: Option<Url>,
    friendly_id: String,
    pairing_timeout: Duration,
    response_timeout: Duration,
}

impl CloudDeviceConfigurationBuilder {
    /// Starts a builder from the four required identifiers.
    pub fn new(
        remote_application_id: impl Into<String>,
        device_id: impl Into<String>,
        merchant_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        CloudDeviceConfigurationBuilder {
            remote_application_id: remote_application_id.into(),
            device_id: device_id.into(),
            merchant_id: merchant_id.into(),
            access_token: access_token.into(),
            environment: CloudEnvironment::default(),
            cloud_server: None,
            friendly_id: DEFAULT_FRIENDLY_ID.to_string(),
            pairing_timeout: DEFAULT_PAIRING_TIMEOUT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    /// Selects the cloud relay by environment.
    pub fn with_environment(mut self, environment: CloudEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Overrides the relay base URL, e.g. for a self-hosted relay. Takes
    /// precedence over [`with_environment`](Self::with_environment).
    pub fn with_cloud_server(mut self, base: Url) -> Self {
        self.cloud_server = Some(base);
        self
    }

    /// Sets the operator-facing name for this point of sale.
    pub fn with_friendly_id(mut self, friendly_id: impl Into<String>) -> Self {
        self.friendly_id = friendly_id.into();
        self
    }

    /// Sets how long pairing may take before the session gives up.
    pub fn with_pairing_timeout(mut self, timeout: Duration) -> Self {
        self.pairing_timeout = timeout;
        self
    }

    /// Sets how long a request may wait for its terminal response.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Assembles the configuration.
    ///
    /// The session endpoint is the relay base plus the session path, with
    /// the addressing parameters in the query string. The access token is
    /// kept out of the endpoint; the transport presents it however the
    /// relay requires.
    pub fn build(self) -> Result<DeviceConnectionConfig, CloudConfigError> {
        let base = self
            .cloud_server
            .unwrap_or_else(|| self.environment.base_url());
        let mut endpoint = base.join(SESSION_PATH)?;
        endpoint
            .query_pairs_mut()
            .append_pair("merchant_id", &self.merchant_id)
            .append_pair("device_id", &self.device_id)
            .append_pair("friendly_id", &self.friendly_id)
            .append_pair("remote_application_id", &self.remote_application_id);

        Ok(DeviceConnectionConfig {
            endpoint,
            merchant_id: self.merchant_id,
            access_token: self.access_token,
            device_id: self.device_id,
            remote_application_id: self.remote_application_id,
            friendly_id: self.friendly_id,
            pairing_timeout: self.pairing_timeout,
            response_timeout: self.response_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> CloudDeviceConfigurationBuilder {
        CloudDeviceConfigurationBuilder::new(
            REMOTE_APPLICATION_ID,
            "d6c3d2e7-9f10-4d9f",
            "6QDCVBB8T1AJ1",
            "f9b2c86f-73d0-53ff",
        )
    }

    #[test]
    fn test_defaults() {
        let config = builder().build().unwrap();
        assert_eq!(config.friendly_id, DEFAULT_FRIENDLY_ID);
        assert_eq!(config.pairing_timeout, DEFAULT_PAIRING_TIMEOUT);
        assert_eq!(config.response_timeout, DEFAULT_RESPONSE_TIMEOUT);
        assert!(config.endpoint.as_str().starts_with("https://sandbox.dev.clover.com/support/remote_pay/cs"));
    }

    #[test]
    fn test_endpoint_query_addresses_device() {
        let config = builder().build().unwrap();
        let query: Vec<(String, String)> = config
            .endpoint
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("merchant_id".into(), "6QDCVBB8T1AJ1".into())));
        assert!(query.contains(&("device_id".into(), "d6c3d2e7-9f10-4d9f".into())));
        assert!(query.contains(&("remote_application_id".into(), REMOTE_APPLICATION_ID.into())));
    }

    #[test]
    fn test_access_token_stays_out_of_endpoint() {
        let config = builder().build().unwrap();
        assert!(!config.endpoint.as_str().contains("f9b2c86f-73d0-53ff"));
        assert_eq!(config.access_token, "f9b2c86f-73d0-53ff");
    }

    #[test]
    fn test_production_environment_switches_base() {
        let config = builder()
            .with_environment(CloudEnvironment::Production)
            .build()
            .unwrap();
        assert!(config.endpoint.as_str().starts_with("https://www.clover.com/"));
    }
}
