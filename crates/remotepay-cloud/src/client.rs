//! REST client for the merchant cloud API.
//!
//! The only call a point of sale makes against the REST surface is device
//! enumeration: fetching the merchant's device roster so the operator can
//! pick which terminal to pair with. Credentials are passed through
//! unmodified; the access token travels as the `access_token` query
//! parameter the way the API expects it.

use reqwest::StatusCode;
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;
use url::Url;

use remotepay_types::proto::{DeviceList, DeviceSummary};

/// Base URL of the sandbox cloud relay.
pub const SANDBOX_BASE_URL: &str = "https://sandbox.dev.clover.com";
/// Base URL of the production cloud relay.
pub const PRODUCTION_BASE_URL: &str = "https://www.clover.com";

/// Which cloud relay a session targets.
///
/// The environment is the only deployment toggle: everything else about an
/// endpoint is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloudEnvironment {
    /// Developer sandbox.
    #[default]
    Sandbox,
    /// Live production relay.
    Production,
}

impl CloudEnvironment {
    /// Returns the relay base URL for this environment.
    pub fn base_url(&self) -> Url {
        let base = match self {
            CloudEnvironment::Sandbox => SANDBOX_BASE_URL,
            CloudEnvironment::Production => PRODUCTION_BASE_URL,
        };
        Url::parse(base).expect("valid base url")
    }
}

/// Error for unrecognized environment names.
#[derive(Debug, thiserror::Error)]
#[error("Unknown environment '{0}', expected 'sandbox' or 'production'")]
pub struct UnknownEnvironment(String);

impl FromStr for CloudEnvironment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sandbox" => Ok(CloudEnvironment::Sandbox),
            "production" => Ok(CloudEnvironment::Production),
            other => Err(UnknownEnvironment(other.to_string())),
        }
    }
}

impl Display for CloudEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudEnvironment::Sandbox => write!(f, "sandbox"),
            CloudEnvironment::Production => write!(f, "production"),
        }
    }
}

/// Errors that can occur talking to the merchant cloud API.
///
/// Enumeration failures are surfaced to the operator exactly once and leave
/// the device selection empty; there is no retry.
#[derive(Debug, thiserror::Error)]
pub enum CloudApiError {
    /// The request could not be sent or the body could not be decoded.
    #[error("Device enumeration failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The API answered with a non-success status.
    #[error("Device enumeration returned HTTP {0}")]
    Status(StatusCode),
    /// The request URL could not be assembled.
    #[error("Invalid cloud API URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Client for the merchant cloud REST API.
pub struct CloudApiClient {
    http: reqwest::Client,
    base: Url,
    merchant_id: String,
    access_token: String,
}

impl CloudApiClient {
    /// Creates a client for `environment` with the given merchant
    /// credentials.
    pub fn new(
        environment: CloudEnvironment,
        merchant_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self::with_base_url(environment.base_url(), merchant_id, access_token)
    }

    /// Creates a client against an explicit base URL.
    pub fn with_base_url(
        base: Url,
        merchant_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        CloudApiClient {
            http: reqwest::Client::new(),
            base,
            merchant_id: merchant_id.into(),
            access_token: access_token.into(),
        }
    }

    /// Fetches the merchant's pairable devices.
    ///
    /// Emulator registrations (serial `"unknown"`) are filtered out; the
    /// relative order of the remaining entries is preserved.
    ///
    /// # Errors
    ///
    /// Any transport, status, or decode failure maps to a single
    /// [`CloudApiError`]. Callers surface it once and leave the selection
    /// empty.
    pub async fn devices(&self) -> Result<Vec<DeviceSummary>, CloudApiError> {
        let url = self.devices_url()?;
        tracing::debug!(merchant_id = %self.merchant_id, "Enumerating merchant devices");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CloudApiError::Status(status));
        }

        let list: DeviceList = response.json().await?;
        Ok(list.pairable())
    }

    fn devices_url(&self) -> Result<Url, url::ParseError> {
        let mut url = self
            .base
            .join(&format!("v3/merchants/{}/devices", self.merchant_id))?;
        url.query_pairs_mut()
            .append_pair("access_token", &self.access_token);
        Ok(url)
    }
}
