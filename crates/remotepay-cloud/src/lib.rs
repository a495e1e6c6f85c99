#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Cloud-side plumbing for remotepay terminal sessions.
//!
//! This crate provides the pieces a point of sale needs to reach a device
//! registered under a merchant account on the cloud relay:
//!
//! - [`CloudApiClient`] - REST client for the merchant API, used to enumerate
//!   pairable devices
//! - [`CloudDeviceConfigurationBuilder`] - assembles the read-only
//!   [`DeviceConnectionConfig`](remotepay_types::connector::DeviceConnectionConfig)
//!   a session transport dials with
//! - [`CloudConnector`] - the shipped
//!   [`Connector`](remotepay_types::connector::Connector) implementation,
//!   generic over a [`DeviceTransport`](remotepay_types::connector::DeviceTransport)
//!
//! ## Quickstart
//!
//! ```rust,ignore
//! use remotepay_cloud::{CloudConnector, CloudDeviceConfigurationBuilder, CloudEnvironment};
//! use remotepay_cloud::builder::REMOTE_APPLICATION_ID;
//!
//! let config = CloudDeviceConfigurationBuilder::new(
//!     REMOTE_APPLICATION_ID,
//!     device_id,
//!     merchant_id,
//!     access_token,
//! )
//! .with_environment(CloudEnvironment::Sandbox)
//! .build()?;
//!
//! let connector = CloudConnector::new(transport, config);
//! connector.add_listener(listener);
//! connector.initialize_connection().await?;
//! ```

pub mod builder;
pub mod client;
pub mod connector;

pub use builder::CloudDeviceConfigurationBuilder;
pub use client::{CloudApiClient, CloudApiError, CloudEnvironment};
pub use connector::CloudConnector;
