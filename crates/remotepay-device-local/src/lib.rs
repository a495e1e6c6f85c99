#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! In-process emulated payment device.
//!
//! This crate provides [`LocalDevice`], a
//! [`DeviceTransport`](remotepay_types::connector::DeviceTransport)
//! implementation that stands in for a physical card-reading terminal. It
//! completes the pairing handshake, processes sale requests, and raises the
//! same challenges a real device would (duplicate-payment confirmation,
//! signature verification), without any network underneath.
//!
//! The emulated device backs the demo point-of-sale binary and the
//! integration tests; a cloud socket transport plugs into the same seam.
//!
//! # Example
//!
//! ```rust,ignore
//! use remotepay_device_local::{LocalDevice, LocalDeviceConfig};
//!
//! let device = LocalDevice::new(LocalDeviceConfig::default());
//! let connector = CloudConnector::new(device, config);
//! ```

mod device;

pub use device::{LocalDevice, LocalDeviceConfig};
