#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for cloud-paired payment terminal sessions.
//!
//! This crate provides the foundational types used throughout the remotepay
//! ecosystem for pairing with, and sending payment requests to, a physical
//! card-reading device over a cloud-relayed session. It is transport-agnostic:
//! the socket layer that carries messages between the point of sale and the
//! device is supplied by separate crates through the
//! [`DeviceTransport`](connector::DeviceTransport) seam.
//!
//! # Overview
//!
//! A point of sale drives a paired device through a [`Connector`](connector::Connector):
//! it initializes a connection, submits sale requests, and reacts to device
//! events delivered to a registered [`ConnectorListener`](connector::ConnectorListener).
//! The device may interrupt a sale with a challenge (duplicate payment,
//! offline state) or a signature verification request, both of which require
//! an explicit accept/reject decision before the sale proceeds.
//!
//! # Modules
//!
//! - [`config`] - Environment variable resolution for configuration values
//! - [`connector`] - The connector trait, listener capability set, and transport seam
//! - [`proto`] - Wire format types for session messages and device enumeration
//! - [`timestamp`] - Unix timestamp utilities for payment records
//! - [`util`] - Helper types (human-readable money amounts)

pub mod config;
pub mod connector;
pub mod proto;
pub mod timestamp;
pub mod util;
