//! Wire format types for payment terminal session messages.
//!
//! This module defines the messages exchanged between a point of sale and a
//! paired card-reading device over a cloud-relayed session, plus the REST
//! types used to enumerate pairable devices.
//!
//! # Key Types
//!
//! - [`PosMessage`] - Messages sent from the point of sale to the device
//! - [`DeviceMessage`] - Messages sent from the device to the point of sale
//! - [`SaleRequest`] / [`SaleResponse`] - A charge and its terminal outcome
//! - [`ConfirmPaymentRequest`] / [`VerifySignatureRequest`] - Mid-sale
//!   challenges requiring an explicit accept/reject decision
//! - [`DeviceList`] / [`DeviceSummary`] - Device enumeration payloads
//!
//! # Wire Format
//!
//! Session messages serialize to JSON envelopes with a `method` tag and a
//! `payload` body; record fields use camelCase names. Method names are
//! SCREAMING_SNAKE_CASE strings:
//!
//! ```json
//! {
//!   "method": "SALE",
//!   "payload": { "externalId": "bc54yg8p0asdf", "amount": 1250 }
//! }
//! ```

use serde::{Deserialize, Serialize};

pub mod device;
pub mod sale;

pub use device::{DeviceList, DeviceSummary, UNKNOWN_SERIAL};
pub use sale::{
    Cents, Challenge, ChallengeReason, ConfirmPaymentRequest, DeviceErrorCode, DeviceErrorEvent,
    ExternalId, Payment, SaleRequest, SaleResponse, Signature, SignaturePoint, Stroke,
    TransactionResult, VerifySignatureRequest,
};

/// Identity reported by a device once pairing completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdentity {
    /// Device serial number, as printed on the hardware.
    pub serial: String,
    /// Device model name.
    pub model: String,
}

/// A message sent from the point of sale to the device.
///
/// The variants mirror the capability set a connector exposes: discovery
/// (pairing), sale submission, display messages, and challenge decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "method",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum PosMessage {
    /// Pairing handshake. The device answers with [`DeviceMessage::Ready`].
    Discovery,
    /// Charge the given amount.
    Sale(SaleRequest),
    /// Show a free-form message on the device display.
    ShowMessage {
        /// Text to display.
        text: String,
    },
    /// Accept a challenged payment, allowing the sale to proceed.
    AcceptPayment {
        /// Id of the payment under challenge.
        payment_id: String,
    },
    /// Reject a challenged payment, cancelling the sale.
    RejectPayment {
        /// Id of the payment under challenge.
        payment_id: String,
        /// The specific challenge being rejected.
        challenge: Challenge,
    },
    /// Accept a customer signature, allowing the sale to complete.
    AcceptSignature {
        /// Id of the payment awaiting signature verification.
        payment_id: String,
    },
    /// Reject a customer signature, cancelling the sale.
    RejectSignature {
        /// Id of the payment awaiting signature verification.
        payment_id: String,
    },
    /// Tear the session down. Best effort; the device replies with
    /// [`DeviceMessage::Disconnected`] when it can.
    Dispose,
}

/// A message sent from the device to the point of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "method",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum DeviceMessage {
    /// The session transport is established. Pairing has not completed yet.
    Connected,
    /// Pairing completed; the device is ready to process requests.
    Ready(DeviceIdentity),
    /// Terminal outcome of a sale.
    SaleResponse(SaleResponse),
    /// The sale is held pending an accept/reject decision on one or more
    /// challenges.
    ConfirmPayment(ConfirmPaymentRequest),
    /// The sale is held pending a signature verification decision.
    VerifySignature(VerifySignatureRequest),
    /// A device-side error. Does not necessarily end the session.
    DeviceError(DeviceErrorEvent),
    /// The session is over.
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pos_message_envelope() {
        let msg = PosMessage::Sale(SaleRequest {
            external_id: ExternalId::from("bc54yg8p0asdf"),
            amount: Cents::from(1250),
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "method": "SALE",
                "payload": { "externalId": "bc54yg8p0asdf", "amount": 1250 }
            })
        );

        let discovery = serde_json::to_value(PosMessage::Discovery).unwrap();
        assert_eq!(discovery, json!({ "method": "DISCOVERY" }));
    }

    #[test]
    fn test_device_message_round_trip() {
        let msg = DeviceMessage::Ready(DeviceIdentity {
            serial: "C030UQ50550081".to_string(),
            model: "Terminal One".to_string(),
        });
        let encoded = serde_json::to_string(&msg).unwrap();
        let decoded: DeviceMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_show_message_method_tag() {
        let msg = PosMessage::ShowMessage {
            text: "Hello World".to_string(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["method"], "SHOW_MESSAGE");
        assert_eq!(value["payload"]["text"], "Hello World");
    }
}
