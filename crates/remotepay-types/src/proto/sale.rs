//! Sale requests, responses, and mid-sale challenge types.
//!
//! A sale travels to the device as a [`SaleRequest`] and comes back as exactly
//! one terminal [`SaleResponse`]. In between, the device may hold the sale and
//! raise a [`ConfirmPaymentRequest`] (e.g. a suspected duplicate payment) or a
//! [`VerifySignatureRequest`]; both require an explicit accept/reject call on
//! the connector before the sale proceeds. Nothing in this crate decides a
//! challenge on the caller's behalf.

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::Display;

use crate::timestamp::UnixTimestamp;

/// Length of generated external identifiers.
const EXTERNAL_ID_LEN: usize = 13;

/// Caller-assigned identifier correlating a [`SaleRequest`] with its
/// [`SaleResponse`].
///
/// External ids are opaque alphanumeric strings. [`ExternalId::generate`]
/// produces a fresh random one per request; the device echoes it back on the
/// resulting [`Payment`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Generates a fresh random 13-character alphanumeric id.
    pub fn generate() -> Self {
        let id: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(EXTERNAL_ID_LEN)
            .map(char::from)
            .collect();
        ExternalId(id)
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ExternalId {
    fn from(value: &str) -> Self {
        ExternalId(value.to_string())
    }
}

impl From<String> for ExternalId {
    fn from(value: String) -> Self {
        ExternalId(value)
    }
}

impl Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A currency amount in whole cents.
///
/// All amounts on the wire are integer cents; display formatting with an
/// implied two-digit fraction happens at the edges.
///
/// # Example
///
/// ```
/// use remotepay_types::proto::Cents;
///
/// let amount = Cents::from(1250);
/// assert_eq!(amount.to_string(), "12.50");
/// assert_eq!(amount.value(), 1250);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Cents(u64);

impl Cents {
    /// Returns the raw number of cents.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns true for a zero amount.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Cents {
    fn from(value: u64) -> Self {
        Cents(value)
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// A request to charge a specified amount on the paired device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    /// Caller-assigned correlation id, echoed back on the payment.
    pub external_id: ExternalId,
    /// Amount to charge, in cents. Must be strictly positive.
    pub amount: Cents,
}

impl SaleRequest {
    /// Builds a sale request for `amount` with a freshly generated
    /// external id.
    pub fn new(amount: Cents) -> Self {
        SaleRequest {
            external_id: ExternalId::generate(),
            amount,
        }
    }
}

/// A payment record produced by the device for a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Device-assigned payment id.
    pub id: String,
    /// The external id from the originating [`SaleRequest`].
    pub external_id: ExternalId,
    /// Device-assigned order id grouping payments.
    pub order_id: String,
    /// Charged amount in cents.
    pub amount: Cents,
    /// When the device created the payment.
    pub created_at: UnixTimestamp,
}

/// Coarse outcome classification of a finished transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionResult {
    /// The sale completed and the payment stands.
    Success,
    /// The device failed the sale (validation, processing error).
    Fail,
    /// The sale was cancelled, e.g. a rejected challenge.
    Cancel,
}

impl Display for TransactionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionResult::Success => write!(f, "SUCCESS"),
            TransactionResult::Fail => write!(f, "FAIL"),
            TransactionResult::Cancel => write!(f, "CANCEL"),
        }
    }
}

/// Terminal outcome of a sale.
///
/// Exactly one of these is delivered per submitted [`SaleRequest`], whether
/// or not the sale was interrupted by challenges along the way.
#[derive(Debug, Clone, PartialEq)]
pub enum SaleResponse {
    /// The sale completed.
    Success {
        /// The resulting payment.
        payment: Payment,
    },
    /// The sale did not complete.
    Failure {
        /// Failure classification ([`TransactionResult::Fail`] or
        /// [`TransactionResult::Cancel`]).
        result: TransactionResult,
        /// Human-readable reason.
        reason: String,
    },
}

impl SaleResponse {
    /// Returns the outcome classification.
    pub fn result(&self) -> TransactionResult {
        match self {
            SaleResponse::Success { .. } => TransactionResult::Success,
            SaleResponse::Failure { result, .. } => *result,
        }
    }

    /// Returns true if the sale completed.
    pub fn is_success(&self) -> bool {
        matches!(self, SaleResponse::Success { .. })
    }

    /// Returns the payment if the sale completed.
    pub fn payment(&self) -> Option<&Payment> {
        match self {
            SaleResponse::Success { payment } => Some(payment),
            SaleResponse::Failure { .. } => None,
        }
    }

    /// Returns the failure reason if the sale did not complete.
    pub fn reason(&self) -> Option<&str> {
        match self {
            SaleResponse::Success { .. } => None,
            SaleResponse::Failure { reason, .. } => Some(reason),
        }
    }
}

/// Flat wire shape of [`SaleResponse`].
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaleResponseWire {
    success: bool,
    result: TransactionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment: Option<Payment>,
}

impl Serialize for SaleResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            SaleResponse::Success { payment } => SaleResponseWire {
                success: true,
                result: TransactionResult::Success,
                reason: None,
                payment: Some(payment.clone()),
            },
            SaleResponse::Failure { result, reason } => SaleResponseWire {
                success: false,
                result: *result,
                reason: Some(reason.clone()),
                payment: None,
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SaleResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = SaleResponseWire::deserialize(deserializer)?;
        match wire.success {
            true => {
                let payment = wire
                    .payment
                    .ok_or_else(|| serde::de::Error::missing_field("payment"))?;
                Ok(SaleResponse::Success { payment })
            }
            false => {
                let reason = wire
                    .reason
                    .ok_or_else(|| serde::de::Error::missing_field("reason"))?;
                Ok(SaleResponse::Failure {
                    result: wire.result,
                    reason,
                })
            }
        }
    }
}

/// Why the device challenged a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeReason {
    /// The amount matches the immediately preceding sale.
    DuplicatePayment,
    /// The device is operating offline and cannot authorize online.
    Offline,
}

/// A condition raised by the device during payment confirmation.
///
/// The sale is held until the point of sale calls `accept_payment` or
/// `reject_payment` on the connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    /// Why the payment was challenged.
    pub reason: ChallengeReason,
    /// Operator-facing description.
    pub message: String,
}

/// A request to confirm a challenged payment before the sale proceeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    /// The payment under challenge.
    pub payment: Payment,
    /// One or more challenges, each needing a decision.
    pub challenges: Vec<Challenge>,
}

/// A single point of a captured signature stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePoint {
    pub x: i32,
    pub y: i32,
}

/// A contiguous pen stroke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    /// Points in draw order.
    pub points: Vec<SignaturePoint>,
}

/// A signature captured on the device screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// Strokes in draw order.
    pub strokes: Vec<Stroke>,
}

impl Signature {
    /// Total number of captured points across all strokes.
    pub fn total_points(&self) -> usize {
        self.strokes.iter().map(|s| s.points.len()).sum()
    }
}

/// A request to verify a captured customer signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySignatureRequest {
    /// The payment awaiting signature verification.
    pub payment: Payment,
    /// The captured signature.
    pub signature: Signature,
}

/// Classification of device-side errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceErrorCode {
    /// Transport or session-level failure.
    Communication,
    /// The device rejected a malformed or out-of-order request.
    Validation,
    /// Unexpected device-side fault.
    Exception,
}

/// An error event raised by the device.
///
/// Displayed verbatim to the operator; the session may or may not survive,
/// which the device signals separately via
/// [`DeviceMessage::Disconnected`](super::DeviceMessage::Disconnected).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceErrorEvent {
    /// Error classification.
    pub code: DeviceErrorCode,
    /// Operator-facing message.
    pub message: String,
}

impl Display for DeviceErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payment() -> Payment {
        Payment {
            id: "PAY7F2K".to_string(),
            external_id: ExternalId::from("bc54yg8p0asdf"),
            order_id: "ORD91XM".to_string(),
            amount: Cents::from(1250),
            created_at: UnixTimestamp::from_secs(1699999999),
        }
    }

    #[test]
    fn test_external_id_generate() {
        let a = ExternalId::generate();
        let b = ExternalId::generate();
        assert_eq!(a.as_str().len(), 13);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_cents_display() {
        assert_eq!(Cents::from(0).to_string(), "0.00");
        assert_eq!(Cents::from(5).to_string(), "0.05");
        assert_eq!(Cents::from(12).to_string(), "0.12");
        assert_eq!(Cents::from(123).to_string(), "1.23");
        assert_eq!(Cents::from(1234567).to_string(), "12345.67");
    }

    #[test]
    fn test_sale_response_success_wire() {
        let response = SaleResponse::Success {
            payment: sample_payment(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["result"], json!("SUCCESS"));
        assert_eq!(value["payment"]["externalId"], json!("bc54yg8p0asdf"));
        assert!(value.get("reason").is_none());

        let decoded: SaleResponse = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_sale_response_failure_wire() {
        let response = SaleResponse::Failure {
            result: TransactionResult::Cancel,
            reason: "Payment rejected by operator".to_string(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["result"], json!("CANCEL"));
        assert!(value.get("payment").is_none());

        let decoded: SaleResponse = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_sale_response_success_requires_payment() {
        let malformed = json!({ "success": true, "result": "SUCCESS" });
        assert!(serde_json::from_value::<SaleResponse>(malformed).is_err());
    }

    #[test]
    fn test_challenge_reason_wire_names() {
        let challenge = Challenge {
            reason: ChallengeReason::DuplicatePayment,
            message: "Did you mean to charge the same amount twice?".to_string(),
        };
        let value = serde_json::to_value(&challenge).unwrap();
        assert_eq!(value["reason"], json!("DUPLICATE_PAYMENT"));
    }

    #[test]
    fn test_signature_total_points() {
        let signature = Signature {
            strokes: vec![
                Stroke {
                    points: vec![SignaturePoint { x: 0, y: 0 }, SignaturePoint { x: 4, y: 9 }],
                },
                Stroke {
                    points: vec![SignaturePoint { x: 7, y: 2 }],
                },
            ],
        };
        assert_eq!(signature.total_points(), 3);
    }
}
