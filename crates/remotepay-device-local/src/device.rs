//! The emulated device session state machine.
//!
//! A session moves through pairing into a request loop:
//!
//! ```text
//! Connected -> (Discovery) -> Ready -> { sale / show message / challenge decisions }* -> Disconnected
//! ```
//!
//! A sale is answered with exactly one terminal [`SaleResponse`], possibly
//! after a confirmation or signature hold. The device never decides a
//! challenge by itself: a held sale waits until the point of sale accepts or
//! rejects.

use async_trait::async_trait;
use rand::Rng;
use rand::distr::Alphanumeric;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;

use remotepay_types::connector::{
    DeviceChannel, DeviceConnectionConfig, DeviceSide, DeviceTransport, TransportError,
};
use remotepay_types::proto::{
    Cents, Challenge, ChallengeReason, ConfirmPaymentRequest, DeviceErrorCode, DeviceErrorEvent,
    DeviceIdentity, DeviceMessage, Payment, PosMessage, SaleRequest, SaleResponse, Signature,
    SignaturePoint, Stroke, TransactionResult, VerifySignatureRequest,
};
use remotepay_types::timestamp::UnixTimestamp;

/// Behavior knobs for the emulated device.
#[derive(Debug, Clone)]
pub struct LocalDeviceConfig {
    /// Serial reported on pairing. Must not be `"unknown"`, or the cloud
    /// roster would hide the device.
    pub serial: String,
    /// Model reported on pairing.
    pub model: String,
    /// Sales at or above this amount are held for signature verification.
    pub signature_threshold: Option<Cents>,
    /// Sales above this amount are declined outright.
    pub decline_over: Option<Cents>,
}

impl Default for LocalDeviceConfig {
    fn default() -> Self {
        LocalDeviceConfig {
            serial: "C030UQ50550081".to_string(),
            model: "Terminal One".to_string(),
            signature_threshold: None,
            decline_over: None,
        }
    }
}

/// An in-process emulated payment device.
///
/// Each [`open`](DeviceTransport::open) call starts an independent session
/// task. The emulated display is shared across sessions and readable through
/// [`display_text`](LocalDevice::display_text).
pub struct LocalDevice {
    config: LocalDeviceConfig,
    display: Arc<Mutex<String>>,
}

impl LocalDevice {
    /// Creates an emulated device with the given behavior.
    pub fn new(config: LocalDeviceConfig) -> Self {
        LocalDevice {
            config,
            display: Arc::new(Mutex::new(String::new())),
        }
    }

    /// Returns what the emulated display currently shows.
    pub fn display_text(&self) -> String {
        self.display.lock().expect("display lock").clone()
    }

    /// Returns a handle to the emulated display for observation after the
    /// device has been moved into a connector.
    pub fn display_handle(&self) -> Arc<Mutex<String>> {
        self.display.clone()
    }
}

impl Default for LocalDevice {
    fn default() -> Self {
        LocalDevice::new(LocalDeviceConfig::default())
    }
}

#[async_trait]
impl DeviceTransport for LocalDevice {
    async fn open(&self, config: &DeviceConnectionConfig) -> Result<DeviceChannel, TransportError> {
        let (channel, side) = DeviceChannel::pair(32);
        let session = DeviceSession {
            identity: DeviceIdentity {
                serial: self.config.serial.clone(),
                model: self.config.model.clone(),
            },
            pairing_timeout: config.pairing_timeout,
            signature_threshold: self.config.signature_threshold,
            decline_over: self.config.decline_over,
            display: self.display.clone(),
            last_amount: None,
            pending: None,
        };
        tokio::spawn(session.run(side));
        Ok(channel)
    }
}

/// A sale held on the device awaiting a decision.
enum PendingSale {
    /// Held for payment confirmation.
    Confirm { payment: Payment },
    /// Held for signature verification.
    Signature { payment: Payment },
}

struct DeviceSession {
    identity: DeviceIdentity,
    pairing_timeout: Duration,
    signature_threshold: Option<Cents>,
    decline_over: Option<Cents>,
    display: Arc<Mutex<String>>,
    last_amount: Option<Cents>,
    pending: Option<PendingSale>,
}

impl DeviceSession {
    async fn run(mut self, mut side: DeviceSide) {
        if side.to_pos.send(DeviceMessage::Connected).await.is_err() {
            return;
        }

        if !self.pair(&mut side).await {
            let _ = side.to_pos.send(DeviceMessage::Disconnected).await;
            return;
        }

        while let Some(message) = side.from_pos.recv().await {
            let keep_going = match message {
                PosMessage::Discovery => self
                    .send(&side, DeviceMessage::Ready(self.identity.clone()))
                    .await,
                PosMessage::Sale(request) => self.handle_sale(&side, request).await,
                PosMessage::ShowMessage { text } => {
                    tracing::debug!(%text, "Device display updated");
                    *self.display.lock().expect("display lock") = text;
                    true
                }
                PosMessage::AcceptPayment { payment_id } => {
                    self.handle_accept_payment(&side, &payment_id).await
                }
                PosMessage::RejectPayment {
                    payment_id,
                    challenge,
                } => self.handle_reject_payment(&side, &payment_id, &challenge).await,
                PosMessage::AcceptSignature { payment_id } => {
                    self.handle_accept_signature(&side, &payment_id).await
                }
                PosMessage::RejectSignature { payment_id } => {
                    self.handle_reject_signature(&side, &payment_id).await
                }
                PosMessage::Dispose => break,
            };
            if !keep_going {
                break;
            }
        }

        let _ = side.to_pos.send(DeviceMessage::Disconnected).await;
    }

    /// Completes the pairing handshake. Returns false when the session must
    /// end instead of entering the request loop.
    async fn pair(&self, side: &mut DeviceSide) -> bool {
        match timeout(self.pairing_timeout, side.from_pos.recv()).await {
            Ok(Some(PosMessage::Discovery)) => {
                self.send(side, DeviceMessage::Ready(self.identity.clone()))
                    .await
            }
            Ok(Some(PosMessage::Dispose)) | Ok(None) => false,
            Ok(Some(_)) => {
                self.send(
                    side,
                    device_error(
                        DeviceErrorCode::Validation,
                        "Expected a discovery request before any other traffic",
                    ),
                )
                .await;
                false
            }
            Err(_) => {
                self.send(
                    side,
                    device_error(DeviceErrorCode::Communication, "Pairing timed out"),
                )
                .await;
                false
            }
        }
    }

    async fn handle_sale(&mut self, side: &DeviceSide, request: SaleRequest) -> bool {
        if self.pending.is_some() {
            return self
                .respond(
                    side,
                    SaleResponse::Failure {
                        result: TransactionResult::Fail,
                        reason: "Another sale is already in progress".to_string(),
                    },
                )
                .await;
        }
        if request.amount.is_zero() {
            return self
                .respond(
                    side,
                    SaleResponse::Failure {
                        result: TransactionResult::Fail,
                        reason: "Amount must be a positive number of cents".to_string(),
                    },
                )
                .await;
        }
        if let Some(limit) = self.decline_over {
            if request.amount > limit {
                return self
                    .respond(
                        side,
                        SaleResponse::Failure {
                            result: TransactionResult::Fail,
                            reason: format!("Amount exceeds the device limit of {limit}"),
                        },
                    )
                    .await;
            }
        }

        let payment = self.make_payment(&request);
        if self.last_amount == Some(request.amount) {
            let challenge = Challenge {
                reason: ChallengeReason::DuplicatePayment,
                message: format!(
                    "A payment of {} was just taken. Charge the same amount again?",
                    request.amount
                ),
            };
            self.pending = Some(PendingSale::Confirm {
                payment: payment.clone(),
            });
            return self
                .send(
                    side,
                    DeviceMessage::ConfirmPayment(ConfirmPaymentRequest {
                        payment,
                        challenges: vec![challenge],
                    }),
                )
                .await;
        }

        self.advance_past_confirmation(side, payment).await
    }

    /// Continues a sale that has cleared (or never needed) confirmation:
    /// either into a signature hold or straight to completion.
    async fn advance_past_confirmation(&mut self, side: &DeviceSide, payment: Payment) -> bool {
        if let Some(threshold) = self.signature_threshold {
            if payment.amount >= threshold {
                self.pending = Some(PendingSale::Signature {
                    payment: payment.clone(),
                });
                return self
                    .send(
                        side,
                        DeviceMessage::VerifySignature(VerifySignatureRequest {
                            payment,
                            signature: sample_signature(),
                        }),
                    )
                    .await;
            }
        }
        self.complete(side, payment).await
    }

    async fn handle_accept_payment(&mut self, side: &DeviceSide, payment_id: &str) -> bool {
        match self.pending.take() {
            Some(PendingSale::Confirm { payment }) if payment.id == payment_id => {
                self.advance_past_confirmation(side, payment).await
            }
            other => {
                self.pending = other;
                self.send(
                    side,
                    device_error(
                        DeviceErrorCode::Validation,
                        "No matching payment awaiting confirmation",
                    ),
                )
                .await
            }
        }
    }

    async fn handle_reject_payment(
        &mut self,
        side: &DeviceSide,
        payment_id: &str,
        challenge: &Challenge,
    ) -> bool {
        match self.pending.take() {
            Some(PendingSale::Confirm { payment }) if payment.id == payment_id => {
                self.respond(
                    side,
                    SaleResponse::Failure {
                        result: TransactionResult::Cancel,
                        reason: format!("Payment rejected: {}", challenge.message),
                    },
                )
                .await
            }
            other => {
                self.pending = other;
                self.send(
                    side,
                    device_error(
                        DeviceErrorCode::Validation,
                        "No matching payment awaiting confirmation",
                    ),
                )
                .await
            }
        }
    }

    async fn handle_accept_signature(&mut self, side: &DeviceSide, payment_id: &str) -> bool {
        match self.pending.take() {
            Some(PendingSale::Signature { payment }) if payment.id == payment_id => {
                self.complete(side, payment).await
            }
            other => {
                self.pending = other;
                self.send(
                    side,
                    device_error(
                        DeviceErrorCode::Validation,
                        "No matching payment awaiting signature verification",
                    ),
                )
                .await
            }
        }
    }

    async fn handle_reject_signature(&mut self, side: &DeviceSide, payment_id: &str) -> bool {
        match self.pending.take() {
            Some(PendingSale::Signature { payment }) if payment.id == payment_id => {
                self.respond(
                    side,
                    SaleResponse::Failure {
                        result: TransactionResult::Cancel,
                        reason: "Signature rejected".to_string(),
                    },
                )
                .await
            }
            other => {
                self.pending = other;
                self.send(
                    side,
                    device_error(
                        DeviceErrorCode::Validation,
                        "No matching payment awaiting signature verification",
                    ),
                )
                .await
            }
        }
    }

    async fn complete(&mut self, side: &DeviceSide, payment: Payment) -> bool {
        self.last_amount = Some(payment.amount);
        tracing::debug!(payment_id = %payment.id, amount = %payment.amount, "Sale completed");
        self.respond(side, SaleResponse::Success { payment }).await
    }

    async fn respond(&self, side: &DeviceSide, response: SaleResponse) -> bool {
        self.send(side, DeviceMessage::SaleResponse(response)).await
    }

    async fn send(&self, side: &DeviceSide, message: DeviceMessage) -> bool {
        side.to_pos.send(message).await.is_ok()
    }

    fn make_payment(&self, request: &SaleRequest) -> Payment {
        Payment {
            id: generated_id("PAY"),
            external_id: request.external_id.clone(),
            order_id: generated_id("ORD"),
            amount: request.amount,
            created_at: UnixTimestamp::now(),
        }
    }
}

fn device_error(code: DeviceErrorCode, message: &str) -> DeviceMessage {
    DeviceMessage::DeviceError(DeviceErrorEvent {
        code,
        message: message.to_string(),
    })
}

fn generated_id(prefix: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{prefix}{}", suffix.to_ascii_uppercase())
}

/// A fixed two-stroke squiggle standing in for a captured signature.
fn sample_signature() -> Signature {
    Signature {
        strokes: vec![
            Stroke {
                points: vec![
                    SignaturePoint { x: 12, y: 40 },
                    SignaturePoint { x: 35, y: 12 },
                    SignaturePoint { x: 58, y: 44 },
                ],
            },
            Stroke {
                points: vec![
                    SignaturePoint { x: 64, y: 28 },
                    SignaturePoint { x: 90, y: 30 },
                ],
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remotepay_types::proto::ExternalId;
    use url::Url;

    fn test_config(pairing_timeout: Duration) -> DeviceConnectionConfig {
        DeviceConnectionConfig {
            endpoint: Url::parse("https://sandbox.dev.clover.com/support/remote_pay/cs").unwrap(),
            merchant_id: "6QDCVBB8T1AJ1".to_string(),
            access_token: "f9b2c86f-73d0-53ff".to_string(),
            device_id: "d6c3d2e7-9f10-4d9f".to_string(),
            remote_application_id: "CLOVERDEV.655VQ41Z9CVF8".to_string(),
            friendly_id: "Primary POS".to_string(),
            pairing_timeout,
            response_timeout: Duration::from_secs(5),
        }
    }

    async fn paired_channel(device: &LocalDevice) -> DeviceChannel {
        let mut channel = device
            .open(&test_config(Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(matches!(
            channel.from_device.recv().await,
            Some(DeviceMessage::Connected)
        ));
        channel.to_device.send(PosMessage::Discovery).await.unwrap();
        assert!(matches!(
            channel.from_device.recv().await,
            Some(DeviceMessage::Ready(_))
        ));
        channel
    }

    fn sale(amount: u64) -> PosMessage {
        PosMessage::Sale(SaleRequest {
            external_id: ExternalId::generate(),
            amount: Cents::from(amount),
        })
    }

    async fn expect_response(channel: &mut DeviceChannel) -> SaleResponse {
        match channel.from_device.recv().await {
            Some(DeviceMessage::SaleResponse(response)) => response,
            other => panic!("expected a sale response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pairing_reports_identity() {
        let device = LocalDevice::default();
        let mut channel = device
            .open(&test_config(Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(matches!(
            channel.from_device.recv().await,
            Some(DeviceMessage::Connected)
        ));
        channel.to_device.send(PosMessage::Discovery).await.unwrap();
        match channel.from_device.recv().await {
            Some(DeviceMessage::Ready(identity)) => {
                assert_eq!(identity.serial, "C030UQ50550081");
            }
            other => panic!("expected ready, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pairing_timeout_disconnects() {
        let device = LocalDevice::default();
        let mut channel = device
            .open(&test_config(Duration::from_millis(20)))
            .await
            .unwrap();
        assert!(matches!(
            channel.from_device.recv().await,
            Some(DeviceMessage::Connected)
        ));
        // No discovery sent.
        assert!(matches!(
            channel.from_device.recv().await,
            Some(DeviceMessage::DeviceError(_))
        ));
        assert!(matches!(
            channel.from_device.recv().await,
            Some(DeviceMessage::Disconnected)
        ));
    }

    #[tokio::test]
    async fn test_sale_happy_path() {
        let device = LocalDevice::default();
        let mut channel = paired_channel(&device).await;

        let external_id = ExternalId::generate();
        channel
            .to_device
            .send(PosMessage::Sale(SaleRequest {
                external_id: external_id.clone(),
                amount: Cents::from(1250),
            }))
            .await
            .unwrap();

        let response = expect_response(&mut channel).await;
        let payment = response.payment().expect("successful sale");
        assert_eq!(payment.external_id, external_id);
        assert_eq!(payment.amount, Cents::from(1250));
    }

    #[tokio::test]
    async fn test_zero_amount_fails() {
        let device = LocalDevice::default();
        let mut channel = paired_channel(&device).await;

        channel.to_device.send(sale(0)).await.unwrap();
        let response = expect_response(&mut channel).await;
        assert_eq!(response.result(), TransactionResult::Fail);
    }

    #[tokio::test]
    async fn test_duplicate_amount_raises_challenge() {
        let device = LocalDevice::default();
        let mut channel = paired_channel(&device).await;

        channel.to_device.send(sale(500)).await.unwrap();
        assert!(expect_response(&mut channel).await.is_success());

        channel.to_device.send(sale(500)).await.unwrap();
        let request = match channel.from_device.recv().await {
            Some(DeviceMessage::ConfirmPayment(request)) => request,
            other => panic!("expected a confirmation hold, got {other:?}"),
        };
        assert_eq!(request.challenges.len(), 1);
        assert_eq!(
            request.challenges[0].reason,
            ChallengeReason::DuplicatePayment
        );

        // Accept resumes the held sale to completion.
        channel
            .to_device
            .send(PosMessage::AcceptPayment {
                payment_id: request.payment.id.clone(),
            })
            .await
            .unwrap();
        assert!(expect_response(&mut channel).await.is_success());
    }

    #[tokio::test]
    async fn test_rejected_challenge_cancels_sale() {
        let device = LocalDevice::default();
        let mut channel = paired_channel(&device).await;

        channel.to_device.send(sale(500)).await.unwrap();
        assert!(expect_response(&mut channel).await.is_success());

        channel.to_device.send(sale(500)).await.unwrap();
        let request = match channel.from_device.recv().await {
            Some(DeviceMessage::ConfirmPayment(request)) => request,
            other => panic!("expected a confirmation hold, got {other:?}"),
        };
        channel
            .to_device
            .send(PosMessage::RejectPayment {
                payment_id: request.payment.id.clone(),
                challenge: request.challenges[0].clone(),
            })
            .await
            .unwrap();
        let response = expect_response(&mut channel).await;
        assert_eq!(response.result(), TransactionResult::Cancel);
    }

    #[tokio::test]
    async fn test_signature_threshold_holds_sale() {
        let device = LocalDevice::new(LocalDeviceConfig {
            signature_threshold: Some(Cents::from(2500)),
            ..LocalDeviceConfig::default()
        });
        let mut channel = paired_channel(&device).await;

        channel.to_device.send(sale(3000)).await.unwrap();
        let request = match channel.from_device.recv().await {
            Some(DeviceMessage::VerifySignature(request)) => request,
            other => panic!("expected a signature hold, got {other:?}"),
        };
        assert!(request.signature.total_points() > 0);

        channel
            .to_device
            .send(PosMessage::AcceptSignature {
                payment_id: request.payment.id.clone(),
            })
            .await
            .unwrap();
        assert!(expect_response(&mut channel).await.is_success());
    }

    #[tokio::test]
    async fn test_decline_limit() {
        let device = LocalDevice::new(LocalDeviceConfig {
            decline_over: Some(Cents::from(10_000)),
            ..LocalDeviceConfig::default()
        });
        let mut channel = paired_channel(&device).await;

        channel.to_device.send(sale(10_001)).await.unwrap();
        let response = expect_response(&mut channel).await;
        assert_eq!(response.result(), TransactionResult::Fail);
    }

    #[tokio::test]
    async fn test_show_message_updates_display() {
        let device = LocalDevice::default();
        let display = device.display_handle();
        let mut channel = paired_channel(&device).await;

        channel
            .to_device
            .send(PosMessage::ShowMessage {
                text: "Hello World".to_string(),
            })
            .await
            .unwrap();
        channel.to_device.send(PosMessage::Dispose).await.unwrap();
        assert!(matches!(
            channel.from_device.recv().await,
            Some(DeviceMessage::Disconnected)
        ));
        assert_eq!(*display.lock().unwrap(), "Hello World");
    }

    #[tokio::test]
    async fn test_dispose_disconnects() {
        let device = LocalDevice::default();
        let mut channel = paired_channel(&device).await;
        channel.to_device.send(PosMessage::Dispose).await.unwrap();
        assert!(matches!(
            channel.from_device.recv().await,
            Some(DeviceMessage::Disconnected)
        ));
    }
}
