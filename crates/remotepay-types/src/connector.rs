//! The device connector seam: connector trait, listener capability set, and
//! the transport abstraction a session runs over.
//!
//! # Architecture
//!
//! The paired card-reading device is an opaque external service. A
//! [`Connector`] is the only way a point of sale talks to it: connect,
//! dispose, submit a sale, and answer challenges. Device-initiated traffic
//! comes back through [`ConnectorListener`] callbacks registered before the
//! connection is initialized.
//!
//! The socket layer underneath a session (framing, retries, reconnection)
//! is not modeled here. It hides behind [`DeviceTransport`], which turns a
//! [`DeviceConnectionConfig`] into a pair of message channels and nothing
//! more.
//!
//! # Challenge decisions
//!
//! A sale can be held by the device pending a
//! [`ConfirmPaymentRequest`](crate::proto::ConfirmPaymentRequest) or a
//! [`VerifySignatureRequest`](crate::proto::VerifySignatureRequest). Deciding
//! a challenge is the listener's job: nothing in this crate or its
//! implementations accepts or rejects on the caller's behalf.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

use crate::proto::{
    Challenge, ConfirmPaymentRequest, DeviceErrorEvent, DeviceIdentity, DeviceMessage, Payment,
    PosMessage, SaleRequest, SaleResponse, VerifySignatureRequest,
};

/// Errors surfaced by [`Connector`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// The operation needs an initialized connection.
    #[error("Connector is not connected")]
    NotConnected,
    /// `initialize_connection` was called on an already-initialized connector.
    #[error("Connector is already connected")]
    AlreadyConnected,
    /// The connector was disposed; connectors are single-session.
    #[error("Connector is disposed")]
    Disposed,
    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors surfaced by [`DeviceTransport`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The session could not be established.
    #[error("Device session refused: {0}")]
    Refused(String),
    /// The session closed underneath an in-flight operation.
    #[error("Device session closed")]
    Closed,
}

/// Read-only parameters for establishing a device session.
///
/// Assembled once per connect from caller credentials, the environment
/// switch, and hard-coded application identifiers, then handed to the
/// transport unmodified. Never mutated afterward.
#[derive(Debug, Clone)]
pub struct DeviceConnectionConfig {
    /// Cloud relay endpoint the session dials.
    pub endpoint: Url,
    /// Merchant the device is registered under.
    pub merchant_id: String,
    /// OAuth access token, passed through as-is.
    pub access_token: String,
    /// Id of the device to pair with.
    pub device_id: String,
    /// Identifier of the integrating application.
    pub remote_application_id: String,
    /// Operator-facing name for this point of sale.
    pub friendly_id: String,
    /// How long to wait for pairing to complete.
    pub pairing_timeout: Duration,
    /// How long to wait for a terminal response to a request.
    pub response_timeout: Duration,
}

/// The point-of-sale end of an established session: messages out, events in.
pub struct DeviceChannel {
    /// Sends requests to the device.
    pub to_device: mpsc::Sender<PosMessage>,
    /// Receives events from the device.
    pub from_device: mpsc::Receiver<DeviceMessage>,
}

/// The device end of an established session. Held by transport
/// implementations.
pub struct DeviceSide {
    /// Receives requests from the point of sale.
    pub from_pos: mpsc::Receiver<PosMessage>,
    /// Sends events to the point of sale.
    pub to_pos: mpsc::Sender<DeviceMessage>,
}

impl DeviceChannel {
    /// Creates a connected channel pair with the given buffer capacity.
    pub fn pair(capacity: usize) -> (DeviceChannel, DeviceSide) {
        let (to_device, from_pos) = mpsc::channel(capacity);
        let (to_pos, from_device) = mpsc::channel(capacity);
        (
            DeviceChannel {
                to_device,
                from_device,
            },
            DeviceSide { from_pos, to_pos },
        )
    }
}

/// Opens device sessions.
///
/// Implementations own every transport-level concern (socket framing,
/// retries, reconnection) and expose none of it: a session is just a pair of
/// message channels. The in-process emulated device is one implementation; a
/// cloud socket transport is another.
#[async_trait]
pub trait DeviceTransport: Send + Sync + 'static {
    /// Establishes a session described by `config`.
    async fn open(&self, config: &DeviceConnectionConfig) -> Result<DeviceChannel, TransportError>;
}

/// Mediates a session with a physical payment-card-reading device.
///
/// Register listeners first, then call
/// [`initialize_connection`](Connector::initialize_connection). Events arrive
/// on the listeners; requests go out through the methods below. A connector
/// is single-session: once disposed it stays disposed.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establishes the device session and starts event delivery.
    async fn initialize_connection(&self) -> Result<(), ConnectorError>;

    /// Tears the session down, best effort.
    ///
    /// Never fails: disposal problems are logged and swallowed so shutdown
    /// paths can call this unconditionally.
    async fn dispose(&self);

    /// Submits a sale. The outcome arrives via
    /// [`ConnectorListener::on_sale_response`].
    async fn sale(&self, request: SaleRequest) -> Result<(), ConnectorError>;

    /// Shows a free-form message on the device display.
    async fn show_message(&self, text: &str) -> Result<(), ConnectorError>;

    /// Accepts a challenged payment, letting the sale proceed.
    async fn accept_payment(&self, payment: &Payment) -> Result<(), ConnectorError>;

    /// Rejects a challenged payment, cancelling the sale.
    async fn reject_payment(
        &self,
        payment: &Payment,
        challenge: &Challenge,
    ) -> Result<(), ConnectorError>;

    /// Accepts a captured signature, letting the sale complete.
    async fn accept_signature(
        &self,
        request: &VerifySignatureRequest,
    ) -> Result<(), ConnectorError>;

    /// Rejects a captured signature, cancelling the sale.
    async fn reject_signature(
        &self,
        request: &VerifySignatureRequest,
    ) -> Result<(), ConnectorError>;
}

/// Callbacks for device-initiated events.
///
/// This is the required capability set; every method has a default no-op
/// body, so an implementor overrides exactly the events it cares about.
/// Challenge callbacks (`on_confirm_payment_request`,
/// `on_verify_signature_request`) hold a sale until the implementor calls
/// back into the connector with an accept or reject.
pub trait ConnectorListener: Send + Sync {
    /// The session transport is established; pairing is still in progress.
    fn on_device_connected(&self) {}

    /// Pairing completed; the device accepts requests now.
    fn on_device_ready(&self, _identity: &DeviceIdentity) {}

    /// The session ended.
    fn on_device_disconnected(&self) {}

    /// The device reported an error.
    fn on_device_error(&self, _event: &DeviceErrorEvent) {}

    /// A sale reached its terminal outcome.
    fn on_sale_response(&self, _response: &SaleResponse) {}

    /// A sale is held pending payment confirmation.
    fn on_confirm_payment_request(&self, _request: &ConfirmPaymentRequest) {}

    /// A sale is held pending signature verification.
    fn on_verify_signature_request(&self, _request: &VerifySignatureRequest) {}
}

/// An ordered collection of registered listeners.
///
/// Connector implementations use this to fan a device event out to every
/// registered listener in registration order.
#[derive(Default, Clone)]
pub struct Listeners(Vec<Arc<dyn ConnectorListener>>);

impl Listeners {
    /// Registers a listener.
    pub fn push<L: ConnectorListener + 'static>(&mut self, listener: L) {
        self.0.push(Arc::new(listener));
    }

    /// Returns true when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Routes a device message to the matching callback on every listener.
    pub fn dispatch(&self, message: &DeviceMessage) {
        for listener in &self.0 {
            match message {
                DeviceMessage::Connected => listener.on_device_connected(),
                DeviceMessage::Ready(identity) => listener.on_device_ready(identity),
                DeviceMessage::Disconnected => listener.on_device_disconnected(),
                DeviceMessage::DeviceError(event) => listener.on_device_error(event),
                DeviceMessage::SaleResponse(response) => listener.on_sale_response(response),
                DeviceMessage::ConfirmPayment(request) => {
                    listener.on_confirm_payment_request(request)
                }
                DeviceMessage::VerifySignature(request) => {
                    listener.on_verify_signature_request(request)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{Cents, DeviceErrorCode, ExternalId, TransactionResult};
    use std::sync::Mutex;

    /// Overrides nothing; exercises the default capability set.
    struct Inert;
    impl ConnectorListener for Inert {}

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    impl ConnectorListener for Recording {
        fn on_device_connected(&self) {
            self.0.lock().unwrap().push("connected".into());
        }
        fn on_device_ready(&self, identity: &DeviceIdentity) {
            self.0.lock().unwrap().push(format!("ready:{}", identity.serial));
        }
        fn on_sale_response(&self, response: &SaleResponse) {
            self.0
                .lock()
                .unwrap()
                .push(format!("sale:{}", response.result()));
        }
        fn on_device_error(&self, event: &DeviceErrorEvent) {
            self.0.lock().unwrap().push(format!("error:{event}"));
        }
    }

    #[test]
    fn test_default_listener_ignores_everything() {
        let mut listeners = Listeners::default();
        listeners.push(Inert);
        listeners.dispatch(&DeviceMessage::Connected);
        listeners.dispatch(&DeviceMessage::Disconnected);
    }

    #[test]
    fn test_dispatch_routes_to_matching_callback() {
        let recording = Arc::new(Recording::default());
        let mut listeners = Listeners::default();
        listeners.push(SharedListener(recording.clone()));

        listeners.dispatch(&DeviceMessage::Connected);
        listeners.dispatch(&DeviceMessage::Ready(DeviceIdentity {
            serial: "C030UQ50550081".into(),
            model: "Terminal One".into(),
        }));
        listeners.dispatch(&DeviceMessage::SaleResponse(SaleResponse::Failure {
            result: TransactionResult::Cancel,
            reason: "declined".into(),
        }));
        listeners.dispatch(&DeviceMessage::DeviceError(DeviceErrorEvent {
            code: DeviceErrorCode::Communication,
            message: "relay unreachable".into(),
        }));

        let seen = recording.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                "connected",
                "ready:C030UQ50550081",
                "sale:CANCEL",
                "error:relay unreachable",
            ]
        );
    }

    /// Forwards to a shared recording listener so the test can observe calls
    /// after registration hands ownership to the collection.
    struct SharedListener(Arc<Recording>);

    impl ConnectorListener for SharedListener {
        fn on_device_connected(&self) {
            self.0.on_device_connected();
        }
        fn on_device_ready(&self, identity: &DeviceIdentity) {
            self.0.on_device_ready(identity);
        }
        fn on_sale_response(&self, response: &SaleResponse) {
            self.0.on_sale_response(response);
        }
        fn on_device_error(&self, event: &DeviceErrorEvent) {
            self.0.on_device_error(event);
        }
    }

    #[test]
    fn test_channel_pair_is_connected() {
        let (mut channel, mut device) = DeviceChannel::pair(8);
        channel
            .to_device
            .try_send(PosMessage::Sale(SaleRequest {
                external_id: ExternalId::from("bc54yg8p0asdf"),
                amount: Cents::from(500),
            }))
            .unwrap();
        let received = device.from_pos.try_recv().unwrap();
        assert!(matches!(received, PosMessage::Sale(_)));

        device.to_pos.try_send(DeviceMessage::Connected).unwrap();
        assert!(matches!(
            channel.from_device.try_recv().unwrap(),
            DeviceMessage::Connected
        ));
    }
}
