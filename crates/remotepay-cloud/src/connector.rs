//! The shipped [`Connector`] implementation.
//!
//! [`CloudConnector`] owns the point-of-sale half of a device session: it
//! opens the transport, fans device events out to registered listeners from
//! a background dispatch task, and turns connector calls into session
//! messages. It is generic over the [`DeviceTransport`] so the same
//! orchestration drives a cloud socket and the in-process emulated device
//! alike.
//!
//! # Lifecycle
//!
//! Listeners are registered while the connector is idle; they are snapshotted
//! when [`initialize_connection`](Connector::initialize_connection) runs and
//! a listener added afterward is not seen by the running session (there is
//! deliberately no reattachment bookkeeping). Disposal is best effort and
//! idempotent: failures are logged, never surfaced.

use async_trait::async_trait;
use std::sync::RwLock;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use remotepay_types::connector::{
    Connector, ConnectorError, ConnectorListener, DeviceConnectionConfig, DeviceTransport,
    Listeners, TransportError,
};
use remotepay_types::proto::{
    Challenge, DeviceMessage, Payment, PosMessage, SaleRequest, VerifySignatureRequest,
};

/// A [`Connector`] over a pluggable [`DeviceTransport`].
///
/// # Example
///
/// ```rust,ignore
/// let connector = CloudConnector::new(transport, config);
/// connector.add_listener(listener);
/// connector.initialize_connection().await?;
/// connector.sale(SaleRequest::new(Cents::from(1250))).await?;
/// ```
pub struct CloudConnector<T> {
    transport: T,
    config: DeviceConnectionConfig,
    listeners: RwLock<Listeners>,
    to_device: Mutex<Option<mpsc::Sender<PosMessage>>>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl<T> CloudConnector<T> {
    /// Creates an idle connector for `config` over `transport`.
    pub fn new(transport: T, config: DeviceConnectionConfig) -> Self {
        CloudConnector {
            transport,
            config,
            listeners: RwLock::new(Listeners::default()),
            to_device: Mutex::new(None),
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Registers a listener. Call before
    /// [`initialize_connection`](Connector::initialize_connection).
    pub fn add_listener<L: ConnectorListener + 'static>(&self, listener: L) {
        self.listeners.write().expect("listener lock").push(listener);
    }

    /// Returns the configuration this connector was built with.
    pub fn config(&self) -> &DeviceConnectionConfig {
        &self.config
    }

    async fn send(&self, message: PosMessage) -> Result<(), ConnectorError> {
        let guard = self.to_device.lock().await;
        let sender = guard.as_ref().ok_or(ConnectorError::NotConnected)?;
        sender
            .send(message)
            .await
            .map_err(|_| ConnectorError::Transport(TransportError::Closed))
    }
}

#[async_trait]
impl<T> Connector for CloudConnector<T>
where
    T: DeviceTransport,
{
    async fn initialize_connection(&self) -> Result<(), ConnectorError> {
        if self.cancel.is_cancelled() {
            return Err(ConnectorError::Disposed);
        }
        let mut guard = self.to_device.lock().await;
        if guard.is_some() {
            return Err(ConnectorError::AlreadyConnected);
        }

        let channel = self.transport.open(&self.config).await?;
        let to_device = channel.to_device;
        // Pairing starts immediately; the device answers with Ready once the
        // handshake completes.
        to_device
            .send(PosMessage::Discovery)
            .await
            .map_err(|_| ConnectorError::Transport(TransportError::Closed))?;
        *guard = Some(to_device);

        let listeners = self.listeners.read().expect("listener lock").clone();
        let cancel = self.cancel.clone();
        let mut from_device = channel.from_device;
        self.tracker.spawn(async move {
            let mut disconnect_seen = false;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    message = from_device.recv() => match message {
                        Some(message) => {
                            disconnect_seen |= matches!(message, DeviceMessage::Disconnected);
                            listeners.dispatch(&message);
                            if disconnect_seen {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
            // A transport that dies without saying goodbye still counts as a
            // disconnect for the listeners. Deliberate disposal does not.
            if !disconnect_seen && !cancel.is_cancelled() {
                listeners.dispatch(&DeviceMessage::Disconnected);
            }
        });

        tracing::info!(device_id = %self.config.device_id, "Device session initialized");
        Ok(())
    }

    async fn dispose(&self) {
        let sender = self.to_device.lock().await.take();
        match sender {
            Some(sender) => {
                if let Err(e) = sender.send(PosMessage::Dispose).await {
                    tracing::warn!("Device session already gone during disposal: {e}");
                }
            }
            None => tracing::debug!("Dispose called on an unconnected connector"),
        }
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    async fn sale(&self, request: SaleRequest) -> Result<(), ConnectorError> {
        tracing::debug!(external_id = %request.external_id, amount = %request.amount, "Submitting sale");
        self.send(PosMessage::Sale(request)).await
    }

    async fn show_message(&self, text: &str) -> Result<(), ConnectorError> {
        self.send(PosMessage::ShowMessage {
            text: text.to_string(),
        })
        .await
    }

    async fn accept_payment(&self, payment: &Payment) -> Result<(), ConnectorError> {
        self.send(PosMessage::AcceptPayment {
            payment_id: payment.id.clone(),
        })
        .await
    }

    async fn reject_payment(
        &self,
        payment: &Payment,
        challenge: &Challenge,
    ) -> Result<(), ConnectorError> {
        self.send(PosMessage::RejectPayment {
            payment_id: payment.id.clone(),
            challenge: challenge.clone(),
        })
        .await
    }

    async fn accept_signature(
        &self,
        request: &VerifySignatureRequest,
    ) -> Result<(), ConnectorError> {
        self.send(PosMessage::AcceptSignature {
            payment_id: request.payment.id.clone(),
        })
        .await
    }

    async fn reject_signature(
        &self,
        request: &VerifySignatureRequest,
    ) -> Result<(), ConnectorError> {
        self.send(PosMessage::RejectSignature {
            payment_id: request.payment.id.clone(),
        })
        .await
    }
}
