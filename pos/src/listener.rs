//! Bridges connector callbacks into the terminal's event loop.
//!
//! Listener callbacks fire on the connector's dispatch task; the UI wants
//! them on its own select loop. [`PosListener`] forwards every callback into
//! an unbounded channel as a [`UiEvent`].

use tokio::sync::mpsc;

use remotepay_types::connector::ConnectorListener;
use remotepay_types::proto::{
    ConfirmPaymentRequest, DeviceErrorEvent, DeviceIdentity, SaleResponse, VerifySignatureRequest,
};

/// A device event as seen by the terminal UI.
#[derive(Debug)]
pub enum UiEvent {
    Connected,
    Ready(DeviceIdentity),
    Disconnected,
    Error(DeviceErrorEvent),
    Sale(SaleResponse),
    Confirm(ConfirmPaymentRequest),
    Signature(VerifySignatureRequest),
}

/// The point-of-sale listener: forwards callbacks as [`UiEvent`]s.
pub struct PosListener {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl PosListener {
    /// Creates a listener and the receiving half the UI loop consumes.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (PosListener { tx }, rx)
    }

    fn forward(&self, event: UiEvent) {
        // The UI loop may already be gone during shutdown; that's fine.
        let _ = self.tx.send(event);
    }
}

impl ConnectorListener for PosListener {
    fn on_device_connected(&self) {
        self.forward(UiEvent::Connected);
    }

    fn on_device_ready(&self, identity: &DeviceIdentity) {
        self.forward(UiEvent::Ready(identity.clone()));
    }

    fn on_device_disconnected(&self) {
        self.forward(UiEvent::Disconnected);
    }

    fn on_device_error(&self, event: &DeviceErrorEvent) {
        self.forward(UiEvent::Error(event.clone()));
    }

    fn on_sale_response(&self, response: &SaleResponse) {
        self.forward(UiEvent::Sale(response.clone()));
    }

    fn on_confirm_payment_request(&self, request: &ConfirmPaymentRequest) {
        self.forward(UiEvent::Confirm(request.clone()));
    }

    fn on_verify_signature_request(&self, request: &VerifySignatureRequest) {
        self.forward(UiEvent::Signature(request.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remotepay_types::connector::Listeners;
    use remotepay_types::proto::DeviceMessage;

    #[test]
    fn test_forwards_dispatch_as_ui_events() {
        let (listener, mut rx) = PosListener::channel();
        let mut listeners = Listeners::default();
        listeners.push(listener);

        listeners.dispatch(&DeviceMessage::Connected);
        listeners.dispatch(&DeviceMessage::Disconnected);

        assert!(matches!(rx.try_recv().unwrap(), UiEvent::Connected));
        assert!(matches!(rx.try_recv().unwrap(), UiEvent::Disconnected));
        assert!(rx.try_recv().is_err());
    }
}
