//! Session wiring for the one-shot commands.
//!
//! `sale` and `message` share the same shape: pair with the device, do one
//! thing, dispose on the way out. Challenges raised mid-sale are decided by
//! the operator on stdin; nothing is accepted on their behalf.

use std::error::Error;
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use remotepay_cloud::CloudConnector;
use remotepay_cloud::builder::{CloudDeviceConfigurationBuilder, REMOTE_APPLICATION_ID};
use remotepay_device_local::LocalDevice;
use remotepay_types::connector::{Connector, DeviceConnectionConfig};
use remotepay_types::proto::{Cents, SaleRequest, SaleResponse};
use tokio::sync::mpsc;

use crate::config::{ConfigError, Settings};
use crate::listener::{PosListener, UiEvent};

/// A paired session with the device, ready for requests.
pub struct Session {
    connector: CloudConnector<LocalDevice>,
    events: mpsc::UnboundedReceiver<UiEvent>,
    response_timeout: Duration,
}

/// Assembles the connection configuration for a session command.
pub fn connection_config(
    settings: &Settings,
    device_id: &str,
) -> Result<DeviceConnectionConfig, Box<dyn Error>> {
    let credentials = settings.session_credentials()?;
    let config = CloudDeviceConfigurationBuilder::new(
        REMOTE_APPLICATION_ID,
        device_id,
        credentials.merchant_id,
        credentials.access_token,
    )
    .with_environment(settings.environment)
    .build()?;
    Ok(config)
}

impl Session {
    /// Pairs with the device and waits until it is ready for requests.
    pub async fn start(settings: &Settings, device_id: &str) -> Result<Self, Box<dyn Error>> {
        if !settings.emulated {
            return Err(ConfigError::CloudTransportUnavailable.into());
        }
        let config = connection_config(settings, device_id)?;
        let pairing_timeout = config.pairing_timeout;
        let response_timeout = config.response_timeout;

        let (listener, events) = PosListener::channel();
        let connector = CloudConnector::new(LocalDevice::default(), config);
        connector.add_listener(listener);
        connector.initialize_connection().await?;

        let mut session = Session {
            connector,
            events,
            response_timeout,
        };
        session.wait_until_ready(pairing_timeout).await?;
        Ok(session)
    }

    async fn wait_until_ready(&mut self, pairing_timeout: Duration) -> Result<(), Box<dyn Error>> {
        loop {
            match self.next_event(pairing_timeout).await? {
                UiEvent::Connected => println!("Device is connected!"),
                UiEvent::Ready(identity) => {
                    println!("Device is connected and ready!");
                    tracing::debug!(serial = %identity.serial, model = %identity.model, "Paired");
                    return Ok(());
                }
                UiEvent::Error(event) => println!("Message: {event}"),
                UiEvent::Disconnected => return Err("Device is disconnected!".into()),
                other => tracing::debug!(?other, "Ignoring pre-ready event"),
            }
        }
    }

    /// Submits one sale and drives it to its terminal response, prompting
    /// the operator for any challenge along the way.
    pub async fn sale(&mut self, amount: Cents) -> Result<SaleResponse, Box<dyn Error>> {
        let request = SaleRequest::new(amount);
        println!("Charging {amount}...");
        self.connector.sale(request).await?;

        loop {
            match self.next_event(self.response_timeout).await? {
                UiEvent::Sale(response) => return Ok(response),
                UiEvent::Confirm(request) => {
                    let mut accepted = true;
                    for challenge in &request.challenges {
                        if !prompt_yes_no(&challenge.message).await? {
                            self.connector
                                .reject_payment(&request.payment, challenge)
                                .await?;
                            accepted = false;
                            break;
                        }
                    }
                    if accepted {
                        self.connector.accept_payment(&request.payment).await?;
                    }
                }
                UiEvent::Signature(request) => {
                    let question = format!(
                        "Customer signature captured ({} points). Accept?",
                        request.signature.total_points()
                    );
                    if prompt_yes_no(&question).await? {
                        self.connector.accept_signature(&request).await?;
                    } else {
                        self.connector.reject_signature(&request).await?;
                    }
                }
                UiEvent::Error(event) => println!("Message: {event}"),
                UiEvent::Disconnected => return Err("Device is disconnected!".into()),
                other => tracing::debug!(?other, "Ignoring event during sale"),
            }
        }
    }

    /// Shows a free-form message on the device display.
    pub async fn show_message(&mut self, text: &str) -> Result<(), Box<dyn Error>> {
        self.connector.show_message(text).await?;
        Ok(())
    }

    /// Tears the session down, best effort.
    pub async fn dispose(self) {
        self.connector.dispose().await;
    }

    async fn next_event(&mut self, wait: Duration) -> Result<UiEvent, Box<dyn Error>> {
        let event = tokio::time::timeout(wait, self.events.recv())
            .await
            .map_err(|_| "Timed out waiting for the device")?
            .ok_or("Device session ended unexpectedly")?;
        Ok(event)
    }
}

/// Asks the operator a yes/no question on stdin. Defaults to no.
async fn prompt_yes_no(question: &str) -> Result<bool, std::io::Error> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
