//! Startup wiring and command dispatch.
//!
//! - Loads `.env` values and initializes tracing (stderr, `RUST_LOG`).
//! - Resolves configuration from CLI flags, the environment, and the
//!   optional config file.
//! - Installs the shutdown signal watcher so the connector is disposed on
//!   SIGINT/SIGTERM as well as on normal exit.

use dotenvy::dotenv;
use std::error::Error;
use tracing_subscriber::EnvFilter;

use remotepay_cloud::CloudApiClient;

use crate::config::{Command, Settings};
use crate::session::Session;
use crate::sig_down::SigDown;
use crate::terminal;

/// Runs one invocation of the point-of-sale terminal.
pub async fn run() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    init_tracing();

    let settings = Settings::load()?;
    let sig_down = SigDown::install()?;
    let token = sig_down.token();

    match settings.command.clone() {
        Command::Devices => {
            let credentials = settings.require_credentials()?;
            let client = CloudApiClient::new(
                settings.environment,
                credentials.merchant_id,
                credentials.access_token,
            );
            let devices = client.devices().await?;
            if devices.is_empty() {
                println!("No pairable devices.");
            } else {
                println!("{:<40} SERIAL", "DEVICE ID");
                for device in devices {
                    println!("{:<40} {}", device.id, device.serial);
                }
            }
            Ok(())
        }
        Command::Sale { device, amount } => {
            let device_id = settings.device_for(device)?;
            let cents = amount.to_cents()?;

            let mut session = Session::start(&settings, &device_id).await?;
            let outcome = tokio::select! {
                result = session.sale(cents) => Some(result),
                _ = token.cancelled() => None,
            };
            session.dispose().await;

            match outcome {
                Some(Ok(response)) => match response.payment() {
                    Some(payment) => {
                        println!("Sale successful: {} (payment {})", payment.amount, payment.id);
                        Ok(())
                    }
                    None => Err(format!(
                        "Sale {}: {}",
                        response.result(),
                        response.reason().unwrap_or("no reason given")
                    )
                    .into()),
                },
                Some(Err(e)) => Err(e),
                None => Ok(()),
            }
        }
        Command::Message { device, text } => {
            let device_id = settings.device_for(device)?;

            let mut session = Session::start(&settings, &device_id).await?;
            let result = tokio::select! {
                result = session.show_message(&text) => result,
                _ = token.cancelled() => Ok(()),
            };
            session.dispose().await;
            result?;
            println!("Message shown on the device.");
            Ok(())
        }
        Command::Terminal { device } => {
            let device_id = settings.device_for(device)?;
            terminal::run_terminal(&settings, &device_id, token).await
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
