//! Point-of-sale terminal entrypoint.
//!
//! This binary drives a cloud-paired payment device:
//!
//! - `devices` – enumerate the merchant's pairable devices
//! - `sale` – charge a single amount and exit
//! - `message` – show a message on the device display
//! - `terminal` – interactive numeric-keypad amount entry
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `MERCHANT_ID`, `ACCESS_TOKEN` supply merchant credentials
//! - `POS_ENVIRONMENT` selects sandbox or production
//! - `RUST_LOG` controls tracing output (stderr)

mod config;
mod keypad;
mod listener;
mod run;
mod session;
mod sig_down;
mod terminal;

use std::process;

use crate::run::run;

#[tokio::main]
async fn main() {
    let result = run().await;
    if let Err(e) = result {
        println!("{e}");
        process::exit(1)
    }
}
