//! Interactive numeric-keypad terminal.
//!
//! Raw-mode key events feed the [`Keypad`]; every press repaints the total,
//! including presses that change nothing. Device events update the status
//! segment, device errors become a dismissable alert, and challenges switch
//! the line into a y/n prompt that calls straight through to the connector.
//!
//! Keys: digits and backspace edit the amount, `Enter` charges it, `h` shows
//! "Hello World" on the device display, `q` or Ctrl-C quits.

use std::error::Error;
use std::io::Write;

use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{Clear, ClearType, disable_raw_mode, enable_raw_mode};
use crossterm::{cursor, execute, style::Print};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use remotepay_cloud::CloudConnector;
use remotepay_device_local::LocalDevice;
use remotepay_types::connector::Connector;
use remotepay_types::proto::{ConfirmPaymentRequest, SaleRequest, VerifySignatureRequest};

use crate::config::{ConfigError, Settings};
use crate::keypad::{Keypad, KeypadKey};
use crate::listener::{PosListener, UiEvent};
use crate::session;

const HELLO_TEXT: &str = "Hello World";

/// What the single UI line is currently doing.
enum Prompt {
    /// Normal amount entry.
    None,
    /// A device error shown until any key dismisses it.
    Alert(String),
    /// A payment confirmation hold awaiting y/n.
    Confirm(ConfirmPaymentRequest),
    /// A signature hold awaiting y/n.
    Signature(VerifySignatureRequest),
}

/// Runs the interactive terminal until the operator quits or the process is
/// signalled. The connector is disposed on every exit path.
pub async fn run_terminal(
    settings: &Settings,
    device_id: &str,
    token: CancellationToken,
) -> Result<(), Box<dyn Error>> {
    if !settings.emulated {
        return Err(ConfigError::CloudTransportUnavailable.into());
    }
    let config = session::connection_config(settings, device_id)?;
    let (listener, events) = PosListener::channel();
    let connector = CloudConnector::new(LocalDevice::default(), config);
    connector.add_listener(listener);
    connector.initialize_connection().await?;

    let (key_tx, keys) = mpsc::unbounded_channel();
    spawn_input_thread(key_tx);

    let mut ui = TerminalUi {
        connector: &connector,
        events,
        keys,
        keypad: Keypad::default(),
        status: "Connecting...".to_string(),
        prompt: Prompt::None,
        sale_in_flight: false,
    };

    enable_raw_mode()?;
    let result = ui.event_loop(&token).await;
    let _ = disable_raw_mode();
    println!();

    connector.dispose().await;
    result
}

/// Reads crossterm key presses on a dedicated thread and forwards them to
/// the async loop. The thread ends when the receiving side is dropped.
fn spawn_input_thread(tx: mpsc::UnboundedSender<KeyEvent>) {
    std::thread::spawn(move || {
        loop {
            match event::read() {
                Ok(TermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    if tx.send(key).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });
}

struct TerminalUi<'a> {
    connector: &'a CloudConnector<LocalDevice>,
    events: mpsc::UnboundedReceiver<UiEvent>,
    keys: mpsc::UnboundedReceiver<KeyEvent>,
    keypad: Keypad,
    status: String,
    prompt: Prompt,
    sale_in_flight: bool,
}

impl TerminalUi<'_> {
    async fn event_loop(&mut self, token: &CancellationToken) -> Result<(), Box<dyn Error>> {
        self.paint()?;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                key = self.keys.recv() => match key {
                    Some(key) => {
                        if self.handle_key(key).await? {
                            break;
                        }
                        self.paint()?;
                    }
                    None => break,
                },
                device_event = self.events.recv() => match device_event {
                    Some(device_event) => {
                        self.handle_device_event(device_event);
                        self.paint()?;
                    }
                    None => break,
                },
            }
        }
        Ok(())
    }

    /// Applies one key press. Returns true when the operator quits.
    async fn handle_key(&mut self, key: KeyEvent) -> Result<bool, Box<dyn Error>> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(true);
        }

        match std::mem::replace(&mut self.prompt, Prompt::None) {
            Prompt::Alert(_) => Ok(false),
            Prompt::Confirm(request) => {
                if is_yes(&key) {
                    self.connector.accept_payment(&request.payment).await?;
                } else {
                    self.connector
                        .reject_payment(&request.payment, &request.challenges[0])
                        .await?;
                }
                self.status = "Waiting for the device...".to_string();
                Ok(false)
            }
            Prompt::Signature(request) => {
                if is_yes(&key) {
                    self.connector.accept_signature(&request).await?;
                } else {
                    self.connector.reject_signature(&request).await?;
                }
                self.status = "Waiting for the device...".to_string();
                Ok(false)
            }
            Prompt::None => self.handle_entry_key(key).await,
        }
    }

    async fn handle_entry_key(&mut self, key: KeyEvent) -> Result<bool, Box<dyn Error>> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.keypad.press(KeypadKey::Digit(c as u8 - b'0'));
            }
            KeyCode::Backspace | KeyCode::Delete => {
                self.keypad.press(KeypadKey::Delete);
            }
            KeyCode::Enter => {
                let amount = self.keypad.cents();
                if self.sale_in_flight {
                    self.status = "A sale is already in progress".to_string();
                } else if amount.is_zero() {
                    self.status = "Enter an amount first".to_string();
                } else {
                    self.connector.sale(SaleRequest::new(amount)).await?;
                    self.sale_in_flight = true;
                    self.status = format!("Charging {amount}...");
                }
            }
            KeyCode::Char('h') => {
                self.connector.show_message(HELLO_TEXT).await?;
                self.status = format!("Sent \"{HELLO_TEXT}\" to the device");
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_device_event(&mut self, device_event: UiEvent) {
        match device_event {
            UiEvent::Connected => self.status = "Device is connected!".to_string(),
            UiEvent::Ready(_) => self.status = "Device is connected and ready!".to_string(),
            UiEvent::Disconnected => self.status = "Device is disconnected!".to_string(),
            UiEvent::Error(event) => {
                self.prompt = Prompt::Alert(format!("Message: {event}"));
            }
            UiEvent::Sale(response) => {
                self.sale_in_flight = false;
                match response.payment() {
                    Some(payment) => {
                        self.status = format!("Sale successful: {}", payment.amount);
                        self.keypad.clear();
                    }
                    None => {
                        self.status = format!(
                            "Sale {}: {}",
                            response.result(),
                            response.reason().unwrap_or("no reason given")
                        );
                    }
                }
            }
            UiEvent::Confirm(request) => self.prompt = Prompt::Confirm(request),
            UiEvent::Signature(request) => self.prompt = Prompt::Signature(request),
        }
    }

    /// Repaints the UI line. Runs after every key press and device event,
    /// whether or not anything changed.
    fn paint(&self) -> Result<(), std::io::Error> {
        let line = match &self.prompt {
            Prompt::None => format!(
                "{:indent$}{:>8}  [{}]  digits enter=charge h=hello q=quit",
                "",
                self.keypad.render(),
                self.status,
                indent = self.keypad.indent(),
            ),
            Prompt::Alert(message) => format!("{message}  (press any key)"),
            Prompt::Confirm(request) => {
                format!("{} [y/n]", request.challenges[0].message)
            }
            Prompt::Signature(request) => format!(
                "Customer signature captured ({} points). Accept? [y/n]",
                request.signature.total_points()
            ),
        };
        let mut stdout = std::io::stdout();
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line)
        )?;
        stdout.flush()
    }
}

fn is_yes(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y'))
}
