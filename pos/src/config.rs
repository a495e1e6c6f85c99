//! Configuration for the point-of-sale binary.
//!
//! Values come from three places, in precedence order: CLI flags (with env
//! fallbacks), an optional JSON configuration file, and built-in defaults.
//! The configuration file may reference environment variables for secrets
//! via `$VAR` / `${VAR}` syntax.

use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use remotepay_cloud::CloudEnvironment;
use remotepay_cloud::client::UnknownEnvironment;
use remotepay_types::config::LiteralOrEnv;
use remotepay_types::util::MoneyAmount;

/// Merchant id reported in emulated sessions when none is configured.
pub const EMULATED_MERCHANT_ID: &str = "EMULATED0MRCH";
/// Access token placeholder for emulated sessions; never sent anywhere.
pub const EMULATED_ACCESS_TOKEN: &str = "emulated";
/// Device id the emulated device answers to.
pub const EMULATED_DEVICE_ID: &str = "emulated-pos-device";

/// CLI arguments for the point-of-sale terminal.
#[derive(Parser, Debug)]
#[command(name = "remotepay-pos")]
#[command(about = "Point-of-sale terminal for cloud-paired payment devices")]
pub struct CliArgs {
    /// Path to an optional JSON configuration file
    #[arg(long, short, env = "POS_CONFIG")]
    config: Option<PathBuf>,

    /// Merchant id the target device is registered under
    #[arg(long, env = "MERCHANT_ID")]
    merchant_id: Option<String>,

    /// OAuth access token for the merchant API
    #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Cloud environment: sandbox or production
    #[arg(long, env = "POS_ENVIRONMENT")]
    environment: Option<String>,

    /// Pair with the built-in emulated device instead of a cloud session
    #[arg(long)]
    emulated: bool,

    #[command(subcommand)]
    command: Command,
}

/// Subcommands of the point-of-sale terminal.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the merchant's pairable devices
    Devices,
    /// Charge a single amount and exit
    Sale {
        /// Target device id
        #[arg(long, env = "POS_DEVICE_ID")]
        device: Option<String>,
        /// Amount to charge, e.g. "12.50" or "$12.50"
        #[arg(long, value_parser = MoneyAmount::parse)]
        amount: MoneyAmount,
    },
    /// Show a message on the device display
    Message {
        /// Target device id
        #[arg(long, env = "POS_DEVICE_ID")]
        device: Option<String>,
        /// Text to display
        #[arg(long)]
        text: String,
    },
    /// Interactive numeric-keypad terminal
    Terminal {
        /// Target device id
        #[arg(long, env = "POS_DEVICE_ID")]
        device: Option<String>,
    },
}

/// Optional JSON configuration file.
///
/// Secret-bearing fields accept `$VAR` / `${VAR}` references resolved at
/// load time.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FileConfig {
    merchant_id: Option<LiteralOrEnv<String>>,
    access_token: Option<LiteralOrEnv<String>>,
    environment: Option<String>,
    device_id: Option<LiteralOrEnv<String>>,
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("Failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error(transparent)]
    Environment(#[from] UnknownEnvironment),
    #[error("Missing merchant id: pass --merchant-id or set MERCHANT_ID")]
    MissingMerchantId,
    #[error("Missing access token: pass --access-token or set ACCESS_TOKEN")]
    MissingAccessToken,
    #[error("Missing device id: pass --device or set POS_DEVICE_ID")]
    MissingDevice,
    #[error(
        "No cloud session transport is built into this binary; pass --emulated \
         to pair with the built-in device (cloud socket transports plug in via \
         the DeviceTransport seam)"
    )]
    CloudTransportUnavailable,
}

/// Merchant credentials for the cloud REST API.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub merchant_id: String,
    pub access_token: String,
}

/// Fully resolved settings for one invocation.
#[derive(Debug)]
pub struct Settings {
    pub environment: CloudEnvironment,
    pub emulated: bool,
    pub merchant_id: Option<String>,
    pub access_token: Option<String>,
    /// Device id from the config file; per-command flags take precedence.
    pub device_id: Option<String>,
    pub command: Command,
}

impl Settings {
    /// Loads settings from CLI arguments, the environment, and the optional
    /// configuration file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::resolve(CliArgs::parse())
    }

    fn resolve(args: CliArgs) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .map_err(|e| ConfigError::FileRead(path.clone(), e))?;
                serde_json::from_str::<FileConfig>(&content)?
            }
            None => FileConfig::default(),
        };

        let environment = args
            .environment
            .or(file.environment)
            .map(|s| CloudEnvironment::from_str(&s))
            .transpose()?
            .unwrap_or_default();

        Ok(Settings {
            environment,
            emulated: args.emulated,
            merchant_id: args
                .merchant_id
                .or(file.merchant_id.map(LiteralOrEnv::into_inner)),
            access_token: args
                .access_token
                .or(file.access_token.map(LiteralOrEnv::into_inner)),
            device_id: file.device_id.map(LiteralOrEnv::into_inner),
            command: args.command,
        })
    }

    /// Returns the merchant credentials, required for cloud REST calls.
    pub fn require_credentials(&self) -> Result<Credentials, ConfigError> {
        let merchant_id = self
            .merchant_id
            .clone()
            .ok_or(ConfigError::MissingMerchantId)?;
        let access_token = self
            .access_token
            .clone()
            .ok_or(ConfigError::MissingAccessToken)?;
        Ok(Credentials {
            merchant_id,
            access_token,
        })
    }

    /// Resolves the device id for a session command. Emulated sessions fall
    /// back to the built-in device id.
    pub fn device_for(&self, per_command: Option<String>) -> Result<String, ConfigError> {
        per_command
            .or_else(|| self.device_id.clone())
            .or_else(|| self.emulated.then(|| EMULATED_DEVICE_ID.to_string()))
            .ok_or(ConfigError::MissingDevice)
    }

    /// Credentials for a session. Emulated sessions run with placeholders
    /// when nothing is configured; cloud sessions require the real thing.
    pub fn session_credentials(&self) -> Result<Credentials, ConfigError> {
        if self.emulated {
            Ok(Credentials {
                merchant_id: self
                    .merchant_id
                    .clone()
                    .unwrap_or_else(|| EMULATED_MERCHANT_ID.to_string()),
                access_token: self
                    .access_token
                    .clone()
                    .unwrap_or_else(|| EMULATED_ACCESS_TOKEN.to_string()),
            })
        } else {
            self.require_credentials()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_defaults_to_sandbox() {
        let args = CliArgs::parse_from(["remotepay-pos", "--emulated", "terminal"]);
        let settings = Settings::resolve(args).unwrap();
        assert_eq!(settings.environment, CloudEnvironment::Sandbox);
        assert!(settings.emulated);
    }

    #[test]
    fn test_environment_flag_wins() {
        let args = CliArgs::parse_from([
            "remotepay-pos",
            "--environment",
            "production",
            "--emulated",
            "terminal",
        ]);
        let settings = Settings::resolve(args).unwrap();
        assert_eq!(settings.environment, CloudEnvironment::Production);
    }

    #[test]
    fn test_bad_environment_is_an_error() {
        let args = CliArgs::parse_from([
            "remotepay-pos",
            "--environment",
            "staging",
            "devices",
        ]);
        assert!(Settings::resolve(args).is_err());
    }

    #[test]
    fn test_missing_credentials_reported_per_field() {
        let args = CliArgs::parse_from(["remotepay-pos", "devices"]);
        let settings = Settings::resolve(args).unwrap();
        assert!(matches!(
            settings.require_credentials(),
            Err(ConfigError::MissingMerchantId)
        ));

        let args = CliArgs::parse_from([
            "remotepay-pos",
            "--merchant-id",
            "6QDCVBB8T1AJ1",
            "devices",
        ]);
        let settings = Settings::resolve(args).unwrap();
        assert!(matches!(
            settings.require_credentials(),
            Err(ConfigError::MissingAccessToken)
        ));
    }

    #[test]
    fn test_emulated_session_falls_back_to_placeholders() {
        let args = CliArgs::parse_from(["remotepay-pos", "--emulated", "terminal"]);
        let settings = Settings::resolve(args).unwrap();
        let credentials = settings.session_credentials().unwrap();
        assert_eq!(credentials.merchant_id, EMULATED_MERCHANT_ID);
        assert_eq!(
            settings.device_for(None).unwrap(),
            EMULATED_DEVICE_ID
        );
    }

    #[test]
    fn test_sale_amount_parsing() {
        let args = CliArgs::parse_from([
            "remotepay-pos",
            "--emulated",
            "sale",
            "--amount",
            "$12.50",
        ]);
        match args.command {
            Command::Sale { amount, .. } => {
                assert_eq!(amount.to_cents().unwrap().value(), 1250);
            }
            other => panic!("expected sale, got {other:?}"),
        }
    }
}
