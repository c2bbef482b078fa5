// Copyright (c) 2023 The Kaspa Ledger Developers

//! Command line utility for interacting with the Ledger Kaspa App

use std::{path::Path, str::FromStr, time::Duration};

use clap::Parser;
use log::{debug, info, warn, LevelFilter};
use serde::{de::DeserializeOwned, Serialize};

use ledger_kaspa::{
    apdu::path::{Bip32Path, ADDRESS_TYPE_RECEIVE},
    Approval, DeviceHandle, Exchange, HandleConfig, PersonalMessage, TcpOptions, TcpTransport,
    Transaction,
};

mod helpers;
use helpers::*;

/// Ledger command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    #[clap(flatten)]
    tcp: TcpOptions,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Timeout for user approval in seconds (waits indefinitely if unset)
    #[clap(long)]
    user_timeout_s: Option<u64>,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Parser, strum::Display)]
#[strum(serialize_all = "kebab-case")]
#[non_exhaustive]
enum Actions {
    /// Fetch application version
    Version,

    /// Fetch application name
    AppName,

    /// Fetch application name, version and flags
    AppInfo,

    /// Fetch the public key for a derivation path
    PublicKey {
        /// BIP32 derivation path
        #[clap(long, default_value = "m/44'/111111'/0'/0/0")]
        path: String,

        /// Display and confirm on device
        #[clap(long)]
        display: bool,
    },

    /// Sign a personal message
    SignMessage {
        /// Message to sign
        message: String,

        /// Address type (0 receive, 1 change)
        #[clap(long, default_value_t = ADDRESS_TYPE_RECEIVE)]
        address_type: u8,

        /// Address index
        #[clap(long, default_value_t = 0)]
        address_index: u32,
    },

    /// Sign a transaction from a JSON file
    SignTx {
        /// Unsigned transaction file
        #[clap(long)]
        input: String,

        /// Signature output file
        #[clap(long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())?;

    debug!("Connecting to {}:{}", args.tcp.addr, args.tcp.port);

    let config = HandleConfig {
        user_timeout: args.user_timeout_s.map(Duration::from_secs),
        ..Default::default()
    };

    // Connect to device
    let t = TcpTransport::connect(&args.tcp).await?;
    let d = DeviceHandle::new(t, config);

    // Execute command
    execute(d, args.cmd).await?;

    Ok(())
}

/// Execute a command with the provided transport
async fn execute<T: Exchange>(d: DeviceHandle<T>, cmd: Actions) -> anyhow::Result<()> {
    debug!("Executing command: {cmd} ({cmd:?})");

    match cmd {
        Actions::Version => {
            let v = d.version().await?;
            info!("app version: {v}");
        }
        Actions::AppName => {
            let n = d.app_name().await?;
            info!("app name: {n}");
        }
        Actions::AppInfo => {
            let i = d.app_and_version().await?;
            info!("app info: {:#?}", i);
        }
        Actions::PublicKey { path, display } => {
            let path = Bip32Path::from_str(&path)
                .map_err(|e| anyhow::anyhow!("invalid derivation path '{path}': {e}"))?;

            info!("requesting public key for {path}");

            let r = match display {
                false => d.public_key(&path).await?,
                true => {
                    info!("confirm the address on the device");

                    match d.confirm_public_key(&path).await?.resolve().await? {
                        Approval::Approved(r) => r,
                        Approval::Denied => return Err(anyhow::anyhow!("public key denied")),
                    }
                }
            };

            info!("public key: {}", hex::encode(r.public_key));
            info!("chain code: {}", hex::encode(r.chain_code));
        }
        Actions::SignMessage {
            message,
            address_type,
            address_index,
        } => {
            let m = PersonalMessage::new(message, address_type, address_index)?;

            info!("signing message with {}", m.path());

            let pending = d.sign_message(&m).await?;

            info!("confirm the message on the device");

            match pending.resolve().await? {
                Approval::Approved(s) => {
                    info!("message hash: {}", hex::encode(s.message_hash));
                    info!("signature: {}", hex::encode(s.signature));
                }
                Approval::Denied => warn!("message signing denied"),
            }
        }
        Actions::SignTx { input, output } => {
            // Read in transaction file
            let f: TxFile = read_input(&input).await?;
            let tx = Transaction::try_from(f)?;

            info!(
                "signing transaction ({} inputs, {} outputs)",
                tx.inputs().len(),
                tx.outputs().len()
            );

            let pending = d.sign_transaction(&tx).await?;

            info!("confirm the transaction on the device");

            let stream = match pending.resolve().await? {
                Approval::Approved(s) => s,
                Approval::Denied => {
                    warn!("transaction signing denied");
                    return Ok(());
                }
            };

            let signatures = stream.collect().await?;
            for s in &signatures {
                info!(
                    "input {}: {} {}",
                    s.input_index,
                    s.scheme,
                    hex::encode(&s.signature)
                );
            }

            // Write output file
            if let Some(o) = output {
                let v: Vec<SignatureFile> = signatures.iter().map(SignatureFile::from).collect();
                write_output(&o, &v).await?;
            }
        }
    }

    Ok(())
}

/// Helper to read input files where required
async fn read_input<T: DeserializeOwned>(file_name: &str) -> anyhow::Result<T> {
    debug!("Reading input from '{}'", file_name);

    let s = tokio::fs::read_to_string(file_name).await?;

    // Determine format from file name
    let p = Path::new(file_name);

    // Decode based on input extension
    let v = match p.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&s)?,
        _ => return Err(anyhow::anyhow!("unsupported input file format")),
    };

    Ok(v)
}

/// Helper to write output files if `--output` argument is provided
async fn write_output(file_name: &str, value: &impl Serialize) -> anyhow::Result<()> {
    debug!("Writing output to '{}'", file_name);

    // Determine format from file name
    let p = Path::new(file_name);
    match p.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            let s = serde_json::to_string_pretty(value)?;
            tokio::fs::write(p, s).await?;
        }
        _ => return Err(anyhow::anyhow!("unsupported output file format")),
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn command_names() {
        assert_eq!(Actions::AppInfo.to_string(), "app-info");
        assert_eq!(
            Actions::SignTx {
                input: "tx.json".to_string(),
                output: None
            }
            .to_string(),
            "sign-tx"
        );
    }
}
