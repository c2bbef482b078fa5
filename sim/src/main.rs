// Copyright (c) 2023 The Kaspa Ledger Developers

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;
use log::{info, warn, LevelFilter};
use tokio::net::TcpListener;

use ledger_kaspa_sim::*;

/// Kaspa device simulator
///
/// Serves the Kaspa APDU protocol over TCP using the speculos framing,
/// so the CLI and test runner can be pointed at it in place of a device.
#[derive(Clone, Debug, PartialEq, Parser)]
pub struct Args {
    /// BIP39 mnemonic for key derivation
    #[clap(long, env = "KASPA_SIM_MNEMONIC", default_value = DEFAULT_MNEMONIC)]
    mnemonic: String,

    /// Listen address
    #[clap(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    addr: IpAddr,

    /// APDU port
    #[clap(long, default_value_t = 9999)]
    port: u16,

    /// Handling of operations requiring user approval
    #[clap(long, value_enum, default_value_t = ApprovalPolicy::Approve)]
    policy: ApprovalPolicy,

    /// Order in which transaction signatures are returned
    #[clap(long, value_enum, default_value_t = SignatureOrder::Declared)]
    order: SignatureOrder,

    /// Maximum personal message length displayed by the device
    #[clap(long, default_value_t = 200)]
    message_limit: usize,

    /// Log level
    #[clap(long, default_value = "debug")]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging
    let _ = simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default());

    if args.policy == ApprovalPolicy::Manual {
        warn!("Manual approval has no operator over TCP, pending requests will not complete");
    }

    let config = EngineConfig {
        message_limit: args.message_limit,
        order: args.order,
        ..Default::default()
    };

    info!(
        "Starting {} {} simulator (policy: {}, order: {})",
        config.name,
        config.version_string(),
        args.policy,
        args.order
    );

    let device = SimDevice::from_mnemonic(&args.mnemonic, config, args.policy)?;

    // Bind and serve APDU connections
    let listener = TcpListener::bind(SocketAddr::new(args.addr, args.port)).await?;

    serve(device, listener).await?;

    Ok(())
}
