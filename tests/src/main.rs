// Copyright (c) 2023 The Kaspa Ledger Developers

use clap::{Parser, Subcommand};
use log::{debug, info, LevelFilter};
use strum::Display;

use ledger_kaspa::{Exchange, TcpOptions, TcpTransport};

/// Test CLI arguments
#[derive(Clone, Debug, Parser)]
pub struct Opts {
    #[clap(subcommand)]
    pub test: Tests,

    /// TCP target (speculos or simulator, with automatic approval)
    #[clap(flatten)]
    pub target: TcpOptions,

    /// Log level
    #[clap(long, default_value = "debug", env)]
    pub log_level: LevelFilter,

    /// Enable logging for transports
    #[clap(long)]
    pub log_transports: bool,
}

/// Test modes
#[derive(Clone, PartialEq, Debug, Subcommand, Display)]
pub enum Tests {
    /// Test application info queries
    AppInfo,
    /// Test public key derivation
    PublicKeys {
        /// Number of addresses to derive
        #[clap(long, default_value = "4")]
        n: u32,
    },
    /// Test transaction signing
    Tx {
        /// Number of inputs to sign
        #[clap(long, default_value = "3")]
        inputs: usize,

        /// Return change to this change address index
        #[clap(long)]
        change: Option<u32>,
    },
    /// Test personal message signing
    Message {
        /// Message to sign
        #[clap(long, default_value = "Hello Kaspa!")]
        message: String,

        /// Receive address index
        #[clap(long, default_value = "0")]
        index: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load command line options
    let opts = Opts::parse();

    // Setup logging
    let mut c = simplelog::ConfigBuilder::new();
    if !opts.log_transports {
        c.add_filter_ignore_str("ledger_kaspa::transport");
    }

    let _ = simplelog::SimpleLogger::init(opts.log_level, c.build());

    debug!("options: {:?}", opts);

    info!(
        "Running test '{}' via {}:{}",
        opts.test, opts.target.addr, opts.target.port
    );

    // Connect to target and execute test
    let t = TcpTransport::connect(&opts.target).await?;

    execute(t, opts.test).await?;

    info!("Test OK!");

    Ok(())
}

/// Execute a test with the provided transport
async fn execute<T: Exchange>(t: T, test: Tests) -> anyhow::Result<()> {
    use ledger_kaspa_tests::*;

    match test {
        Tests::AppInfo => app::test(t).await?,
        Tests::PublicKeys { n } => public_key::test(t, || async {}, n).await?,
        Tests::Tx { inputs, change } => {
            transaction::test(t, || async {}, inputs, change).await?;
        }
        Tests::Message { message, index } => {
            message::test(t, || async {}, &message, index).await?;
        }
    }

    Ok(())
}
