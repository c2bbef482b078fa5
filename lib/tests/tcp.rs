use std::{net::Ipv4Addr, time::Duration};

use log::debug;
use portpicker::pick_unused_port;
use tokio::net::TcpListener;

use ledger_kaspa::{TcpOptions, TcpTransport};
use ledger_kaspa_sim::*;
use ledger_kaspa_tests::{app, message, transaction};

mod helpers;

// Serve an automatically approving simulator on a free port
async fn setup_tcp() -> anyhow::Result<TcpOptions> {
    helpers::setup_logging();

    let port = pick_unused_port().unwrap();
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await?;

    let d = SimDevice::from_mnemonic(
        DEFAULT_MNEMONIC,
        EngineConfig::default(),
        ApprovalPolicy::Approve,
    )?;

    debug!("Serving simulator on port {port}");
    tokio::spawn(serve(d, listener));

    Ok(TcpOptions {
        addr: Ipv4Addr::LOCALHOST.into(),
        port,
    })
}

async fn connect(opts: &TcpOptions) -> anyhow::Result<TcpTransport> {
    // Listener is bound before spawning, a single attempt is sufficient
    let t = tokio::time::timeout(Duration::from_secs(2), TcpTransport::connect(opts)).await??;
    Ok(t)
}

#[tokio::test(flavor = "multi_thread")]
async fn kas_tcp_app_info() -> anyhow::Result<()> {
    let opts = setup_tcp().await?;

    app::test(connect(&opts).await?).await
}

#[tokio::test(flavor = "multi_thread")]
async fn kas_tcp_tx() -> anyhow::Result<()> {
    let opts = setup_tcp().await?;

    transaction::test(connect(&opts).await?, || async {}, 3, Some(0)).await?;

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn kas_tcp_message() -> anyhow::Result<()> {
    let opts = setup_tcp().await?;

    message::test(connect(&opts).await?, || async {}, "Hello Kaspa!", 0).await?;

    // Connections share the device
    message::test(connect(&opts).await?, || async {}, "Hello again", 1).await?;

    Ok(())
}
