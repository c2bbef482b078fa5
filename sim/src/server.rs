// Copyright (c) 2023 The Kaspa Ledger Developers

//! TCP APDU server, using the speculos framing
//!
//! Requests arrive as `LEN (u32 BE) ‖ APDU`, responses are returned as
//! `LEN (u32 BE) ‖ DATA ‖ SW` where `LEN` excludes the status word.

use log::{debug, info, trace};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use ledger_kaspa_apdu::{frame::FRAME_HEADER_LEN, MAX_APDU_PAYLOAD};

use crate::{Driver, Error, SimDevice};

/// Serve APDU connections for a [SimDevice]
pub async fn serve<DRV>(device: SimDevice<DRV>, listener: TcpListener) -> Result<(), Error>
where
    DRV: Driver + Send + 'static,
{
    info!("Listening on {}", listener.local_addr()?);

    loop {
        let (s, addr) = listener.accept().await?;

        debug!("Accepted connection from {addr}");

        let d = device.clone();
        tokio::spawn(async move {
            match handle_connection(d, s).await {
                Ok(()) => debug!("Connection from {addr} closed"),
                Err(e) => debug!("Connection from {addr} failed: {e}"),
            }
        });
    }
}

async fn handle_connection<DRV: Driver>(d: SimDevice<DRV>, mut s: TcpStream) -> Result<(), Error> {
    loop {
        let mut h = [0u8; 4];
        match s.read_exact(&mut h).await {
            Ok(_) => (),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        let n = u32::from_be_bytes(h) as usize;
        if n > FRAME_HEADER_LEN + MAX_APDU_PAYLOAD {
            return Err(Error::FrameLength(n));
        }

        let mut apdu = vec![0u8; n];
        s.read_exact(&mut apdu).await?;

        trace!("RX: {:02x?}", apdu);

        let r = d.exchange(&apdu).await;

        let mut buff = Vec::with_capacity(r.len() + 4);
        buff.extend_from_slice(&(r.len().saturating_sub(2) as u32).to_be_bytes());
        buff.extend_from_slice(&r);

        trace!("TX: {:02x?}", buff);

        s.write_all(&buff).await?;
    }
}
