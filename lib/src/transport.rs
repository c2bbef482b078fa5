// Copyright (c) 2023 The Kaspa Ledger Developers

//! Transport abstraction for exchanging frames with a device
//!
//! [Exchange] splits a request into `submit` and `receive` so callers can
//! issue a frame that requires user approval and resolve the answer later.

use std::{
    net::{IpAddr, Ipv4Addr},
    time::Duration,
};

use async_trait::async_trait;
use encdec::{Decode, Encode};
use log::debug;

use ledger_kaspa_apdu::{
    frame::{Frame, Response},
    status::StatusWord,
};

use crate::Error;

/// Maximum encoded frame length (header and full payload)
pub const MAX_FRAME_LEN: usize = 5 + ledger_kaspa_apdu::MAX_APDU_PAYLOAD;

/// Byte-level frame exchange with a device
#[async_trait]
pub trait Exchange: Send {
    /// Write an encoded command frame to the device
    async fn submit(&mut self, apdu: &[u8]) -> Result<(), Error>;

    /// Read a raw response (`data ‖ SW`) from the device
    async fn receive(&mut self) -> Result<Vec<u8>, Error>;

    /// Submit a command and await the response
    async fn exchange(&mut self, apdu: &[u8]) -> Result<Vec<u8>, Error> {
        self.submit(apdu).await?;
        self.receive().await
    }
}

/// Options for connecting to a TCP device (speculos APDU socket)
#[derive(Clone, Debug, PartialEq, clap::Args)]
pub struct TcpOptions {
    /// Device address
    #[clap(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub addr: IpAddr,

    /// Device APDU port
    #[clap(long, default_value_t = 9999)]
    pub port: u16,
}

impl Default for TcpOptions {
    fn default() -> Self {
        Self {
            addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 9999,
        }
    }
}

#[cfg(feature = "transport_tcp")]
pub use tcp::TcpTransport;

#[cfg(feature = "transport_tcp")]
mod tcp {
    use std::net::SocketAddr;

    use async_trait::async_trait;
    use log::{debug, trace};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
    };

    use super::{Exchange, TcpOptions, MAX_FRAME_LEN};
    use crate::Error;

    /// TCP transport using the speculos framing
    ///
    /// Requests are sent as `LEN (u32 BE) ‖ APDU`, responses arrive as
    /// `LEN (u32 BE) ‖ DATA ‖ SW` where `LEN` excludes the status word.
    pub struct TcpTransport {
        s: TcpStream,
    }

    impl TcpTransport {
        /// Connect to a TCP device
        pub async fn connect(opts: &TcpOptions) -> Result<Self, Error> {
            let addr = SocketAddr::new(opts.addr, opts.port);

            debug!("Connecting to {addr}");

            let s = TcpStream::connect(addr).await?;

            Ok(Self { s })
        }
    }

    #[async_trait]
    impl Exchange for TcpTransport {
        async fn submit(&mut self, apdu: &[u8]) -> Result<(), Error> {
            trace!("TX: {:02x?}", apdu);

            let mut buff = Vec::with_capacity(apdu.len() + 4);
            buff.extend_from_slice(&(apdu.len() as u32).to_be_bytes());
            buff.extend_from_slice(apdu);

            self.s.write_all(&buff).await?;

            Ok(())
        }

        async fn receive(&mut self) -> Result<Vec<u8>, Error> {
            let mut h = [0u8; 4];
            self.s.read_exact(&mut h).await?;

            let n = u32::from_be_bytes(h) as usize;
            if n > MAX_FRAME_LEN {
                return Err(Error::UnexpectedResponse);
            }

            // Data followed by status word
            let mut buff = vec![0u8; n + 2];
            self.s.read_exact(&mut buff).await?;

            trace!("RX: {:02x?}", buff);

            Ok(buff)
        }
    }
}

/// Encode a frame for submission
pub fn encode_frame(f: &Frame) -> Result<Vec<u8>, Error> {
    let mut buff = vec![0u8; f.encode_len()?];
    let n = f.encode(&mut buff)?;
    buff.truncate(n);
    Ok(buff)
}

/// Split a raw response into status word and data
pub fn split_response(raw: &[u8]) -> Result<(u16, Vec<u8>), Error> {
    let (r, _) = Response::decode(raw)?;
    Ok((r.status, r.data.to_vec()))
}

/// Submit a frame with a timeout, returning the raw status and data
pub async fn exchange_frame<T: Exchange + ?Sized>(
    t: &mut T,
    f: &Frame,
    timeout: Duration,
) -> Result<(u16, Vec<u8>), Error> {
    debug!(
        "Exchange INS: {:#04x} P1: {:#04x} P2: {:#04x} LC: {}",
        f.ins,
        f.p1,
        f.p2,
        f.data.len()
    );

    let req = encode_frame(f)?;
    let raw = tokio::time::timeout(timeout, t.exchange(&req)).await??;

    split_response(&raw)
}

/// Submit a frame, returning response data on success and the status
/// word as an error otherwise
pub async fn request<T: Exchange + ?Sized>(
    t: &mut T,
    f: &Frame,
    timeout: Duration,
) -> Result<Vec<u8>, Error> {
    let (status, data) = exchange_frame(t, f, timeout).await?;

    if status != StatusWord::Ok as u16 {
        debug!("Device returned status: {status:#06x}");
    }
    Error::check_status(status)?;

    Ok(data)
}
