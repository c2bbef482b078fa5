// Copyright (c) 2023 The Kaspa Ledger Developers

//! Ledger Kaspa API Library (and CLI)
//!
//! [DeviceHandle] wraps an [Exchange] transport and provides app queries,
//! public key derivation, and transaction / personal message signing.
//!
//! Operations requiring on-device approval are split in two: the request
//! is submitted and a [PendingApproval] returned, which is then resolved
//! to an [Approval] once the operator accepts or rejects.

use encdec::Encode;

/// Re-export `ledger-kaspa-apdu` for consumers
pub use ledger_kaspa_apdu::{self as apdu};

pub mod transport;
pub use transport::{Exchange, TcpOptions};

#[cfg(feature = "transport_tcp")]
pub use transport::TcpTransport;

mod handle;
pub use handle::{
    AppInfo, AppVersion, DeviceHandle, HandleConfig, PendingMessage, PendingPublicKey,
    PendingTransaction, RawResponse,
};

mod error;
pub use error::Error;

pub mod approval;
pub use approval::{Approval, PendingApproval};

pub mod crypto;

pub mod message;
pub use message::{MessageSignature, PersonalMessage};

pub mod tx;
pub use tx::{InputSignature, SignatureStream, Transaction, TransactionInput, TransactionOutput};

/// TCP device handle
#[cfg(feature = "transport_tcp")]
pub type TcpHandle = DeviceHandle<TcpTransport>;

#[cfg(feature = "transport_tcp")]
impl TcpHandle {
    /// Connect to a TCP device (speculos or simulator)
    pub async fn connect(opts: &TcpOptions, config: HandleConfig) -> Result<Self, Error> {
        let t = TcpTransport::connect(opts).await?;
        Ok(DeviceHandle::new(t, config))
    }
}

/// Helper to encode a record to an owned buffer
pub(crate) fn encode_vec<E: Encode<Error = apdu::ApduError>>(e: &E) -> Result<Vec<u8>, Error> {
    let mut buff = vec![0u8; e.encode_len()?];
    let n = e.encode(&mut buff)?;
    buff.truncate(n);
    Ok(buff)
}
