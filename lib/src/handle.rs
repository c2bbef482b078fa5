// Copyright (c) 2023 The Kaspa Ledger Developers

//! Handle for connected ledger devices
//!
//! This provides methods for interacting with the device
//! and is generic over [Exchange] transports

use std::{sync::Arc, time::Duration};

use encdec::{DecodeOwned, Encode};
use log::debug;
use tokio::sync::{Mutex, OwnedMutexGuard};

use ledger_kaspa_apdu::{
    app_info::{AppAndVersionReq, AppNameReq, VersionReq},
    frame::Frame,
    path::Bip32Path,
    public_key::{PublicKeyReq, PublicKeyResp},
    response::{ResponseKind, ResponseRecord},
    ApduError, ApduStatic, Continuation,
};

use crate::{
    approval::{Decoded, Finish, PendingApproval},
    message::{MessageSigning, PersonalMessage},
    transport::{encode_frame, exchange_frame, request, Exchange},
    tx::{Transaction, TxSigning},
    Error,
};

/// Handle configuration
#[derive(Clone, Debug, PartialEq)]
pub struct HandleConfig {
    /// Timeout for APDU requests
    pub request_timeout: Duration,
    /// Timeout for user approval, `None` to wait indefinitely
    pub user_timeout: Option<Duration>,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(2),
            user_timeout: None,
        }
    }
}

/// Application version
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AppVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl std::fmt::Display for AppVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Application info, from the dashboard app and version query
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub flags: Vec<u8>,
}

/// Raw frame response, for diagnostics
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub data: Vec<u8>,
}

/// Pending public key confirmation
pub type PendingPublicKey<T> = PendingApproval<T, Decoded<PublicKeyResp>>;

/// Pending transaction signature, resolving to a [SignatureStream](crate::tx::SignatureStream)
pub type PendingTransaction<T> = PendingApproval<T, TxSigning>;

/// Pending personal message signature
pub type PendingMessage<T> = PendingApproval<T, MessageSigning>;

/// Kaspa handle for a connected ledger device.
///
/// This is generic over [Exchange] types to support different
/// underlying transports
pub struct DeviceHandle<T: Exchange> {
    /// Transport, locked per exchange
    t: Arc<Mutex<T>>,
    config: HandleConfig,
}

impl<T: Exchange> Clone for DeviceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            t: self.t.clone(),
            config: self.config.clone(),
        }
    }
}

/// Create a [DeviceHandle] wrapper from a type implementing [Exchange]
impl<T: Exchange> From<T> for DeviceHandle<T> {
    fn from(t: T) -> Self {
        Self {
            t: Arc::new(Mutex::new(t)),
            config: HandleConfig::default(),
        }
    }
}

fn decode_public_key(data: &[u8]) -> Result<PublicKeyResp, Error> {
    let (r, _) = PublicKeyResp::decode_owned(data)?;
    Ok(r)
}

impl<T: Exchange> DeviceHandle<T> {
    /// Create a handle with the provided configuration
    pub fn new(t: T, config: HandleConfig) -> Self {
        Self {
            t: Arc::new(Mutex::new(t)),
            config,
        }
    }

    /// Fetch handle configuration
    pub fn config(&self) -> &HandleConfig {
        &self.config
    }

    /// Helper to issue a single frame request
    async fn request<R: ApduStatic + Encode<Error = ApduError>>(
        &self,
        req: &R,
        p1: u8,
    ) -> Result<Vec<u8>, Error> {
        let f = Frame::request(req, p1, Continuation::Last as u8)?;

        let mut t = self.t.lock().await;
        request(&mut *t, &f, self.config.request_timeout).await
    }

    /// Helper to submit a final frame and return the pending approval
    async fn submit_pending<F>(
        &self,
        mut t: OwnedMutexGuard<T>,
        f: &Frame,
        finish: F,
    ) -> Result<PendingApproval<T, F>, Error>
    where
        F: Finish<T>,
    {
        let req = encode_frame(f)?;
        tokio::time::timeout(self.config.request_timeout, t.submit(&req)).await??;

        Ok(PendingApproval::new(t, self.config.user_timeout, finish))
    }

    /// Fetch application version
    pub async fn version(&self) -> Result<AppVersion, Error> {
        debug!("Requesting app version");

        let data = self.request(&VersionReq, 0).await?;
        match ResponseRecord::decode(ResponseKind::Version, &data)? {
            ResponseRecord::Version(r) => Ok(AppVersion {
                major: r.major,
                minor: r.minor,
                patch: r.patch,
            }),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Fetch application name
    pub async fn app_name(&self) -> Result<String, Error> {
        debug!("Requesting app name");

        let data = self.request(&AppNameReq, 0).await?;
        match ResponseRecord::decode(ResponseKind::AppName, &data)? {
            ResponseRecord::AppName(r) => Ok(r.name.to_string()),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Fetch application name, version and flags from the dashboard query
    pub async fn app_and_version(&self) -> Result<AppInfo, Error> {
        debug!("Requesting app and version");

        let data = self.request(&AppAndVersionReq, 0).await?;
        match ResponseRecord::decode(ResponseKind::AppAndVersion, &data)? {
            ResponseRecord::AppAndVersion(r) => Ok(AppInfo {
                name: r.name.to_string(),
                version: r.version.to_string(),
                flags: r.flags.to_vec(),
            }),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Fetch the public key for a derivation path, without confirmation
    pub async fn public_key(&self, path: &Bip32Path) -> Result<PublicKeyResp, Error> {
        debug!("Requesting public key for {path}");

        let req = PublicKeyReq::new(path.clone(), false);
        let data = self.request(&req, req.p1()).await?;

        decode_public_key(&data)
    }

    /// Request a public key with on-device display and confirmation
    pub async fn confirm_public_key(&self, path: &Bip32Path) -> Result<PendingPublicKey<T>, Error> {
        debug!("Requesting public key confirmation for {path}");

        let req = PublicKeyReq::new(path.clone(), true);
        let f = Frame::request(&req, req.p1(), Continuation::Last as u8)?;

        let t = self.t.clone().lock_owned().await;
        self.submit_pending(t, &f, Decoded(decode_public_key)).await
    }

    /// Sign a transaction
    ///
    /// Input keys missing from the transaction are fetched first, then the
    /// transaction is sent in chunks. Returns once the final input is
    /// submitted, resolve the [PendingTransaction] to await user approval
    /// and fetch the signatures.
    pub async fn sign_transaction(&self, tx: &Transaction) -> Result<PendingTransaction<T>, Error> {
        // Resolve input keys
        let mut keys = Vec::with_capacity(tx.inputs().len());
        for i in tx.inputs() {
            let k = match i.public_key {
                Some(k) => k,
                None => self.public_key(&i.path()).await?.compressed(),
            };
            keys.push(k);
        }

        // Hold the transport for the whole exchange
        let mut t = self.t.clone().lock_owned().await;

        let mut chunker = tx.chunks();
        let mut terminal = None;

        for c in chunker.by_ref() {
            let c = c?;

            debug!("Sending {} chunk ({})", c.phase, c.continuation);

            if c.is_terminal() {
                terminal = Some(c.frame);
                break;
            }

            request(&mut *t, &c.frame, self.config.request_timeout).await?;
        }

        debug!(
            "Sent {} outputs, {} inputs",
            chunker.sent_outputs(),
            chunker.sent_inputs()
        );

        let f = terminal.ok_or(Error::UnexpectedResponse)?;

        self.submit_pending(
            t,
            &f,
            TxSigning {
                tx: tx.clone(),
                keys,
                request_timeout: self.config.request_timeout,
            },
        )
        .await
    }

    /// Sign a personal message, resolve the [PendingMessage] to await user
    /// approval and fetch the verified signature
    pub async fn sign_message(&self, message: &PersonalMessage) -> Result<PendingMessage<T>, Error> {
        let hash = message.hash()?;
        let public_key = self.public_key(&message.path()).await?.compressed();

        debug!("Signing message ({} bytes)", message.message().len());

        let f = Frame::request(&message.to_apdu(), 0, Continuation::Last as u8)?;

        let t = self.t.clone().lock_owned().await;
        self.submit_pending(t, &f, MessageSigning { hash, public_key })
            .await
    }

    /// Exchange a raw frame, returning the status and data without checks
    pub async fn exchange_raw(&self, f: &Frame) -> Result<RawResponse, Error> {
        let mut t = self.t.lock().await;
        let (status, data) = exchange_frame(&mut *t, f, self.config.request_timeout).await?;

        Ok(RawResponse { status, data })
    }
}
