// Copyright (c) 2023 The Kaspa Ledger Developers

use ledger_kaspa_apdu::{
    path::PathError, status::StatusWord, ApduError, MAX_FRAMED_MESSAGE_LEN, MAX_INPUT_COUNT,
    MAX_TX_VERSION,
};
use tokio::time::error::Elapsed;

/// Ledger Kaspa API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport I/O error
    #[error("Transport error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected APDU response
    #[error("Unexpected APDU response")]
    UnexpectedResponse,

    /// Timeout waiting for user
    #[error("Timeout waiting for user interaction")]
    UserTimeout,

    /// Request timeout
    #[error("Timeout waiting for device response")]
    RequestTimeout,

    /// Device rejected the request
    #[error("Device rejected request: {0}")]
    Status(StatusWord),

    /// Device returned an unrecognised status word
    #[error("Device returned unknown status: {0:#06x}")]
    UnknownStatus(u16),

    /// APDU encoding or decoding failed
    #[error("APDU encode / decode failed: {0:?}")]
    Apdu(ApduError),

    /// Transaction version out of range
    #[error("Unsupported transaction version {0} (maximum {MAX_TX_VERSION})")]
    InvalidVersion(u16),

    /// Personal message does not fit a request frame
    #[error("Message too long ({0} bytes, maximum {MAX_FRAMED_MESSAGE_LEN})")]
    MessageTooLong(usize),

    /// Transaction has no inputs
    #[error("Transaction has no inputs")]
    NoInputs,

    /// Transaction has no outputs
    #[error("Transaction has no outputs")]
    NoOutputs,

    /// Input count does not fit the transaction header
    #[error("Too many inputs ({0})")]
    TooManyInputs(usize),

    /// Output count does not fit the transaction header
    #[error("Too many outputs ({0})")]
    TooManyOutputs(usize),

    /// Output script does not fit the length prefix
    #[error("Script public key too long ({0} bytes)")]
    ScriptTooLong(usize),

    /// Invalid derivation path
    #[error("Invalid derivation path: {0}")]
    InvalidPath(PathError),

    /// Invalid key object
    #[error("Invalid key object")]
    InvalidKey,

    /// Hash initialisation failed
    #[error("Hash initialisation failed")]
    Hash,

    /// Device reported a sighash that does not match the transaction
    #[error("Sighash mismatch for input {0}")]
    SighashMismatch(u8),

    /// Device reported a message hash that does not match the message
    #[error("Message hash mismatch")]
    MessageHashMismatch,

    /// Signature failed verification
    #[error("Invalid signature for input {0}")]
    InvalidSignature(u8),

    /// Message signature failed verification
    #[error("Invalid message signature")]
    InvalidMessageSignature,

    /// Signature for an input outside the transaction
    #[error("Unexpected input index {0}")]
    UnexpectedInputIndex(u8),

    /// Second signature for the same input
    #[error("Duplicate signature for input {0}")]
    DuplicateSignature(u8),

    /// Device signalled more signatures than declared inputs
    #[error("Device signalled more than {0} signatures (maximum {MAX_INPUT_COUNT})")]
    TooManySignatures(usize),

    /// Device finished before signing every input
    #[error("Missing signatures (expected {expected}, received {received})")]
    MissingSignatures { expected: usize, received: usize },
}

impl From<ApduError> for Error {
    fn from(e: ApduError) -> Self {
        Error::Apdu(e)
    }
}

impl From<PathError> for Error {
    fn from(e: PathError) -> Self {
        Error::InvalidPath(e)
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::RequestTimeout
    }
}

impl Error {
    /// Map a response status word to a result
    pub fn check_status(status: u16) -> Result<(), Error> {
        match StatusWord::from_u16(status) {
            Some(StatusWord::Ok) => Ok(()),
            Some(s) => Err(Error::Status(s)),
            None => Err(Error::UnknownStatus(status)),
        }
    }

    /// Fetch the device status word for rejections
    pub fn status(&self) -> Option<StatusWord> {
        match self {
            Error::Status(s) => Some(*s),
            _ => None,
        }
    }
}
