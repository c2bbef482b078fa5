// Copyright (c) 2023 The Kaspa Ledger Developers

/// Simulator errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Mnemonic parsing failed
    #[error("invalid mnemonic: {0}")]
    Mnemonic(String),

    /// BIP32 derivation failed
    #[error("key derivation failed")]
    Derivation,

    /// Approval requested with no operation pending
    #[error("no operation pending approval")]
    NotPending,

    /// Frame exceeds the maximum APDU length
    #[error("invalid frame length: {0}")]
    FrameLength(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
