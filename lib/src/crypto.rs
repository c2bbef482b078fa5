// Copyright (c) 2023 The Kaspa Ledger Developers

//! Hashing and signature verification helpers

use blake2::{
    digest::{consts::U32, Mac},
    Blake2bMac,
};
use secp256k1::{ecdsa, schnorr, Message, PublicKey, Secp256k1, XOnlyPublicKey};

use ledger_kaspa_apdu::tx::{SignatureScheme, SIGHASH_LEN};

use crate::Error;

/// Key for transaction signature hashes
pub const TX_SIGNING_KEY: &[u8] = b"TransactionSigningHash";

/// Key for personal message hashes
pub const MESSAGE_SIGNING_KEY: &[u8] = b"PersonalMessageSigningHash";

/// Keyed BLAKE2b-256 hasher
pub struct Hasher(Blake2bMac<U32>);

impl Hasher {
    /// Create a new hasher with the provided key
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        let h = <Blake2bMac<U32> as Mac>::new_from_slice(key).map_err(|_| Error::Hash)?;
        Ok(Self(h))
    }

    /// Append data to the hash
    pub fn update(&mut self, d: impl AsRef<[u8]>) -> &mut Self {
        self.0.update(d.as_ref());
        self
    }

    /// Finalise, returning the digest
    pub fn finalize(self) -> [u8; SIGHASH_LEN] {
        let mut d = [0u8; SIGHASH_LEN];
        d.copy_from_slice(&self.0.finalize().into_bytes());
        d
    }
}

/// Hash a personal message for signing
pub fn message_hash(message: &[u8]) -> Result<[u8; SIGHASH_LEN], Error> {
    let mut h = Hasher::new(MESSAGE_SIGNING_KEY)?;
    h.update(message);
    Ok(h.finalize())
}

/// Fetch the x-only key from a compressed public key
pub fn x_only(compressed: &[u8; 33]) -> [u8; 32] {
    let mut x = [0u8; 32];
    x.copy_from_slice(&compressed[1..]);
    x
}

/// Verify a BIP340 signature over a digest
pub fn verify_schnorr(
    x_only: &[u8; 32],
    signature: &[u8],
    digest: &[u8; SIGHASH_LEN],
) -> Result<(), Error> {
    let secp = Secp256k1::verification_only();

    let key = XOnlyPublicKey::from_slice(x_only).map_err(|_| Error::InvalidKey)?;
    let sig = schnorr::Signature::from_slice(signature).map_err(|_| Error::InvalidKey)?;
    let msg = Message::from_digest(*digest);

    secp.verify_schnorr(&sig, &msg, &key)
        .map_err(|_| Error::InvalidKey)
}

/// Verify a DER encoded ECDSA signature over a digest
pub fn verify_ecdsa(
    compressed: &[u8; 33],
    signature: &[u8],
    digest: &[u8; SIGHASH_LEN],
) -> Result<(), Error> {
    let secp = Secp256k1::verification_only();

    let key = PublicKey::from_slice(compressed).map_err(|_| Error::InvalidKey)?;
    let sig = ecdsa::Signature::from_der(signature).map_err(|_| Error::InvalidKey)?;
    let msg = Message::from_digest(*digest);

    secp.verify_ecdsa(&msg, &sig, &key)
        .map_err(|_| Error::InvalidKey)
}

/// Verify a signature using the provided scheme
pub fn verify(
    scheme: SignatureScheme,
    compressed: &[u8; 33],
    signature: &[u8],
    digest: &[u8; SIGHASH_LEN],
) -> Result<(), Error> {
    match scheme {
        SignatureScheme::Schnorr => verify_schnorr(&x_only(compressed), signature, digest),
        SignatureScheme::Ecdsa => verify_ecdsa(compressed, signature, digest),
    }
}
