// Copyright (c) 2023 The Kaspa Ledger Developers

//! Personal message signing

use encdec::{Decode, DecodeOwned};
use log::warn;
use tokio::sync::OwnedMutexGuard;

use ledger_kaspa_apdu::{
    message::{MessageSignatureResp, SignMessageReq},
    path::{Bip32Path, DEFAULT_ACCOUNT},
    tx::SIGHASH_LEN,
    ApduError, MAX_FRAMED_MESSAGE_LEN,
};

use crate::{
    approval::Finish,
    crypto::{self, message_hash},
    encode_vec,
    transport::Exchange,
    Error,
};

/// Personal message for signing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersonalMessage {
    message: String,
    pub address_type: u8,
    pub address_index: u32,
    pub account: u32,
}

impl PersonalMessage {
    /// Create a new message for the provided address, using the default account
    ///
    /// Messages are sent in a single frame, so are limited to
    /// [MAX_FRAMED_MESSAGE_LEN] bytes
    pub fn new(
        message: impl Into<String>,
        address_type: u8,
        address_index: u32,
    ) -> Result<Self, Error> {
        let message = message.into();
        if message.len() > MAX_FRAMED_MESSAGE_LEN {
            return Err(Error::MessageTooLong(message.len()));
        }

        Ok(Self {
            message,
            address_type,
            address_index,
            account: DEFAULT_ACCOUNT,
        })
    }

    /// Sign with a different (hardened) account
    pub fn with_account(mut self, account: u32) -> Self {
        self.account = account;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Derivation path of the signing key
    pub fn path(&self) -> Bip32Path {
        Bip32Path::address(self.account, self.address_type, self.address_index)
    }

    /// Hash committed to by the signature
    pub fn hash(&self) -> Result<[u8; SIGHASH_LEN], Error> {
        message_hash(self.message.as_bytes())
    }

    pub fn to_apdu(&self) -> SignMessageReq<'_> {
        SignMessageReq {
            address_type: self.address_type,
            address_index: self.address_index,
            account: self.account,
            message: self.message.as_bytes(),
        }
    }

    /// Serialize the signing payload
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        encode_vec(&self.to_apdu())
    }

    /// Deserialize a signing payload
    pub fn deserialize(buff: &[u8]) -> Result<Self, Error> {
        let (r, n) = SignMessageReq::decode(buff)?;
        if n != buff.len() {
            return Err(ApduError::InvalidLength.into());
        }

        let message = core::str::from_utf8(r.message).map_err(|_| ApduError::InvalidEncoding)?;

        Ok(Self::new(message, r.address_type, r.address_index)?.with_account(r.account))
    }
}

/// Verified personal message signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageSignature {
    /// 64 byte schnorr signature
    pub signature: Vec<u8>,
    /// Message hash
    pub message_hash: [u8; SIGHASH_LEN],
}

/// Finish a message signing request, checking the hash and signature
pub struct MessageSigning {
    pub(crate) hash: [u8; SIGHASH_LEN],
    pub(crate) public_key: [u8; 33],
}

impl<T: Exchange> Finish<T> for MessageSigning {
    type Output = MessageSignature;

    fn finish(self, _t: OwnedMutexGuard<T>, data: Vec<u8>) -> Result<MessageSignature, Error> {
        let (r, _) = MessageSignatureResp::decode_owned(&data)?;

        if r.message_hash != self.hash {
            warn!(
                "Message hash mismatch (expected: {}, device: {})",
                hex::encode(self.hash),
                hex::encode(r.message_hash)
            );
            return Err(Error::MessageHashMismatch);
        }

        crypto::verify_schnorr(&crypto::x_only(&self.public_key), &r.signature, &self.hash)
            .map_err(|_| Error::InvalidMessageSignature)?;

        Ok(MessageSignature {
            signature: r.signature.to_vec(),
            message_hash: r.message_hash,
        })
    }
}
