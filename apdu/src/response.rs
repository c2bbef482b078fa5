// Copyright (c) 2023 The Kaspa Ledger Developers

//! Typed response decoding
//!
//! Every response has a fixed layout for its instruction, [ResponseRecord::decode]
//! rejects any length mismatch rather than truncating or zero-filling.

use encdec::{Decode, DecodeOwned};

use crate::{
    app_info::{AppAndVersionResp, AppNameResp, VersionResp},
    helpers::check_consumed,
    message::MessageSignatureResp,
    public_key::PublicKeyResp,
    tx::TxSignatureResp,
    ApduError, Instruction,
};

/// Expected response layout
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display)]
pub enum ResponseKind {
    Version,
    AppName,
    AppAndVersion,
    PublicKey,
    TxSignature,
    MessageSignature,
}

impl From<Instruction> for ResponseKind {
    fn from(ins: Instruction) -> Self {
        match ins {
            Instruction::GetVersion => ResponseKind::Version,
            Instruction::GetAppName => ResponseKind::AppName,
            Instruction::GetPublicKey => ResponseKind::PublicKey,
            Instruction::SignTx => ResponseKind::TxSignature,
            Instruction::SignMessage => ResponseKind::MessageSignature,
        }
    }
}

/// Decoded response record
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseRecord<'a> {
    Version(VersionResp),
    AppName(AppNameResp<'a>),
    AppAndVersion(AppAndVersionResp<'a>),
    PublicKey(PublicKeyResp),
    TxSignature(TxSignatureResp),
    MessageSignature(MessageSignatureResp),
}

impl<'a> ResponseRecord<'a> {
    /// Decode response data (status word removed) for the expected layout
    pub fn decode(kind: impl Into<ResponseKind>, buff: &'a [u8]) -> Result<Self, ApduError> {
        let (r, n) = match kind.into() {
            ResponseKind::Version => {
                let (v, n) = VersionResp::decode(buff)?;
                (ResponseRecord::Version(v), n)
            }
            ResponseKind::AppName => {
                let (v, n) = AppNameResp::decode(buff)?;
                (ResponseRecord::AppName(v), n)
            }
            ResponseKind::AppAndVersion => {
                let (v, n) = AppAndVersionResp::decode(buff)?;
                (ResponseRecord::AppAndVersion(v), n)
            }
            ResponseKind::PublicKey => {
                let (v, n) = PublicKeyResp::decode_owned(buff)?;
                (ResponseRecord::PublicKey(v), n)
            }
            ResponseKind::TxSignature => {
                let (v, n) = TxSignatureResp::decode_owned(buff)?;
                (ResponseRecord::TxSignature(v), n)
            }
            ResponseKind::MessageSignature => {
                let (v, n) = MessageSignatureResp::decode_owned(buff)?;
                (ResponseRecord::MessageSignature(v), n)
            }
        };

        check_consumed(n, buff)?;

        Ok(r)
    }
}
