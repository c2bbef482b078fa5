// Copyright (c) 2023 The Kaspa Ledger Developers

use encdec::{DecodeOwned, Encode};
use heapless::Vec;

use crate::{helpers::check_consumed, ApduError};

/// Maximum signature length (DER encoded ECDSA)
pub const MAX_SIGNATURE_LEN: usize = 72;

/// Signature hash length
pub const SIGHASH_LEN: usize = 32;

/// Signature scheme used for an input
#[derive(Copy, Clone, Debug, PartialEq, Eq, num_enum::TryFromPrimitive, strum::Display)]
#[repr(u8)]
pub enum SignatureScheme {
    /// BIP340 schnorr, 64 byte signature
    Schnorr = 0x00,
    /// ECDSA, DER encoded signature
    Ecdsa = 0x01,
}

/// Per-input transaction signature response APDU
///
/// Returned on approval of a signing exchange and on each subsequent
/// [TxNextSignatureReq](super::TxNextSignatureReq) while `HAS_MORE` is set.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   HAS_MORE    |  INPUT_INDEX  |    SCHEME     |    SIG_LEN    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                     SIGNATURE (SIG_LEN bytes)                 /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  RECOVERY_ID  |                                               |
/// +-+-+-+-+-+-+-+-+                                               +
/// /                       SIGHASH (32 bytes)                      /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxSignatureResp {
    /// More signatures are pending on the device
    pub has_more: bool,
    /// Index of the signed input within the transaction
    pub input_index: u8,
    /// Signature scheme
    pub scheme: SignatureScheme,
    /// Signature bytes
    pub signature: Vec<u8, MAX_SIGNATURE_LEN>,
    /// Recovery id / parity
    pub recovery_id: u8,
    /// Signature hash the device committed to
    pub sighash: [u8; SIGHASH_LEN],
}

impl Encode for TxSignatureResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(4 + self.signature.len() + 1 + SIGHASH_LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        let s = self.signature.len();

        buff[0] = self.has_more as u8;
        buff[1] = self.input_index;
        buff[2] = self.scheme as u8;
        buff[3] = s as u8;
        buff[4..][..s].copy_from_slice(&self.signature);
        buff[4 + s] = self.recovery_id;
        buff[5 + s..][..SIGHASH_LEN].copy_from_slice(&self.sighash);

        Ok(n)
    }
}

impl DecodeOwned for TxSignatureResp {
    type Output = Self;
    type Error = ApduError;

    /// Decode a signature response, the buffer length must match the layout exactly
    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < 4 {
            return Err(ApduError::InvalidLength);
        }

        let has_more = match buff[0] {
            0 => false,
            1 => true,
            _ => return Err(ApduError::InvalidEncoding),
        };
        let scheme =
            SignatureScheme::try_from(buff[2]).map_err(|_| ApduError::InvalidEncoding)?;

        let s = buff[3] as usize;
        if s > MAX_SIGNATURE_LEN {
            return Err(ApduError::InvalidEncoding);
        }

        let n = 4 + s + 1 + SIGHASH_LEN;
        check_consumed(n, buff)?;

        let signature = Vec::from_slice(&buff[4..][..s]).map_err(|_| ApduError::InvalidLength)?;

        let mut sighash = [0u8; SIGHASH_LEN];
        sighash.copy_from_slice(&buff[5 + s..][..SIGHASH_LEN]);

        Ok((
            Self {
                has_more,
                input_index: buff[1],
                scheme,
                signature,
                recovery_id: buff[4 + s],
                sighash,
            },
            n,
        ))
    }
}
