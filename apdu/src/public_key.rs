// Copyright (c) 2023 The Kaspa Ledger Developers

//! Public key APDUs, for fetching secp256k1 keys by derivation path

use encdec::{Decode, DecodeOwned, Encode};

use super::{ApduError, ApduStatic, Instruction, KAS_APDU_CLA};
use crate::{helpers::check_consumed, path::Bip32Path};

/// Uncompressed SEC1 public key length
pub const PUBLIC_KEY_LEN: usize = 65;

/// Chain code length
pub const CHAIN_CODE_LEN: usize = 32;

/// Public key request APDU.
///
/// Requests the public key for a BIP32 path, `P1` set to 1 requests on-device
/// display and confirmation before the key is returned.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     DEPTH     |          PATH[0..DEPTH] (u32 BE)              /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct PublicKeyReq {
    /// Derivation path
    pub path: Bip32Path,
    /// Display and confirm on device (sent in `P1`)
    pub display: bool,
}

impl PublicKeyReq {
    /// Create a new [PublicKeyReq] APDU
    pub fn new(path: Bip32Path, display: bool) -> Self {
        Self { path, display }
    }

    /// `P1` value for this request
    pub fn p1(&self) -> u8 {
        self.display as u8
    }
}

impl ApduStatic for PublicKeyReq {
    const CLA: u8 = KAS_APDU_CLA;
    const INS: u8 = Instruction::GetPublicKey as u8;
}

impl Encode for PublicKeyReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        self.path.encode_len()
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        self.path.encode(buff)
    }
}

/// Public key response APDU
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  KEY_LEN (65) |  FORMAT (0x04)|                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               +
/// /                      X COORDINATE (32 bytes)                  /
/// +                               +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                      Y COORDINATE (32 bytes)                  /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  CC_LEN (32)  |                                               |
/// +-+-+-+-+-+-+-+-+                                               +
/// /                      CHAIN CODE (32 bytes)                    /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct PublicKeyResp {
    /// Uncompressed SEC1 public key (`0x04 ‖ x ‖ y`)
    pub public_key: [u8; PUBLIC_KEY_LEN],
    /// BIP32 chain code
    pub chain_code: [u8; CHAIN_CODE_LEN],
}

impl PublicKeyResp {
    /// Create a new [PublicKeyResp] APDU
    pub fn new(public_key: [u8; PUBLIC_KEY_LEN], chain_code: [u8; CHAIN_CODE_LEN]) -> Self {
        Self {
            public_key,
            chain_code,
        }
    }

    /// x coordinate, used for schnorr spend scripts
    pub fn x_only(&self) -> [u8; 32] {
        let mut x = [0u8; 32];
        x.copy_from_slice(&self.public_key[1..33]);
        x
    }

    /// SEC1 compressed key
    pub fn compressed(&self) -> [u8; 33] {
        let mut k = [0u8; 33];
        k[0] = 0x02 | (self.public_key[64] & 0x01);
        k[1..].copy_from_slice(&self.public_key[1..33]);
        k
    }
}

impl Encode for PublicKeyResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(2 + PUBLIC_KEY_LEN + CHAIN_CODE_LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = PUBLIC_KEY_LEN as u8;
        buff[1..][..PUBLIC_KEY_LEN].copy_from_slice(&self.public_key);
        buff[1 + PUBLIC_KEY_LEN] = CHAIN_CODE_LEN as u8;
        buff[2 + PUBLIC_KEY_LEN..][..CHAIN_CODE_LEN].copy_from_slice(&self.chain_code);

        Ok(n)
    }
}

impl DecodeOwned for PublicKeyResp {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let n = 2 + PUBLIC_KEY_LEN + CHAIN_CODE_LEN;
        check_consumed(n, buff)?;

        // Check length prefixes and key format
        if buff[0] as usize != PUBLIC_KEY_LEN
            || buff[1] != 0x04
            || buff[1 + PUBLIC_KEY_LEN] as usize != CHAIN_CODE_LEN
        {
            return Err(ApduError::InvalidEncoding);
        }

        let mut public_key = [0u8; PUBLIC_KEY_LEN];
        public_key.copy_from_slice(&buff[1..][..PUBLIC_KEY_LEN]);

        let mut chain_code = [0u8; CHAIN_CODE_LEN];
        chain_code.copy_from_slice(&buff[2 + PUBLIC_KEY_LEN..][..CHAIN_CODE_LEN]);

        Ok((
            Self {
                public_key,
                chain_code,
            },
            n,
        ))
    }
}

impl<'a> Decode<'a> for PublicKeyReq {
    type Output = Self;
    type Error = ApduError;

    /// Decode the request payload, `display` is carried in `P1` and must be set by the caller
    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), Self::Error> {
        let (path, n) = Bip32Path::decode_owned(buff)?;
        check_consumed(n, buff)?;

        Ok((
            Self {
                path,
                display: false,
            },
            n,
        ))
    }
}
