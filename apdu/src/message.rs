// Copyright (c) 2023 The Kaspa Ledger Developers

//! Personal message signing APDUs

use byteorder::{BigEndian, ByteOrder};
use encdec::{Decode, DecodeOwned, Encode};
use heapless::Vec;

use super::{ApduError, ApduStatic, Instruction, KAS_APDU_CLA};
use crate::{
    helpers::{check_consumed, dec_prefixed, enc_prefixed},
    tx::{MAX_SIGNATURE_LEN, SIGHASH_LEN},
    MAX_MESSAGE_LEN, SIGN_MESSAGE_HEADER_LEN,
};

/// Personal message signing request APDU, sent as a single frame with `P2` last.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | ADDRESS_TYPE  |            ADDRESS_INDEX (u32 BE)             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |               |               ACCOUNT (u32 BE)                |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |               |    MSG_LEN    |          MESSAGE...           /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SignMessageReq<'a> {
    /// Address type (0 receive, 1 change)
    pub address_type: u8,
    /// Address index
    pub address_index: u32,
    /// Hardened account index
    pub account: u32,
    /// Message bytes, at most [MAX_MESSAGE_LEN]
    pub message: &'a [u8],
}

impl<'a> ApduStatic for SignMessageReq<'a> {
    const CLA: u8 = KAS_APDU_CLA;
    const INS: u8 = Instruction::SignMessage as u8;
}

impl<'a> Encode for SignMessageReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        if self.message.len() > MAX_MESSAGE_LEN {
            return Err(ApduError::InvalidLength);
        }

        Ok(SIGN_MESSAGE_HEADER_LEN + self.message.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.address_type;
        BigEndian::write_u32(&mut buff[1..5], self.address_index);
        BigEndian::write_u32(&mut buff[5..9], self.account);
        enc_prefixed(self.message, &mut buff[9..])?;

        Ok(n)
    }
}

impl<'a> Decode<'a> for SignMessageReq<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < 9 {
            return Err(ApduError::InvalidLength);
        }

        let (message, n) = dec_prefixed(&buff[9..])?;

        Ok((
            Self {
                address_type: buff[0],
                address_index: BigEndian::read_u32(&buff[1..5]),
                account: BigEndian::read_u32(&buff[5..9]),
                message,
            },
            9 + n,
        ))
    }
}

/// Personal message signature response APDU
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    SIG_LEN    |            SIGNATURE (SIG_LEN bytes)          /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | HASH_LEN (32) |          MESSAGE_HASH (32 bytes)              /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageSignatureResp {
    /// Schnorr signature over the message hash
    pub signature: Vec<u8, MAX_SIGNATURE_LEN>,
    /// Message hash the device committed to
    pub message_hash: [u8; SIGHASH_LEN],
}

impl Encode for MessageSignatureResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(1 + self.signature.len() + 1 + SIGHASH_LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        let mut index = enc_prefixed(&self.signature, buff)?;
        index += enc_prefixed(&self.message_hash, &mut buff[index..])?;

        Ok(index)
    }
}

impl DecodeOwned for MessageSignatureResp {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let (sig, n) = dec_prefixed(buff)?;
        if sig.len() > MAX_SIGNATURE_LEN {
            return Err(ApduError::InvalidEncoding);
        }

        let (hash, m) = dec_prefixed(&buff[n..])?;
        if hash.len() != SIGHASH_LEN {
            return Err(ApduError::InvalidEncoding);
        }
        check_consumed(n + m, buff)?;

        let signature = Vec::from_slice(sig).map_err(|_| ApduError::InvalidLength)?;
        let mut message_hash = [0u8; SIGHASH_LEN];
        message_hash.copy_from_slice(hash);

        Ok((
            Self {
                signature,
                message_hash,
            },
            n + m,
        ))
    }
}

#[cfg(test)]
mod test {
    use rand::random;

    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn sign_message_req_apdu() {
        let apdu = SignMessageReq {
            address_type: 0,
            address_index: random(),
            account: 0x8000_0000,
            message: b"Hello Kaspa!",
        };

        let mut buff = [0u8; 64];
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(n, 10 + 12);
        assert_eq!(&buff[5..10], &[0x80, 0, 0, 0, 12]);
    }

    #[test]
    fn sign_message_req_too_long() {
        let message = [b'a'; MAX_MESSAGE_LEN + 1];
        let apdu = SignMessageReq {
            address_type: 0,
            address_index: 0,
            account: 0x8000_0000,
            message: &message,
        };

        assert!(apdu.encode_len().is_err());
    }

    #[test]
    fn message_signature_resp_apdu() {
        let mut signature = Vec::new();
        signature.extend_from_slice(&random::<[u8; 32]>()).unwrap();
        signature.extend_from_slice(&random::<[u8; 32]>()).unwrap();

        let apdu = MessageSignatureResp {
            signature,
            message_hash: random(),
        };

        let mut buff = [0u8; 128];
        let n = apdu.encode(&mut buff).unwrap();
        assert_eq!(n, 1 + 64 + 1 + 32);

        let (d, m) = MessageSignatureResp::decode_owned(&buff[..n]).unwrap();
        assert_eq!(d, apdu);
        assert_eq!(m, n);

        assert!(MessageSignatureResp::decode_owned(&buff[..n - 1]).is_err());
        assert!(MessageSignatureResp::decode_owned(&buff[..n + 1]).is_err());
    }
}
