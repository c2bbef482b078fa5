// Copyright (c) 2023 The Kaspa Ledger Developers

use byteorder::{BigEndian, ByteOrder};
use encdec::{Decode, Encode};
use ledger_proto::ApduStatic;

use crate::{
    helpers::{dec_prefixed, enc_prefixed},
    ApduError, Instruction, KAS_APDU_CLA,
};

/// Transaction output APDU, one per [Phase::Outputs](crate::Phase::Outputs) frame
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         VALUE (u64 BE)                        |
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  SCRIPT_LEN   |            SCRIPT_PUBLIC_KEY...               /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TxOutput<'a> {
    /// Output value in sompi
    pub value: u64,
    /// Script public key, opaque to the codec
    pub script_public_key: &'a [u8],
}

impl<'a> TxOutput<'a> {
    /// Create a new [TxOutput] APDU
    pub fn new(value: u64, script_public_key: &'a [u8]) -> Self {
        Self {
            value,
            script_public_key,
        }
    }
}

impl<'a> ApduStatic for TxOutput<'a> {
    const CLA: u8 = KAS_APDU_CLA;
    const INS: u8 = Instruction::SignTx as u8;
}

impl<'a> Encode for TxOutput<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        if self.script_public_key.len() > u8::MAX as usize {
            return Err(ApduError::InvalidLength);
        }

        Ok(8 + 1 + self.script_public_key.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        BigEndian::write_u64(&mut buff[..8], self.value);
        enc_prefixed(self.script_public_key, &mut buff[8..])?;

        Ok(n)
    }
}

impl<'a> Decode<'a> for TxOutput<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < 8 {
            return Err(ApduError::InvalidLength);
        }

        let value = BigEndian::read_u64(&buff[..8]);
        let (script_public_key, n) = dec_prefixed(&buff[8..])?;

        Ok((
            Self {
                value,
                script_public_key,
            },
            8 + n,
        ))
    }
}
