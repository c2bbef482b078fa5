// Copyright (c) 2023 The Kaspa Ledger Developers

use byteorder::{BigEndian, ByteOrder};
use encdec::{Decode, Encode};
use ledger_proto::ApduStatic;

use crate::{ApduError, Instruction, KAS_APDU_CLA};

/// Change address, identifies the output returning funds to the signer
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChangeAddress {
    /// Address type (0 receive, 1 change)
    pub address_type: u8,
    /// Address index
    pub address_index: u32,
}

/// Transaction header APDU, sent alone as the first frame of a signing exchange
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |        VERSION (u16 BE)       |  NUM_OUTPUTS  |   NUM_INPUTS  |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | CHANGE_TYPE*  |             CHANGE_INDEX* (u32 BE)            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |               |
/// +-+-+-+-+-+-+-+-+
/// ```
///
/// `*` change fields are only present when a change address is declared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxHeader {
    /// Transaction version
    pub version: u16,
    /// Declared output count
    pub num_outputs: u8,
    /// Declared input count
    pub num_inputs: u8,
    /// Optional change address
    pub change: Option<ChangeAddress>,
}

/// Header length without change address
pub const TX_HEADER_LEN: usize = 4;

/// Header length with change address
pub const TX_HEADER_CHANGE_LEN: usize = 9;

impl TxHeader {
    /// Create a new [TxHeader] APDU
    pub fn new(version: u16, num_outputs: u8, num_inputs: u8) -> Self {
        Self {
            version,
            num_outputs,
            num_inputs,
            change: None,
        }
    }

    /// Declare a change address
    pub fn with_change(mut self, address_type: u8, address_index: u32) -> Self {
        self.change = Some(ChangeAddress {
            address_type,
            address_index,
        });
        self
    }
}

impl ApduStatic for TxHeader {
    const CLA: u8 = KAS_APDU_CLA;
    const INS: u8 = Instruction::SignTx as u8;
}

impl Encode for TxHeader {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        match self.change {
            Some(_) => Ok(TX_HEADER_CHANGE_LEN),
            None => Ok(TX_HEADER_LEN),
        }
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        BigEndian::write_u16(&mut buff[0..2], self.version);
        buff[2] = self.num_outputs;
        buff[3] = self.num_inputs;

        if let Some(c) = &self.change {
            buff[4] = c.address_type;
            BigEndian::write_u32(&mut buff[5..9], c.address_index);
        }

        Ok(n)
    }
}

impl<'a> Decode<'a> for TxHeader {
    type Output = Self;
    type Error = ApduError;

    /// Decode a header frame, which must contain only the header
    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), Self::Error> {
        let change = match buff.len() {
            TX_HEADER_LEN => None,
            TX_HEADER_CHANGE_LEN => Some(ChangeAddress {
                address_type: buff[4],
                address_index: BigEndian::read_u32(&buff[5..9]),
            }),
            _ => {
                #[cfg(feature = "log")]
                log::debug!("invalid tx header length: {}", buff.len());

                return Err(ApduError::InvalidLength);
            }
        };

        Ok((
            Self {
                version: BigEndian::read_u16(&buff[0..2]),
                num_outputs: buff[2],
                num_inputs: buff[3],
                change,
            },
            buff.len(),
        ))
    }
}

#[cfg(test)]
mod test {
    use rand::random;

    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn tx_header_apdu() {
        let apdu = TxHeader::new(0, 2, random());

        let mut buff = [0u8; 16];
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(n, TX_HEADER_LEN);
    }

    #[test]
    fn tx_header_change_apdu() {
        let apdu = TxHeader::new(1, 2, 1).with_change(1, 0x0102_0304);

        let mut buff = [0u8; 16];
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(&buff[..n], &[0, 1, 2, 1, 1, 1, 2, 3, 4]);
    }

    #[test]
    fn tx_header_layout() {
        let (h, _) = TxHeader::decode(&[0x00, 0x00, 0x03, 0x01]).unwrap();
        assert_eq!(h, TxHeader::new(0, 3, 1));

        // Neither bare nor change header
        assert!(TxHeader::decode(&[0x00, 0x00, 0x01]).is_err());
        assert!(TxHeader::decode(&[0x00, 0x00, 0x01, 0x01, 0x00]).is_err());
    }
}
