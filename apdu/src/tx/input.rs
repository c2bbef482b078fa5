// Copyright (c) 2023 The Kaspa Ledger Developers

use encdec::{Decode, Encode};
use ledger_proto::ApduStatic;

use crate::{helpers::*, ApduError, Instruction, KAS_APDU_CLA};

/// Encoded length of a [TxInput]
pub const TX_INPUT_LEN: usize = 49;

/// Transaction input APDU, one per [Phase::Inputs](crate::Phase::Inputs) frame
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         VALUE (u64 BE)                        |
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// /                   PREVIOUS_TX_ID (32 bytes)                   /
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | ADDRESS_TYPE  |            ADDRESS_INDEX (u32 BE)             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |               |             INPUT_INDEX (u32 BE)              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |               |
/// +-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxInput {
    /// Value of the spent output in sompi
    #[encdec(with = "be_u64")]
    pub value: u64,

    /// Transaction id of the spent output
    #[encdec(with = "arr")]
    pub previous_tx_id: [u8; 32],

    /// Address type (0 receive, 1 change)
    pub address_type: u8,

    /// Address index under the fixed account
    #[encdec(with = "be_u32")]
    pub address_index: u32,

    /// Output index within the previous transaction
    #[encdec(with = "be_u32")]
    pub input_index: u32,
}

impl ApduStatic for TxInput {
    const CLA: u8 = KAS_APDU_CLA;
    const INS: u8 = Instruction::SignTx as u8;
}

#[cfg(test)]
mod test {
    use rand::random;

    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn tx_input_apdu() {
        let apdu = TxInput {
            value: random(),
            previous_tx_id: random(),
            address_type: 0,
            address_index: random(),
            input_index: random(),
        };

        let mut buff = [0u8; 64];
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(n, TX_INPUT_LEN);
    }

    #[test]
    fn tx_input_layout() {
        let apdu = TxInput {
            value: 1_100_000,
            previous_tx_id: [0xaa; 32],
            address_type: 1,
            address_index: 2,
            input_index: 3,
        };

        let mut buff = [0u8; 64];
        let n = apdu.encode(&mut buff).unwrap();

        assert_eq!(&buff[..8], &[0, 0, 0, 0, 0, 0x10, 0xc8, 0xe0]);
        assert_eq!(&buff[8..40], &[0xaa; 32]);
        assert_eq!(&buff[40..n], &[1, 0, 0, 0, 2, 0, 0, 0, 3]);

        assert!(TxInput::decode(&buff[..n - 1]).is_err());
    }
}
