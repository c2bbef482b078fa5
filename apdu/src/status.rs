// Copyright (c) 2023 The Kaspa Ledger Developers

//! Device status words
//!
//! Every response ends with a big-endian status word, `0x9000` on success.
//! All other values are deterministic rejections and are never retried.

/// Status words returned by the Kaspa application
#[derive(Copy, Clone, Debug, PartialEq, Eq, num_enum::TryFromPrimitive, strum::Display)]
#[repr(u16)]
pub enum StatusWord {
    /// Success
    Ok = 0x9000,

    /// Operation rejected by the user
    Deny = 0x6985,

    /// Invalid `P1` or `P2` for the instruction
    WrongP1P2 = 0x6a86,

    /// Invalid payload length
    WrongDataLength = 0x6a87,

    /// Unknown instruction
    InsNotSupported = 0x6d00,

    /// Unknown instruction class
    ClaNotSupported = 0x6e00,

    /// Response would not fit the APDU buffer
    WrongResponseLength = 0xb000,

    /// Unable to display BIP32 path
    DisplayBip32PathFail = 0xb001,

    /// Unable to display address
    DisplayAddressFail = 0xb002,

    /// Unable to display amount
    DisplayAmountFail = 0xb003,

    /// Invalid transaction length
    WrongTxLength = 0xb004,

    /// Failed to parse staged transaction
    TxParsingFail = 0xb005,

    /// Failed to hash transaction
    TxHashFail = 0xb006,

    /// Instruction not valid in the current exchange state
    BadState = 0xb007,

    /// Failed to produce a signature
    SignatureFail = 0xb008,

    /// BIP32 purpose is not `44'`
    WrongBip32Purpose = 0xb009,

    /// BIP32 coin type is not `111111'`
    WrongBip32CoinType = 0xb00a,

    /// BIP32 path depth unsupported
    WrongBip32PathLen = 0xb00b,

    /// BIP32 address type is not receive (0) or change (1)
    WrongBip32Type = 0xb00c,

    /// Failed to parse personal message
    MessageParsingFail = 0xb010,

    /// Personal message exceeds the device limit
    MessageTooLong = 0xb011,

    /// Empty personal message
    MessageTooShort = 0xb012,

    /// Invalid message address type or account
    MessageAddressTypeFail = 0xb013,

    /// Invalid message address index
    MessageAddressIndexFail = 0xb014,

    /// Invalid message length prefix
    MessageLenParsingFail = 0xb015,

    /// Unexpected trailing message data
    MessageUnexpected = 0xb016,
}

impl StatusWord {
    /// Parse a raw status word, returning `None` for unknown codes
    pub fn from_u16(v: u16) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Check whether the status indicates success
    pub fn is_ok(&self) -> bool {
        *self == StatusWord::Ok
    }

    /// Check whether the status indicates a user denial
    pub fn is_denied(&self) -> bool {
        *self == StatusWord::Deny
    }

    /// Check whether the status reports a derivation path rejection
    pub fn is_path_error(&self) -> bool {
        matches!(
            self,
            StatusWord::WrongBip32Purpose
                | StatusWord::WrongBip32CoinType
                | StatusWord::WrongBip32PathLen
                | StatusWord::WrongBip32Type
        )
    }

    /// Check whether the status reports a message rejection
    pub fn is_message_error(&self) -> bool {
        (*self as u16) & 0xfff0 == 0xb010
    }
}

impl From<StatusWord> for u16 {
    fn from(s: StatusWord) -> Self {
        s as u16
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_word_codes() {
        assert_eq!(StatusWord::from_u16(0x9000), Some(StatusWord::Ok));
        assert_eq!(StatusWord::from_u16(0xb005), Some(StatusWord::TxParsingFail));
        assert_eq!(StatusWord::from_u16(0x1234), None);

        assert!(StatusWord::Deny.is_denied());
        assert!(StatusWord::WrongBip32CoinType.is_path_error());
        assert!(StatusWord::MessageTooLong.is_message_error());
        assert!(!StatusWord::TxParsingFail.is_message_error());
    }
}
