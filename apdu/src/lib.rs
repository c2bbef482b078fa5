// Copyright (c) 2023 The Kaspa Ledger Developers

//! Protocol / APDU definitions for Kaspa app communication
//!
//! This module provides the wire format and reference codec for communication
//! with the Kaspa ledger application.
//!
//! Frames follow the usual ledger layout (`CLA ‖ INS ‖ P1 ‖ P2 ‖ Lc ‖ DATA`, see [frame]),
//! payloads use fixed-width fields with single-byte length prefixes for variable data.
//! All multi-byte field encodings are big-endian, matching the device firmware.
//!
//! Transaction signing is chunked across frames, with `P1` selecting the [Phase]
//! and `P2` the [Continuation], see [tx] for the record layouts.

#![no_std]

pub use ledger_proto::{ApduError, ApduStatic};

pub mod app_info;
pub mod frame;
pub mod message;
pub mod path;
pub mod prelude;
pub mod public_key;
pub mod response;
pub mod status;
pub mod tx;

mod helpers;

/// Kaspa APDU Class
pub const KAS_APDU_CLA: u8 = 0xe0;

/// Dashboard (BOLOS) APDU class, used for app and version queries
pub const BOLOS_APDU_CLA: u8 = 0xb0;

/// Dashboard get app and version instruction
pub const BOLOS_INS_GET_APP_AND_VERSION: u8 = 0x01;

/// Maximum APDU payload length (single byte `Lc`)
pub const MAX_APDU_PAYLOAD: usize = 255;

/// Maximum number of inputs supported by the device in a single transaction
pub const MAX_INPUT_COUNT: usize = 15;

/// Maximum number of outputs supported by the device (destination and optional change)
pub const MAX_OUTPUT_COUNT: usize = 2;

/// Maximum length of a personal message (single byte length prefix)
pub const MAX_MESSAGE_LEN: usize = 255;

/// Sign message request bytes ahead of the message (type, index, account, length)
pub const SIGN_MESSAGE_HEADER_LEN: usize = 1 + 4 + 4 + 1;

/// Maximum personal message length that fits a single request frame
pub const MAX_FRAMED_MESSAGE_LEN: usize = MAX_APDU_PAYLOAD - SIGN_MESSAGE_HEADER_LEN;

/// Maximum transaction version accepted for signing
pub const MAX_TX_VERSION: u16 = 1;

/// Kaspa APDU instruction codes
#[derive(Copy, Clone, Debug, PartialEq, Eq, num_enum::TryFromPrimitive, strum::Display)]
#[repr(u8)]
pub enum Instruction {
    /// Fetch application version
    GetVersion = 0x03,

    /// Fetch application name
    GetAppName = 0x04,

    /// Fetch a public key for a BIP32 path, optionally confirmed on-device
    GetPublicKey = 0x05,

    /// Chunked transaction signing
    SignTx = 0x06,

    /// Sign a personal message
    SignMessage = 0x07,
}

/// Transaction signing phase, carried in `P1`
#[derive(Copy, Clone, Debug, PartialEq, Eq, num_enum::TryFromPrimitive, strum::Display)]
#[repr(u8)]
pub enum Phase {
    /// Transaction header (version and counts)
    Start = 0x00,
    /// One serialized output per frame
    Outputs = 0x01,
    /// One serialized input per frame
    Inputs = 0x02,
    /// Fetch the next pending input signature
    NextSignature = 0x03,
}

/// Frame continuation marker, carried in `P2`
#[derive(Copy, Clone, Debug, PartialEq, Eq, num_enum::TryFromPrimitive, strum::Display)]
#[repr(u8)]
pub enum Continuation {
    /// Last frame in the exchange
    Last = 0x00,
    /// More data follows
    More = 0x80,
}
