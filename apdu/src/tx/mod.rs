// Copyright (c) 2023 The Kaspa Ledger Developers

//! Transaction related APDUs, used to sign a transaction via the hardware wallet.
//!
//! Signing is a chunked exchange under [Instruction::SignTx], with `P1` selecting the [Phase]:
//!
//! 1. [Phase::Start] carries the [TxHeader] (version, declared counts, optional change address)
//! 2. [Phase::Outputs] carries one [TxOutput] per frame
//! 3. [Phase::Inputs] carries one [TxInput] per frame, the final input is tagged [Continuation::Last]
//!    and starts on-device review
//! 4. Once approved the device returns a [TxSignatureResp], while `has_more` is set
//!    [TxNextSignatureReq] ([Phase::NextSignature]) fetches the next one
//!
//! All frames other than the final input are tagged [Continuation::More].
//!
//! [Phase]: crate::Phase
//! [Phase::Start]: crate::Phase::Start
//! [Phase::Outputs]: crate::Phase::Outputs
//! [Phase::Inputs]: crate::Phase::Inputs
//! [Phase::NextSignature]: crate::Phase::NextSignature
//! [Continuation::Last]: crate::Continuation::Last
//! [Continuation::More]: crate::Continuation::More
//! [Instruction::SignTx]: crate::Instruction::SignTx

use encdec::{Decode, Encode};
use ledger_proto::ApduStatic;

use crate::{ApduError, Instruction, KAS_APDU_CLA};

mod header;
pub use header::*;

mod output;
pub use output::*;

mod input;
pub use input::*;

mod signature;
pub use signature::*;

/// Fetch the next pending input signature (0 length APDU)
#[derive(Copy, Clone, PartialEq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxNextSignatureReq;

impl ApduStatic for TxNextSignatureReq {
    const CLA: u8 = KAS_APDU_CLA;
    const INS: u8 = Instruction::SignTx as u8;
}
