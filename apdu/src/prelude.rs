// Copyright (c) 2023 The Kaspa Ledger Developers

//! Prelude to simplify downstream use of APDU objects
//!

pub use crate::{
    app_info::{
        AppAndVersionReq, AppAndVersionResp, AppNameReq, AppNameResp, VersionReq, VersionResp,
    },
    frame::{Frame, Response},
    message::{MessageSignatureResp, SignMessageReq},
    path::Bip32Path,
    public_key::{PublicKeyReq, PublicKeyResp},
    response::{ResponseKind, ResponseRecord},
    status::StatusWord,
    tx::{
        ChangeAddress, SignatureScheme, TxHeader, TxInput, TxNextSignatureReq, TxOutput,
        TxSignatureResp,
    },
    Continuation, Instruction, Phase,
};
