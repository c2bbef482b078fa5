// Copyright (c) 2023 The Kaspa Ledger Developers

//! The [Engine] implements the device side of the Kaspa APDU protocol.
//!
//! Raw command frames are passed to [Engine::update], returning response
//! data, or [Output::Pending] where the operation awaits user approval.
//! Pending operations are then resolved with [Engine::approve] or
//! [Engine::deny]. Rejections are returned as [StatusWord]s.

use std::collections::VecDeque;

use encdec::{DecodeOwned, Encode};
use log::{debug, warn};
use secp256k1::{All, Keypair, Message, PublicKey, Secp256k1};
use strum::Display;

use ledger_kaspa_apdu::{
    path::DEFAULT_ACCOUNT, prelude::*, tx::SIGHASH_LEN, ApduError, BOLOS_APDU_CLA,
    BOLOS_INS_GET_APP_AND_VERSION, KAS_APDU_CLA,
};

use crate::{DerivedKey, Driver};

mod config;
pub use config::{EngineConfig, SignatureOrder};

mod message;
use message::{check_path, parse_message};

mod tx;
use tx::StagedTx;

pub mod sighash;
use sighash::{message_hash, p2pk_script, tx_sighash};

/// Dashboard flags reported with the app and version
const APP_FLAGS: [u8; 1] = [0x00];

/// Engine internal state enumeration
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
pub enum State {
    /// Idle, no exchange running
    Init,
    /// Loading transaction outputs and inputs
    Staging,
    /// Public key display pending approval
    PublicKeyPending,
    /// Transaction pending approval
    TxPending,
    /// Personal message pending approval
    MessagePending,
    /// Returning per-input signatures
    Signing,
}

/// [`Engine`] outputs, in response to command frames
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Output {
    /// Response data, returned with [StatusWord::Ok]
    Data(Vec<u8>),
    /// Operation pending user approval
    Pending,
}

/// [Engine] provides hardware-independent support for Kaspa wallet operations
pub struct Engine<DRV: Driver> {
    state: State,
    config: EngineConfig,

    tx: Option<StagedTx>,
    path: Option<Bip32Path>,
    message_hash: [u8; SIGHASH_LEN],
    signatures: VecDeque<TxSignatureResp>,

    secp: Secp256k1<All>,
    drv: DRV,
}

/// Encode a response record
fn encode<E: Encode<Error = ApduError>>(e: &E) -> Result<Vec<u8>, StatusWord> {
    let n = e
        .encode_len()
        .map_err(|_| StatusWord::WrongResponseLength)?;

    let mut buff = vec![0u8; n];
    let n = e
        .encode(&mut buff)
        .map_err(|_| StatusWord::WrongResponseLength)?;
    buff.truncate(n);

    Ok(buff)
}

impl<DRV: Driver> Engine<DRV> {
    /// Create a new engine instance with the provided driver
    pub fn new(drv: DRV, config: EngineConfig) -> Self {
        Self {
            state: State::Init,
            config,
            tx: None,
            path: None,
            message_hash: [0u8; SIGHASH_LEN],
            signatures: VecDeque::new(),
            secp: Secp256k1::new(),
            drv,
        }
    }

    /// Fetch engine state
    pub fn state(&self) -> State {
        self.state
    }

    /// Fetch engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Check whether an operation is awaiting approval
    pub fn is_pending(&self) -> bool {
        matches!(
            self.state,
            State::PublicKeyPending | State::TxPending | State::MessagePending
        )
    }

    /// Reset exchange state
    pub fn reset(&mut self) {
        self.state = State::Init;
        self.tx = None;
        self.path = None;
        self.message_hash = [0u8; SIGHASH_LEN];
        self.signatures.clear();
    }

    /// Handle an incoming command frame
    pub fn update(&mut self, apdu: &[u8]) -> Result<Output, StatusWord> {
        let (f, _) = Frame::decode_owned(apdu).map_err(|_| StatusWord::WrongDataLength)?;

        debug!(
            "command cla: {:#04x} ins: {:#04x} p1: {:#04x} p2: {:#04x} lc: {} (state: {})",
            f.cla,
            f.ins,
            f.p1,
            f.p2,
            f.data.len(),
            self.state
        );

        match f.cla {
            KAS_APDU_CLA => (),
            BOLOS_APDU_CLA if f.ins == BOLOS_INS_GET_APP_AND_VERSION => {
                let version = self.config.version_string();
                let r = AppAndVersionResp::new(&self.config.name, &version, &APP_FLAGS);
                return encode(&r).map(Output::Data);
            }
            BOLOS_APDU_CLA => return Err(StatusWord::InsNotSupported),
            _ => return Err(StatusWord::ClaNotSupported),
        }

        let ins = Instruction::try_from(f.ins).map_err(|_| StatusWord::InsNotSupported)?;

        match ins {
            Instruction::GetVersion | Instruction::GetAppName if f.p1 != 0 || f.p2 != 0 => {
                Err(StatusWord::WrongP1P2)
            }
            Instruction::GetVersion => {
                let [major, minor, patch] = self.config.version;
                encode(&VersionResp::new(major, minor, patch)).map(Output::Data)
            }
            Instruction::GetAppName => {
                encode(&AppNameResp {
                    name: &self.config.name,
                })
                .map(Output::Data)
            }
            Instruction::GetPublicKey => self.get_public_key(&f),
            Instruction::SignTx => self.sign_tx(&f),
            Instruction::SignMessage => self.sign_message(&f),
        }
    }

    /// Approve the pending operation, returning the response data
    pub fn approve(&mut self) -> Result<Vec<u8>, StatusWord> {
        debug!("approve (state: {})", self.state);

        let r = match self.state {
            State::PublicKeyPending => self.approve_public_key(),
            State::MessagePending => self.approve_message(),
            State::TxPending => return self.approve_tx(),
            _ => return Err(StatusWord::BadState),
        };

        self.reset();
        r
    }

    /// Reject the pending operation
    pub fn deny(&mut self) -> Result<(), StatusWord> {
        debug!("deny (state: {})", self.state);

        if !self.is_pending() {
            return Err(StatusWord::BadState);
        }

        self.reset();
        Ok(())
    }

    fn derive(&self, path: &[u32]) -> Result<DerivedKey, StatusWord> {
        self.drv.bip32_derive(path).map_err(|e| {
            warn!("derivation failed: {e}");
            StatusWord::SignatureFail
        })
    }

    /// Derive the x-only key for an address under the default account
    fn address_x_only(&self, address_type: u8, address_index: u32) -> Result<[u8; 32], StatusWord> {
        let path = Bip32Path::address(DEFAULT_ACCOUNT, address_type, address_index);
        let k = self.derive(path.elements())?;

        let kp = Keypair::from_secret_key(&self.secp, &k.secret);
        Ok(kp.x_only_public_key().0.serialize())
    }

    fn public_key(&self, path: &Bip32Path) -> Result<Vec<u8>, StatusWord> {
        let k = self.derive(path.elements())?;
        let p = PublicKey::from_secret_key(&self.secp, &k.secret);

        encode(&PublicKeyResp::new(p.serialize_uncompressed(), k.chain_code))
    }

    fn get_public_key(&mut self, f: &Frame) -> Result<Output, StatusWord> {
        if f.p1 > 1 || f.p2 != 0 {
            return Err(StatusWord::WrongP1P2);
        }
        if f.data.is_empty() {
            return Err(StatusWord::WrongDataLength);
        }

        let (path, _) =
            Bip32Path::decode_owned(f.payload()).map_err(|_| StatusWord::WrongDataLength)?;
        check_path(&path)?;

        match f.p1 {
            0 => self.public_key(&path).map(Output::Data),
            _ => {
                self.reset();
                self.path = Some(path);
                self.state = State::PublicKeyPending;
                Ok(Output::Pending)
            }
        }
    }

    fn approve_public_key(&self) -> Result<Vec<u8>, StatusWord> {
        let path = self.path.as_ref().ok_or(StatusWord::BadState)?;
        self.public_key(path)
    }

    fn sign_message(&mut self, f: &Frame) -> Result<Output, StatusWord> {
        if f.p1 != 0 || f.p2 != 0 {
            return Err(StatusWord::WrongP1P2);
        }
        if f.data.is_empty() {
            return Err(StatusWord::WrongDataLength);
        }

        self.reset();

        let m = parse_message(f.payload(), self.config.message_limit)?;

        debug!("message ({} bytes) for {}", m.message.len(), m.path);

        self.message_hash = message_hash(&m.message)?;
        self.path = Some(m.path);
        self.state = State::MessagePending;

        Ok(Output::Pending)
    }

    fn approve_message(&self) -> Result<Vec<u8>, StatusWord> {
        let path = self.path.as_ref().ok_or(StatusWord::BadState)?;
        let k = self.derive(path.elements())?;

        let kp = Keypair::from_secret_key(&self.secp, &k.secret);
        let sig = self
            .secp
            .sign_schnorr_no_aux_rand(&Message::from_digest(self.message_hash), &kp);

        let signature =
            heapless::Vec::from_slice(&sig.serialize()).map_err(|_| StatusWord::SignatureFail)?;

        encode(&MessageSignatureResp {
            signature,
            message_hash: self.message_hash,
        })
    }

    fn sign_tx(&mut self, f: &Frame) -> Result<Output, StatusWord> {
        let phase = f.phase().ok_or(StatusWord::WrongP1P2)?;
        let cont = f.continuation().ok_or(StatusWord::WrongP1P2)?;

        // Header and outputs are never the terminal frame
        if matches!(phase, Phase::Start | Phase::Outputs) && cont != Continuation::More {
            return Err(StatusWord::WrongP1P2);
        }
        if phase != Phase::NextSignature && f.data.is_empty() {
            return Err(StatusWord::WrongDataLength);
        }

        let r = match phase {
            Phase::Start => self.tx_start(f.payload()),
            Phase::Outputs => self.tx_output(f.payload()),
            Phase::Inputs => self.tx_input(f.payload(), cont),
            Phase::NextSignature => return self.next_signature().map(Output::Data),
        };

        // Any staging failure aborts the exchange
        if let Err(e) = &r {
            debug!("transaction rejected: {e}");
            self.reset();
        }

        r
    }

    fn tx_start(&mut self, data: &[u8]) -> Result<Output, StatusWord> {
        self.reset();

        self.tx = Some(StagedTx::new(data)?);
        self.state = State::Staging;

        Ok(Output::Data(vec![]))
    }

    fn staged(&mut self) -> Result<&mut StagedTx, StatusWord> {
        match (self.state, self.tx.as_mut()) {
            (State::Staging, Some(tx)) => Ok(tx),
            _ => Err(StatusWord::BadState),
        }
    }

    fn tx_output(&mut self, data: &[u8]) -> Result<Output, StatusWord> {
        self.staged()?.push_output(data)?;
        Ok(Output::Data(vec![]))
    }

    fn tx_input(&mut self, data: &[u8], cont: Continuation) -> Result<Output, StatusWord> {
        let last = cont == Continuation::Last;
        self.staged()?.push_input(data, last)?;

        if !last {
            return Ok(Output::Data(vec![]));
        }

        let tx = self.tx.as_ref().ok_or(StatusWord::BadState)?;
        tx.check_fee()?;

        if let Some(c) = tx.change() {
            let x = self.address_x_only(c.address_type, c.address_index)?;
            tx.check_change(&p2pk_script(&x))?;
        }

        self.state = State::TxPending;

        Ok(Output::Pending)
    }

    fn approve_tx(&mut self) -> Result<Vec<u8>, StatusWord> {
        let signatures = match self.sign_inputs() {
            Ok(s) => s,
            Err(e) => {
                self.reset();
                return Err(e);
            }
        };

        self.signatures = signatures;
        self.state = State::Signing;

        self.next_signature()
    }

    fn sign_inputs(&self) -> Result<VecDeque<TxSignatureResp>, StatusWord> {
        let tx = self.tx.as_ref().ok_or(StatusWord::BadState)?;

        let mut signatures = VecDeque::with_capacity(tx.inputs().len());

        for (index, i) in tx.inputs().iter().enumerate() {
            let k = self.derive(
                Bip32Path::address(DEFAULT_ACCOUNT, i.address_type, i.address_index).elements(),
            )?;
            let kp = Keypair::from_secret_key(&self.secp, &k.secret);
            let (x, parity) = kp.x_only_public_key();

            let sighash = tx_sighash(tx, index, &x.serialize())?;
            let sig = self
                .secp
                .sign_schnorr_no_aux_rand(&Message::from_digest(sighash), &kp);

            let r = TxSignatureResp {
                has_more: false,
                input_index: index as u8,
                scheme: SignatureScheme::Schnorr,
                signature: heapless::Vec::from_slice(&sig.serialize())
                    .map_err(|_| StatusWord::SignatureFail)?,
                recovery_id: parity.to_u8(),
                sighash,
            };

            match self.config.order {
                SignatureOrder::Declared => signatures.push_back(r),
                SignatureOrder::Reversed => signatures.push_front(r),
            }
        }

        Ok(signatures)
    }

    fn next_signature(&mut self) -> Result<Vec<u8>, StatusWord> {
        if self.state != State::Signing {
            return Err(StatusWord::BadState);
        }

        let mut r = self.signatures.pop_front().ok_or(StatusWord::BadState)?;
        r.has_more = !self.signatures.is_empty();

        debug!(
            "signature for input {} (has_more: {})",
            r.input_index, r.has_more
        );

        if !r.has_more {
            self.reset();
        }

        encode(&r)
    }
}
