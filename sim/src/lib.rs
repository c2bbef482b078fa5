// Copyright (c) 2023 The Kaspa Ledger Developers

//! Reference Kaspa device for exercising the ledger protocol from rust.
//!
//! The [Engine] implements the device contract observable by clients:
//! command dispatch and status words, chunked transaction staging and
//! validation, BIP32 key derivation, BIP340 signing and the per-input
//! signature sequence.
//!
//! [SimDevice] runs an engine in-process with an explicit approve / deny
//! API for tests, and [serve] exposes a device over TCP using the speculos
//! APDU framing, so clients may be pointed at either a simulator or a
//! physical device.

pub mod engine;
pub use engine::{Engine, EngineConfig, Output, SignatureOrder, State};

mod driver;
pub use driver::{DerivedKey, Driver, SeedDriver, DEFAULT_MNEMONIC};

mod device;
pub use device::{ApprovalPolicy, SimDevice};

mod server;
pub use server::serve;

mod error;
pub use error::Error;
