// Copyright (c) 2023 The Kaspa Ledger Developers

//! Tests for Kaspa wallet integration.
//!
//! Generic over [ledger_kaspa::Exchange] for reuse against the in-process
//! simulator, a TCP simulator, or a physical device.
//!

pub mod app;

pub mod public_key;

pub mod transaction;

pub mod message;
