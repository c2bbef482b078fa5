// Copyright (c) 2023 The Kaspa Ledger Developers

//! Transaction signing tests

use std::future::Future;

use log::{debug, info};

use ledger_kaspa::{
    apdu::{
        path::{Bip32Path, ADDRESS_TYPE_CHANGE},
        tx::SignatureScheme,
    },
    tx::spend_script,
    Approval, DeviceHandle, Exchange, HandleConfig, InputSignature, Transaction,
    TransactionInput, TransactionOutput,
};

/// Value held by each generated input
pub const INPUT_VALUE: u64 = 1_000_000;

/// Fee paid by generated transactions
pub const FEE: u64 = 10_000;

/// Value paid to the destination when a change output is present
pub const SEND_VALUE: u64 = 500_000;

/// Account used for the destination output
const DESTINATION_ACCOUNT: u32 = 1;

/// Build a transaction spending `num_inputs` receive addresses, paying a
/// device-derived destination and optionally returning change
pub async fn build<T: Exchange>(
    d: &DeviceHandle<T>,
    num_inputs: usize,
    change_index: Option<u32>,
) -> anyhow::Result<Transaction> {
    anyhow::ensure!(num_inputs > 0, "at least one input required");

    let inputs: Vec<_> = (0..num_inputs)
        .map(|i| TransactionInput {
            value: INPUT_VALUE,
            previous_tx_id: [i as u8 + 1; 32],
            address_type: 0,
            address_index: i as u32,
            input_index: i as u32,
            public_key: None,
        })
        .collect();

    let total = INPUT_VALUE * num_inputs as u64 - FEE;

    let destination = d
        .public_key(&Bip32Path::address(DESTINATION_ACCOUNT, 0, 0))
        .await?
        .compressed();
    let destination = spend_script(&destination, SignatureScheme::Schnorr);

    let tx = match change_index {
        None => Transaction::new(0, inputs, vec![TransactionOutput::new(total, destination)?])?,
        Some(index) => {
            let change = d
                .public_key(&Bip32Path::address(0, ADDRESS_TYPE_CHANGE, index))
                .await?
                .compressed();

            let outputs = vec![
                TransactionOutput::new(SEND_VALUE, destination)?,
                TransactionOutput::new(
                    total - SEND_VALUE,
                    spend_script(&change, SignatureScheme::Schnorr),
                )?,
            ];

            Transaction::new(0, inputs, outputs)?.with_change(ADDRESS_TYPE_CHANGE, index)
        }
    };

    debug!("built transaction: {tx:?}");

    Ok(tx)
}

/// Sign a transaction with `num_inputs` inputs, collecting and verifying a
/// signature per input
pub async fn test<T, F>(
    t: T,
    approve: impl Fn() -> F,
    num_inputs: usize,
    change_index: Option<u32>,
) -> anyhow::Result<Vec<InputSignature>>
where
    T: Exchange,
    F: Future<Output = ()>,
{
    let d = DeviceHandle::new(t, HandleConfig::default());

    let tx = build(&d, num_inputs, change_index).await?;

    info!(
        "Signing transaction ({} inputs, {} outputs)",
        tx.inputs().len(),
        tx.outputs().len()
    );

    let p = d.sign_transaction(&tx).await?;

    approve().await;

    let s = match p.resolve().await? {
        Approval::Approved(s) => s,
        Approval::Denied => anyhow::bail!("transaction denied"),
    };

    // Signatures are verified against the local sighash as they arrive
    let signatures = s.collect().await?;

    for s in &signatures {
        info!(
            "input {}: {} (sighash {})",
            s.input_index,
            hex::encode(&s.signature),
            hex::encode(s.sighash)
        );
    }

    assert_eq!(signatures.len(), num_inputs);
    for (i, s) in signatures.iter().enumerate() {
        assert_eq!(s.input_index as usize, i);
        assert_eq!(s.scheme, SignatureScheme::Schnorr);
    }

    Ok(signatures)
}
