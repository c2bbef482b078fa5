// Copyright (c) 2023 The Kaspa Ledger Developers

//! Signature hash computation, used to check the hash the device commits to
//! for each signed input.
//!
//! All fields are little-endian, sub-hashes and the final digest use keyed
//! BLAKE2b-256 ([TX_SIGNING_KEY]).

use ledger_kaspa_apdu::tx::{SignatureScheme, SIGHASH_LEN};

use super::Transaction;
use crate::{
    crypto::{Hasher, TX_SIGNING_KEY},
    Error,
};

/// Spend script for a compressed public key
///
/// Schnorr inputs pay to `OP_DATA_32 ‖ x ‖ OP_CHECKSIG`, ECDSA inputs to
/// `OP_DATA_33 ‖ key ‖ OP_CHECKSIGECDSA`.
pub fn spend_script(public_key: &[u8; 33], scheme: SignatureScheme) -> Vec<u8> {
    let mut s = Vec::with_capacity(35);

    match scheme {
        SignatureScheme::Schnorr => {
            s.push(0x20);
            s.extend_from_slice(&public_key[1..]);
            s.push(0xac);
        }
        SignatureScheme::Ecdsa => {
            s.push(0x21);
            s.extend_from_slice(public_key);
            s.push(0xab);
        }
    }

    s
}

/// Compute the signature hash for the input at `index`
pub fn calc_sighash(
    tx: &Transaction,
    index: usize,
    public_key: &[u8; 33],
    scheme: SignatureScheme,
) -> Result<[u8; SIGHASH_LEN], Error> {
    let input = tx
        .inputs()
        .get(index)
        .ok_or(Error::UnexpectedInputIndex(index as u8))?;

    let mut prev_outputs = Hasher::new(TX_SIGNING_KEY)?;
    let mut sequences = Hasher::new(TX_SIGNING_KEY)?;
    let mut sig_op_counts = Hasher::new(TX_SIGNING_KEY)?;

    for i in tx.inputs() {
        prev_outputs
            .update(i.previous_tx_id)
            .update(i.input_index.to_le_bytes());
        sequences.update(0u64.to_le_bytes());
        sig_op_counts.update([1u8]);
    }

    let mut outputs = Hasher::new(TX_SIGNING_KEY)?;
    for o in tx.outputs() {
        let script = o.script_public_key();
        outputs
            .update(o.value.to_le_bytes())
            .update(0u16.to_le_bytes())
            .update((script.len() as u64).to_le_bytes())
            .update(script);
    }

    let script = spend_script(public_key, scheme);

    let mut h = Hasher::new(TX_SIGNING_KEY)?;
    h.update(tx.version().to_le_bytes())
        .update(prev_outputs.finalize())
        .update(sequences.finalize())
        .update(sig_op_counts.finalize());

    // Outpoint, script version and script of the spent output
    h.update(input.previous_tx_id)
        .update(input.input_index.to_le_bytes())
        .update(0u16.to_le_bytes())
        .update((script.len() as u64).to_le_bytes())
        .update(&script)
        .update(input.value.to_le_bytes());

    // Sequence, sig op count
    h.update(0u64.to_le_bytes()).update([1u8]);

    h.update(outputs.finalize());

    // Lock time, subnetwork id, gas, payload hash, sighash type
    h.update([0u8; 8])
        .update([0u8; 20])
        .update([0u8; 8])
        .update([0u8; 32])
        .update([1u8]);

    Ok(h.finalize())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tx::{test::p2pk_script, TransactionInput, TransactionOutput};

    #[test]
    fn sighash_vector() {
        let x = hex::decode("e9edf67a325868ecc7cd8519e6ca5265e65b7d10f56066461ceabf0c2bc1c5ad")
            .unwrap();
        let mut public_key = [0x02u8; 33];
        public_key[1..].copy_from_slice(&x);

        let tx_id = hex::decode(
            "11223344556677889900aabbccddeeff11223344556677889900aabbccddeeff",
        )
        .unwrap();

        let out_x = hex::decode("c62cf30e4e57c5922086460235d5157a62f2666aa22707cb9b588f6211fc0ed6")
            .unwrap();

        let input = TransactionInput {
            value: 2,
            previous_tx_id: tx_id.try_into().unwrap(),
            address_type: 0,
            address_index: 0,
            input_index: 1,
            public_key: Some(public_key),
        };
        let output =
            TransactionOutput::new(2, p2pk_script(&out_x.try_into().unwrap())).unwrap();

        let tx = Transaction::new(1, vec![input], vec![output]).unwrap();

        let h = calc_sighash(&tx, 0, &public_key, SignatureScheme::Schnorr).unwrap();
        assert_eq!(
            hex::encode(h),
            "7ccda6c64a181e6263f0eee2edc859dbcd9de717c065ea8e7dce1081bec5baa5"
        );
    }

    #[test]
    fn sighash_bound_to_input() {
        let tx = crate::tx::test::test_tx(2, 1);
        let k = [0x02u8; 33];

        let a = calc_sighash(&tx, 0, &k, SignatureScheme::Schnorr).unwrap();
        let b = calc_sighash(&tx, 1, &k, SignatureScheme::Schnorr).unwrap();
        assert_ne!(a, b);

        assert!(calc_sighash(&tx, 2, &k, SignatureScheme::Schnorr).is_err());
    }

    #[test]
    fn spend_scripts() {
        let k = [0x03u8; 33];
        assert_eq!(spend_script(&k, SignatureScheme::Schnorr).len(), 34);
        assert_eq!(spend_script(&k, SignatureScheme::Ecdsa)[0], 0x21);
        assert_eq!(*spend_script(&k, SignatureScheme::Ecdsa).last().unwrap(), 0xab);
    }
}
