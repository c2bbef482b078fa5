// Copyright (c) 2023 The Kaspa Ledger Developers

//! Device-side signature and message hashing (keyed BLAKE2b-256)

use blake2::{
    digest::{consts::U32, Mac},
    Blake2bMac,
};

use ledger_kaspa_apdu::{status::StatusWord, tx::SIGHASH_LEN};

use super::tx::StagedTx;

const TX_SIGNING_KEY: &[u8] = b"TransactionSigningHash";

const MESSAGE_SIGNING_KEY: &[u8] = b"PersonalMessageSigningHash";

/// Schnorr pay-to-pubkey script (`OP_DATA_32 ‖ x ‖ OP_CHECKSIG`)
pub fn p2pk_script(x_only: &[u8; 32]) -> Vec<u8> {
    let mut s = Vec::with_capacity(34);
    s.push(0x20);
    s.extend_from_slice(x_only);
    s.push(0xac);
    s
}

fn hasher(key: &[u8]) -> Result<Blake2bMac<U32>, StatusWord> {
    <Blake2bMac<U32> as Mac>::new_from_slice(key).map_err(|_| StatusWord::TxHashFail)
}

fn finalize(h: Blake2bMac<U32>) -> [u8; SIGHASH_LEN] {
    let mut d = [0u8; SIGHASH_LEN];
    d.copy_from_slice(&h.finalize().into_bytes());
    d
}

/// Personal message hash
pub fn message_hash(message: &[u8]) -> Result<[u8; SIGHASH_LEN], StatusWord> {
    let mut h = hasher(MESSAGE_SIGNING_KEY)?;
    h.update(message);
    Ok(finalize(h))
}

/// Signature hash for the staged input at `index`, spent by `x_only`
pub fn tx_sighash(
    tx: &StagedTx,
    index: usize,
    x_only: &[u8; 32],
) -> Result<[u8; SIGHASH_LEN], StatusWord> {
    let input = tx.inputs().get(index).ok_or(StatusWord::TxHashFail)?;

    let mut prev_outputs = hasher(TX_SIGNING_KEY)?;
    let mut sequences = hasher(TX_SIGNING_KEY)?;
    let mut sig_op_counts = hasher(TX_SIGNING_KEY)?;

    for i in tx.inputs() {
        prev_outputs.update(&i.previous_tx_id);
        prev_outputs.update(&i.input_index.to_le_bytes());
        sequences.update(&0u64.to_le_bytes());
        sig_op_counts.update(&[1u8]);
    }

    let mut outputs = hasher(TX_SIGNING_KEY)?;
    for o in tx.outputs() {
        outputs.update(&o.value.to_le_bytes());
        outputs.update(&0u16.to_le_bytes());
        outputs.update(&(o.script_public_key.len() as u64).to_le_bytes());
        outputs.update(&o.script_public_key);
    }

    let script = p2pk_script(x_only);

    let mut h = hasher(TX_SIGNING_KEY)?;
    h.update(&tx.version().to_le_bytes());
    h.update(&finalize(prev_outputs));
    h.update(&finalize(sequences));
    h.update(&finalize(sig_op_counts));

    h.update(&input.previous_tx_id);
    h.update(&input.input_index.to_le_bytes());
    h.update(&0u16.to_le_bytes());
    h.update(&(script.len() as u64).to_le_bytes());
    h.update(&script);
    h.update(&input.value.to_le_bytes());
    h.update(&0u64.to_le_bytes());
    h.update(&[1u8]);

    h.update(&finalize(outputs));

    // Lock time, subnetwork id, gas, payload hash, sighash type
    h.update(&[0u8; 8]);
    h.update(&[0u8; 20]);
    h.update(&[0u8; 8]);
    h.update(&[0u8; 32]);
    h.update(&[1u8]);

    Ok(finalize(h))
}

#[cfg(test)]
mod test {
    use encdec::Encode;
    use ledger_kaspa_apdu::tx::{TxInput, TxOutput};

    use super::*;

    fn hex32(s: &str) -> [u8; 32] {
        hex::decode(s).unwrap().try_into().unwrap()
    }

    #[test]
    fn sighash_vector() {
        let mut tx = StagedTx::new(&[0, 1, 1, 1]).unwrap();

        let script =
            p2pk_script(&hex32("c62cf30e4e57c5922086460235d5157a62f2666aa22707cb9b588f6211fc0ed6"));
        let o = TxOutput::new(2, &script);
        let mut buff = vec![0u8; o.encode_len().unwrap()];
        o.encode(&mut buff).unwrap();
        tx.push_output(&buff).unwrap();

        let i = TxInput {
            value: 2,
            previous_tx_id: hex32(
                "11223344556677889900aabbccddeeff11223344556677889900aabbccddeeff",
            ),
            address_type: 0,
            address_index: 0,
            input_index: 1,
        };
        let mut buff = vec![0u8; i.encode_len().unwrap()];
        i.encode(&mut buff).unwrap();
        tx.push_input(&buff, true).unwrap();

        let x = hex32("e9edf67a325868ecc7cd8519e6ca5265e65b7d10f56066461ceabf0c2bc1c5ad");

        assert_eq!(
            hex::encode(tx_sighash(&tx, 0, &x).unwrap()),
            "7ccda6c64a181e6263f0eee2edc859dbcd9de717c065ea8e7dce1081bec5baa5"
        );
        assert!(tx_sighash(&tx, 1, &x).is_err());
    }

    #[test]
    fn message_vector() {
        assert_eq!(
            hex::encode(message_hash(b"Hello Kaspa!").unwrap()),
            "2e55deda4a5224208dbd4d93cfe5aa22d945eaa63172e329c49afed62f0e1510"
        );
    }
}
