// Copyright (c) 2023 The Kaspa Ledger Developers

use serde::{Deserialize, Serialize};

use ledger_kaspa::{InputSignature, Transaction, TransactionInput, TransactionOutput};

/// Hex encoded byte array for serde
mod hex_array {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(v: &[u8; N], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(d: D) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(d)?;
        let mut b = [0u8; N];
        hex::decode_to_slice(&s, &mut b).map_err(D::Error::custom)?;
        Ok(b)
    }
}

/// Hex encoded byte vector for serde
mod hex_vec {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(D::Error::custom)
    }
}

/// Transaction input file format
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct InputFile {
    pub value: u64,
    #[serde(with = "hex_array")]
    pub previous_tx_id: [u8; 32],
    #[serde(default)]
    pub address_type: u8,
    pub address_index: u32,
    pub input_index: u32,
}

/// Transaction output file format
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct OutputFile {
    pub value: u64,
    #[serde(with = "hex_vec")]
    pub script_public_key: Vec<u8>,
}

/// Change address file format
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ChangeFile {
    pub address_type: u8,
    pub address_index: u32,
}

/// Unsigned transaction file format
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct TxFile {
    #[serde(default)]
    pub version: u16,
    pub inputs: Vec<InputFile>,
    pub outputs: Vec<OutputFile>,
    #[serde(default)]
    pub change: Option<ChangeFile>,
}

impl TryFrom<TxFile> for Transaction {
    type Error = ledger_kaspa::Error;

    fn try_from(f: TxFile) -> Result<Self, Self::Error> {
        let inputs = f
            .inputs
            .into_iter()
            .map(|i| TransactionInput {
                value: i.value,
                previous_tx_id: i.previous_tx_id,
                address_type: i.address_type,
                address_index: i.address_index,
                input_index: i.input_index,
                public_key: None,
            })
            .collect();

        let outputs = f
            .outputs
            .into_iter()
            .map(|o| TransactionOutput::new(o.value, o.script_public_key))
            .collect::<Result<_, _>>()?;

        let tx = Transaction::new(f.version, inputs, outputs)?;

        Ok(match f.change {
            Some(c) => tx.with_change(c.address_type, c.address_index),
            None => tx,
        })
    }
}

/// Signature output file format
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SignatureFile {
    pub input_index: u8,
    pub scheme: String,
    #[serde(with = "hex_vec")]
    pub signature: Vec<u8>,
    #[serde(with = "hex_array")]
    pub sighash: [u8; 32],
}

impl From<&InputSignature> for SignatureFile {
    fn from(s: &InputSignature) -> Self {
        Self {
            input_index: s.input_index,
            scheme: s.scheme.to_string(),
            signature: s.signature.clone(),
            sighash: s.sighash,
        }
    }
}
