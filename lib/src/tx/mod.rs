// Copyright (c) 2023 The Kaspa Ledger Developers

//! Transaction APIs
//!
//! [Transaction] holds the data sent to the device for signing, [TxChunker]
//! splits it into frames and [SignatureStream] collects the per-input
//! signatures once the operator approves.

use encdec::{Decode, Encode};

use ledger_kaspa_apdu::{
    path::{Bip32Path, DEFAULT_ACCOUNT},
    tx::{TxHeader, TxInput, TxOutput, TX_HEADER_CHANGE_LEN, TX_HEADER_LEN},
    ApduError, MAX_TX_VERSION,
};

use crate::{encode_vec, Error};

mod chunk;
pub use chunk::{reassemble, Chunk, TxChunker};

mod sighash;
pub use sighash::{calc_sighash, spend_script};

mod signature;
pub use signature::{InputSignature, SignatureStream, TxSigning};

/// Transaction input, spending an output owned by the device
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    /// Value of the spent output in sompi
    pub value: u64,
    /// Transaction id of the spent output
    pub previous_tx_id: [u8; 32],
    /// Address type (0 receive, 1 change)
    pub address_type: u8,
    /// Address index
    pub address_index: u32,
    /// Outpoint index within the previous transaction
    pub input_index: u32,
    /// Compressed public key of the spent address, fetched from the
    /// device when unset
    pub public_key: Option<[u8; 33]>,
}

impl TransactionInput {
    /// Derivation path for the key owning this input
    pub fn path(&self) -> Bip32Path {
        Bip32Path::address(DEFAULT_ACCOUNT, self.address_type, self.address_index)
    }

    /// Build the wire record for this input
    pub fn to_apdu(&self) -> TxInput {
        TxInput {
            value: self.value,
            previous_tx_id: self.previous_tx_id,
            address_type: self.address_type,
            address_index: self.address_index,
            input_index: self.input_index,
        }
    }

    /// Serialize this input (49 bytes)
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        encode_vec(&self.to_apdu())
    }

    /// Deserialize an input, the public key is not carried on the wire
    pub fn deserialize(buff: &[u8]) -> Result<Self, Error> {
        let (i, n) = TxInput::decode(buff)?;
        if n != buff.len() {
            return Err(ApduError::InvalidLength.into());
        }

        Ok(i.into())
    }
}

impl From<TxInput> for TransactionInput {
    fn from(i: TxInput) -> Self {
        Self {
            value: i.value,
            previous_tx_id: i.previous_tx_id,
            address_type: i.address_type,
            address_index: i.address_index,
            input_index: i.input_index,
            public_key: None,
        }
    }
}

/// Transaction output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutput {
    /// Output value in sompi
    pub value: u64,
    /// Script public key
    script_public_key: Vec<u8>,
}

impl TransactionOutput {
    /// Create a new output, the script must fit a single byte length prefix
    pub fn new(value: u64, script_public_key: impl Into<Vec<u8>>) -> Result<Self, Error> {
        let script_public_key = script_public_key.into();
        if script_public_key.len() > u8::MAX as usize {
            return Err(Error::ScriptTooLong(script_public_key.len()));
        }

        Ok(Self {
            value,
            script_public_key,
        })
    }

    /// Script public key
    pub fn script_public_key(&self) -> &[u8] {
        &self.script_public_key
    }

    /// Build the wire record for this output
    pub fn to_apdu(&self) -> TxOutput<'_> {
        TxOutput::new(self.value, &self.script_public_key)
    }

    /// Serialize this output
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        encode_vec(&self.to_apdu())
    }

    /// Deserialize an output
    pub fn deserialize(buff: &[u8]) -> Result<Self, Error> {
        let (o, n) = TxOutput::decode(buff)?;
        if n != buff.len() {
            return Err(ApduError::InvalidLength.into());
        }

        Self::new(o.value, o.script_public_key)
    }
}

/// Change address declaration
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Change {
    pub address_type: u8,
    pub address_index: u32,
}

/// Transaction for signing, immutable once built
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    version: u16,
    inputs: Vec<TransactionInput>,
    outputs: Vec<TransactionOutput>,
    change: Option<Change>,
}

impl Transaction {
    /// Create a new transaction, checking version and counts fit the header.
    ///
    /// At least one input and one output are required.
    pub fn new(
        version: u16,
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
    ) -> Result<Self, Error> {
        if version > MAX_TX_VERSION {
            return Err(Error::InvalidVersion(version));
        }
        if inputs.len() > u8::MAX as usize {
            return Err(Error::TooManyInputs(inputs.len()));
        }
        if outputs.len() > u8::MAX as usize {
            return Err(Error::TooManyOutputs(outputs.len()));
        }
        if inputs.is_empty() {
            return Err(Error::NoInputs);
        }
        if outputs.is_empty() {
            return Err(Error::NoOutputs);
        }

        Ok(Self {
            version,
            inputs,
            outputs,
            change: None,
        })
    }

    /// Declare the change address (paid by the second output)
    pub fn with_change(mut self, address_type: u8, address_index: u32) -> Self {
        self.change = Some(Change {
            address_type,
            address_index,
        });
        self
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn inputs(&self) -> &[TransactionInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TransactionOutput] {
        &self.outputs
    }

    pub fn change(&self) -> Option<Change> {
        self.change
    }

    /// Sum of input values
    pub fn input_total(&self) -> u128 {
        self.inputs.iter().map(|i| i.value as u128).sum()
    }

    /// Sum of output values
    pub fn output_total(&self) -> u128 {
        self.outputs.iter().map(|o| o.value as u128).sum()
    }

    /// Header record for the start frame
    pub fn header(&self) -> TxHeader {
        let h = TxHeader::new(
            self.version,
            self.outputs.len() as u8,
            self.inputs.len() as u8,
        );

        match self.change {
            Some(c) => h.with_change(c.address_type, c.address_index),
            None => h,
        }
    }

    /// Serialize the transaction in frame order (header, outputs, inputs)
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        let mut buff = encode_vec(&self.header())?;

        for o in &self.outputs {
            buff.extend_from_slice(&o.serialize()?);
        }
        for i in &self.inputs {
            buff.extend_from_slice(&i.serialize()?);
        }

        Ok(buff)
    }

    /// Deserialize a transaction from a header followed by the declared
    /// outputs and inputs.
    ///
    /// The header length (with or without a change address) is not encoded,
    /// so both layouts are attempted and buffers that decode either way are
    /// rejected as ambiguous. [Transaction::from_payloads] uses the framed
    /// header and is the exact inverse of [Transaction::chunks].
    pub fn deserialize(buff: &[u8]) -> Result<Self, Error> {
        let mut found = None;

        for header_len in [TX_HEADER_LEN, TX_HEADER_CHANGE_LEN] {
            if buff.len() < header_len {
                break;
            }

            let (header, _) = TxHeader::decode(&buff[..header_len])?;
            if let Ok(tx) = Self::from_parts(&header, &buff[header_len..]) {
                if found.is_some() {
                    return Err(ApduError::InvalidEncoding.into());
                }
                found = Some(tx);
            }
        }

        found.ok_or_else(|| ApduError::InvalidLength.into())
    }

    fn from_parts(header: &TxHeader, mut buff: &[u8]) -> Result<Self, Error> {
        let mut outputs = Vec::with_capacity(header.num_outputs as usize);
        for _ in 0..header.num_outputs {
            let (o, n) = TxOutput::decode(buff)?;
            outputs.push(TransactionOutput::new(o.value, o.script_public_key)?);
            buff = &buff[n..];
        }

        let mut inputs = Vec::with_capacity(header.num_inputs as usize);
        for _ in 0..header.num_inputs {
            let (i, n) = TxInput::decode(buff)?;
            inputs.push(TransactionInput::from(i));
            buff = &buff[n..];
        }

        if !buff.is_empty() {
            return Err(ApduError::InvalidLength.into());
        }

        let tx = Self::new(header.version, inputs, outputs)?;

        Ok(match header.change {
            Some(c) => tx.with_change(c.address_type, c.address_index),
            None => tx,
        })
    }

    /// Rebuild a transaction from the payloads of a signing exchange
    pub fn from_payloads<'a>(payloads: impl IntoIterator<Item = &'a [u8]>) -> Result<Self, Error> {
        let mut payloads = payloads.into_iter();

        let start = payloads.next().ok_or(ApduError::InvalidLength)?;
        let (header, n) = TxHeader::decode(start)?;
        if n != start.len() {
            return Err(ApduError::InvalidLength.into());
        }

        let rest: Vec<u8> = payloads.flat_map(|p| p.iter().copied()).collect();

        Self::from_parts(&header, &rest)
    }

    /// Create a chunker for the signing exchange
    pub fn chunks(&self) -> TxChunker<'_> {
        TxChunker::new(self)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub fn p2pk_script(x: &[u8; 32]) -> Vec<u8> {
        let mut s = Vec::with_capacity(34);
        s.push(0x20);
        s.extend_from_slice(x);
        s.push(0xac);
        s
    }

    pub fn test_tx(num_inputs: usize, num_outputs: usize) -> Transaction {
        let inputs = (0..num_inputs)
            .map(|i| TransactionInput {
                value: 1_000_000 + i as u64,
                previous_tx_id: [i as u8; 32],
                address_type: 0,
                address_index: i as u32,
                input_index: i as u32,
                public_key: None,
            })
            .collect();

        let outputs = (0..num_outputs)
            .map(|i| TransactionOutput::new(500_000, p2pk_script(&[0xc0 + i as u8; 32])).unwrap())
            .collect();

        Transaction::new(0, inputs, outputs).unwrap()
    }

    #[test]
    fn transaction_serialize_layout() {
        let tx = test_tx(2, 1);
        let b = tx.serialize().unwrap();

        assert_eq!(&b[..4], &[0x00, 0x00, 0x01, 0x02]);
        assert_eq!(b.len(), 4 + (8 + 1 + 34) + 2 * 49);

        assert_eq!(Transaction::deserialize(&b).unwrap(), tx);
    }

    #[test]
    fn transaction_serialize_change() {
        let tx = test_tx(1, 2).with_change(1, 7);
        let b = tx.serialize().unwrap();

        assert_eq!(&b[..9], &[0x00, 0x00, 0x02, 0x01, 0x01, 0x00, 0x00, 0x00, 0x07]);
        assert_eq!(Transaction::deserialize(&b).unwrap(), tx);
    }

    #[test]
    fn transaction_deserialize_ambiguous() {
        // Parses as two outputs with either header layout
        let mut b = [0u8; 91];
        b[2] = 2;
        b[3] = 1;
        b[12] = 20;
        b[17] = 3;
        b[29] = 12;

        assert!(matches!(
            Transaction::deserialize(&b),
            Err(Error::Apdu(ApduError::InvalidEncoding))
        ));

        // Framed payloads resolve the header length
        let plain = Transaction::from_payloads([&b[..4], &b[4..42], &b[42..]]).unwrap();
        assert_eq!(plain.change(), None);
        assert_eq!(plain.outputs()[0].script_public_key().len(), 20);

        let change = Transaction::from_payloads([&b[..9], &b[9..42], &b[42..]]).unwrap();
        assert_eq!(change.change(), Some(Change { address_type: 0, address_index: 0 }));
        assert_eq!(change.outputs()[0].value, 20 << 32);
    }

    #[test]
    fn transaction_deserialize_truncated() {
        let b = test_tx(2, 2).serialize().unwrap();

        assert!(Transaction::deserialize(&b[..b.len() - 1]).is_err());
        assert!(Transaction::deserialize(&b[..3]).is_err());
        assert!(Transaction::deserialize(&[]).is_err());
    }

    #[test]
    fn transaction_limits() {
        assert!(matches!(
            Transaction::new(2, vec![], vec![]),
            Err(Error::InvalidVersion(2))
        ));
        assert!(matches!(
            TransactionOutput::new(1, vec![0u8; 256]),
            Err(Error::ScriptTooLong(256))
        ));

        let tx = test_tx(1, 1);
        let (i, o) = (tx.inputs()[0].clone(), tx.outputs()[0].clone());
        assert!(matches!(
            Transaction::new(0, vec![i.clone(); 256], vec![]),
            Err(Error::TooManyInputs(256))
        ));

        // Empty transactions never reach the device
        assert!(matches!(
            Transaction::new(0, vec![], vec![o]),
            Err(Error::NoInputs)
        ));
        assert!(matches!(
            Transaction::new(0, vec![i], vec![]),
            Err(Error::NoOutputs)
        ));
        assert!(matches!(
            Transaction::new(0, vec![], vec![]),
            Err(Error::NoInputs)
        ));
    }

    #[test]
    fn input_path() {
        let i = TransactionInput {
            value: 1,
            previous_tx_id: [0; 32],
            address_type: 1,
            address_index: 5,
            input_index: 0,
            public_key: None,
        };

        assert_eq!(i.path().to_string(), "m/44'/111111'/0'/1/5");
        assert_eq!(
            TransactionInput::deserialize(&i.serialize().unwrap()).unwrap(),
            i
        );
    }
}
