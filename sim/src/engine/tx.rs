// Copyright (c) 2023 The Kaspa Ledger Developers

//! Transaction staging, records are appended one frame at a time and the
//! complete transaction checked on the final input

use encdec::Decode;

use ledger_kaspa_apdu::{
    path::ADDRESS_TYPE_CHANGE,
    status::StatusWord,
    tx::{ChangeAddress, TxHeader, TxInput, TxOutput},
    MAX_INPUT_COUNT, MAX_OUTPUT_COUNT, MAX_TX_VERSION,
};

/// Staged transaction output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedOutput {
    pub value: u64,
    pub script_public_key: Vec<u8>,
}

/// Transaction staged across signing frames
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedTx {
    header: TxHeader,
    outputs: Vec<StagedOutput>,
    inputs: Vec<TxInput>,
}

impl StagedTx {
    /// Start staging from a header frame
    pub fn new(data: &[u8]) -> Result<Self, StatusWord> {
        let (header, _) = TxHeader::decode(data).map_err(|_| StatusWord::TxParsingFail)?;

        if header.version > MAX_TX_VERSION {
            return Err(StatusWord::TxParsingFail);
        }

        let num_outputs = header.num_outputs as usize;
        if !(1..=MAX_OUTPUT_COUNT).contains(&num_outputs) {
            return Err(StatusWord::TxParsingFail);
        }

        let num_inputs = header.num_inputs as usize;
        if !(1..=MAX_INPUT_COUNT).contains(&num_inputs) {
            return Err(StatusWord::TxParsingFail);
        }

        // Change is always the second output
        if let Some(c) = &header.change {
            if num_outputs != MAX_OUTPUT_COUNT || c.address_type > ADDRESS_TYPE_CHANGE {
                return Err(StatusWord::TxParsingFail);
            }
        }

        Ok(Self {
            outputs: Vec::with_capacity(num_outputs),
            inputs: Vec::with_capacity(num_inputs),
            header,
        })
    }

    pub fn version(&self) -> u16 {
        self.header.version
    }

    pub fn change(&self) -> Option<ChangeAddress> {
        self.header.change
    }

    pub fn outputs(&self) -> &[StagedOutput] {
        &self.outputs
    }

    pub fn inputs(&self) -> &[TxInput] {
        &self.inputs
    }

    /// Append an output frame
    pub fn push_output(&mut self, data: &[u8]) -> Result<(), StatusWord> {
        // Outputs precede inputs
        if !self.inputs.is_empty() {
            return Err(StatusWord::BadState);
        }

        if self.outputs.len() >= self.header.num_outputs as usize {
            return Err(StatusWord::TxParsingFail);
        }

        let (o, n) = TxOutput::decode(data).map_err(|_| StatusWord::TxParsingFail)?;
        if n != data.len() {
            return Err(StatusWord::TxParsingFail);
        }

        self.outputs.push(StagedOutput {
            value: o.value,
            script_public_key: o.script_public_key.to_vec(),
        });

        Ok(())
    }

    /// Append an input frame, `last` marks the terminal frame of the exchange
    pub fn push_input(&mut self, data: &[u8], last: bool) -> Result<(), StatusWord> {
        if self.outputs.len() != self.header.num_outputs as usize {
            return Err(StatusWord::BadState);
        }

        if self.inputs.len() >= self.header.num_inputs as usize {
            return Err(StatusWord::TxParsingFail);
        }

        let (i, n) = TxInput::decode(data).map_err(|_| StatusWord::TxParsingFail)?;
        if n != data.len() || i.address_type > ADDRESS_TYPE_CHANGE {
            return Err(StatusWord::TxParsingFail);
        }

        self.inputs.push(i);

        if last && self.inputs.len() != self.header.num_inputs as usize {
            return Err(StatusWord::TxParsingFail);
        }

        Ok(())
    }

    /// Check inputs cover outputs
    pub fn check_fee(&self) -> Result<(), StatusWord> {
        let input_total: u128 = self.inputs.iter().map(|i| i.value as u128).sum();
        let output_total: u128 = self.outputs.iter().map(|o| o.value as u128).sum();

        match input_total >= output_total {
            true => Ok(()),
            false => Err(StatusWord::TxParsingFail),
        }
    }

    /// Check the change output pays the expected script
    pub fn check_change(&self, expected: &[u8]) -> Result<(), StatusWord> {
        match self.outputs.get(1) {
            Some(o) if o.script_public_key == expected => Ok(()),
            _ => Err(StatusWord::TxParsingFail),
        }
    }
}
