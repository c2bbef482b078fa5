// Copyright (c) 2023 The Kaspa Ledger Developers

//! Splits a [Transaction] into signing frames

use ledger_kaspa_apdu::{frame::Frame, Continuation, Phase};

use super::Transaction;
use crate::Error;

/// Signing frame with its phase and continuation marker
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    pub phase: Phase,
    pub continuation: Continuation,
    pub frame: Frame,
}

impl Chunk {
    /// Check whether this is the final frame of the exchange
    pub fn is_terminal(&self) -> bool {
        self.continuation == Continuation::Last
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum ChunkState {
    Start,
    Outputs(usize),
    Inputs(usize),
    Done,
}

/// Iterator over the frames of a signing exchange
///
/// Emits the header, then one frame per output and one per input. Only the
/// final input is tagged [Continuation::Last].
pub struct TxChunker<'a> {
    tx: &'a Transaction,
    state: ChunkState,
    sent_outputs: usize,
    sent_inputs: usize,
}

impl<'a> TxChunker<'a> {
    /// Create a chunker for the provided transaction
    pub fn new(tx: &'a Transaction) -> Self {
        Self {
            tx,
            state: ChunkState::Start,
            sent_outputs: 0,
            sent_inputs: 0,
        }
    }

    /// Number of output frames emitted
    pub fn sent_outputs(&self) -> usize {
        self.sent_outputs
    }

    /// Number of input frames emitted
    pub fn sent_inputs(&self) -> usize {
        self.sent_inputs
    }

    fn continuation(&self, last: bool) -> Continuation {
        match last {
            true => Continuation::Last,
            false => Continuation::More,
        }
    }

    fn next_chunk(&mut self) -> Result<Option<Chunk>, Error> {
        let (num_outputs, num_inputs) = (self.tx.outputs().len(), self.tx.inputs().len());

        let (phase, continuation, frame, next) = match self.state {
            ChunkState::Start => {
                let c = Continuation::More;
                let f = Frame::tagged(&self.tx.header(), Phase::Start, c)?;

                (Phase::Start, c, f, ChunkState::Outputs(0))
            }
            // Inputs follow, outputs are never terminal
            ChunkState::Outputs(i) if i < num_outputs => {
                let c = Continuation::More;
                let f = Frame::tagged(&self.tx.outputs()[i].to_apdu(), Phase::Outputs, c)?;
                self.sent_outputs += 1;

                (Phase::Outputs, c, f, ChunkState::Outputs(i + 1))
            }
            ChunkState::Outputs(_) => {
                self.state = ChunkState::Inputs(0);
                return self.next_chunk();
            }
            ChunkState::Inputs(i) if i < num_inputs => {
                let c = self.continuation(i + 1 == num_inputs);
                let f = Frame::tagged(&self.tx.inputs()[i].to_apdu(), Phase::Inputs, c)?;
                self.sent_inputs += 1;

                (Phase::Inputs, c, f, ChunkState::Inputs(i + 1))
            }
            ChunkState::Inputs(_) | ChunkState::Done => {
                self.state = ChunkState::Done;
                return Ok(None);
            }
        };

        self.state = match continuation {
            Continuation::Last => ChunkState::Done,
            Continuation::More => next,
        };

        Ok(Some(Chunk {
            phase,
            continuation,
            frame,
        }))
    }
}

impl<'a> Iterator for TxChunker<'a> {
    type Item = Result<Chunk, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(c) => c.map(Ok),
            Err(e) => {
                self.state = ChunkState::Done;
                Some(Err(e))
            }
        }
    }
}

/// Concatenate chunk payloads, inverting [TxChunker]
pub fn reassemble<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> Vec<u8> {
    chunks
        .into_iter()
        .flat_map(|c| c.frame.payload().iter().copied())
        .collect()
}
