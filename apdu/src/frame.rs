// Copyright (c) 2023 The Kaspa Ledger Developers

//! Command and response framing
//!
//! ## Command Encoding:
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      CLA      |      INS      |   P1 (PHASE)  |   P2 (CONT)   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      LC       |                                               |
//! +-+-+-+-+-+-+-+-+                                               +
//! /                       DATA (LC bytes)                         /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! ## Response Encoding:
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                          DATA...                              /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     STATUS WORD (BE)          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use encdec::{Decode, DecodeOwned, Encode};
use heapless::Vec;

use crate::{
    status::StatusWord, ApduError, ApduStatic, Continuation, Phase, MAX_APDU_PAYLOAD,
};

/// Frame header length (CLA, INS, P1, P2, LC)
pub const FRAME_HEADER_LEN: usize = 5;

/// Command frame, payload bounded by the single byte `Lc`
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Frame {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8, MAX_APDU_PAYLOAD>,
}

impl Frame {
    /// Build a frame from raw parts
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8, data: &[u8]) -> Result<Self, ApduError> {
        let data = Vec::from_slice(data).map_err(|_| ApduError::InvalidLength)?;

        Ok(Self {
            cla,
            ins,
            p1,
            p2,
            data,
        })
    }

    /// Build a frame carrying an encoded request record
    pub fn request<R>(req: &R, p1: u8, p2: u8) -> Result<Self, ApduError>
    where
        R: ApduStatic + Encode<Error = ApduError>,
    {
        let n = req.encode_len()?;
        if n > MAX_APDU_PAYLOAD {
            return Err(ApduError::InvalidLength);
        }

        let mut data = Vec::new();
        data.resize_default(n).map_err(|_| ApduError::InvalidLength)?;

        let written = req.encode(&mut data)?;
        data.truncate(written);

        Ok(Self {
            cla: R::CLA,
            ins: R::INS,
            p1,
            p2,
            data,
        })
    }

    /// Build a signing frame for the provided phase and continuation
    pub fn tagged<R>(req: &R, phase: Phase, cont: Continuation) -> Result<Self, ApduError>
    where
        R: ApduStatic + Encode<Error = ApduError>,
    {
        Self::request(req, phase as u8, cont as u8)
    }

    /// Frame payload
    pub fn payload(&self) -> &[u8] {
        &self.data
    }

    /// Signing phase (`P1`), where valid
    pub fn phase(&self) -> Option<Phase> {
        Phase::try_from(self.p1).ok()
    }

    /// Continuation marker (`P2`), where valid
    pub fn continuation(&self) -> Option<Continuation> {
        Continuation::try_from(self.p2).ok()
    }

    /// Check whether this frame is tagged as the last in an exchange
    pub fn is_last(&self) -> bool {
        self.p2 == Continuation::Last as u8
    }
}

impl Encode for Frame {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(FRAME_HEADER_LEN + self.data.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.cla;
        buff[1] = self.ins;
        buff[2] = self.p1;
        buff[3] = self.p2;
        buff[4] = self.data.len() as u8;
        buff[FRAME_HEADER_LEN..n].copy_from_slice(&self.data);

        Ok(n)
    }
}

impl DecodeOwned for Frame {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < FRAME_HEADER_LEN {
            return Err(ApduError::InvalidLength);
        }

        // Lc must match the remaining data exactly
        let lc = buff[4] as usize;
        if buff.len() != FRAME_HEADER_LEN + lc {
            return Err(ApduError::InvalidLength);
        }

        let f = Frame::new(buff[0], buff[1], buff[2], buff[3], &buff[FRAME_HEADER_LEN..])?;

        Ok((f, FRAME_HEADER_LEN + lc))
    }
}

/// Response frame, data followed by a big-endian status word
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Response<'a> {
    pub data: &'a [u8],
    pub status: u16,
}

impl<'a> Response<'a> {
    /// Create a new response
    pub fn new(data: &'a [u8], status: impl Into<u16>) -> Self {
        Self {
            data,
            status: status.into(),
        }
    }

    /// Parse the status word, `None` for unknown codes
    pub fn status_word(&self) -> Option<StatusWord> {
        StatusWord::from_u16(self.status)
    }

    /// Check whether the response indicates success
    pub fn is_ok(&self) -> bool {
        self.status == StatusWord::Ok as u16
    }
}

impl<'a> Encode for Response<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(self.data.len() + 2)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.data.len();
        if buff.len() < n + 2 {
            return Err(ApduError::InvalidLength);
        }

        buff[..n].copy_from_slice(self.data);
        buff[n..][..2].copy_from_slice(&self.status.to_be_bytes());

        Ok(n + 2)
    }
}

impl<'a> Decode<'a> for Response<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < 2 {
            return Err(ApduError::InvalidLength);
        }

        let n = buff.len() - 2;
        let status = u16::from_be_bytes([buff[n], buff[n + 1]]);

        Ok((
            Self {
                data: &buff[..n],
                status,
            },
            buff.len(),
        ))
    }
}
