// Copyright (c) 2023 The Kaspa Ledger Developers

//! Application Information APDUs

use encdec::{Decode, Encode};

use super::{
    ApduError, ApduStatic, Instruction, BOLOS_APDU_CLA, BOLOS_INS_GET_APP_AND_VERSION,
    KAS_APDU_CLA,
};
use crate::helpers::{dec_prefixed, enc_prefixed};

/// Application version request APDU
#[derive(Copy, Clone, PartialEq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct VersionReq;

impl ApduStatic for VersionReq {
    const CLA: u8 = KAS_APDU_CLA;
    const INS: u8 = Instruction::GetVersion as u8;
}

/// Application name request APDU
#[derive(Copy, Clone, PartialEq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct AppNameReq;

impl ApduStatic for AppNameReq {
    const CLA: u8 = KAS_APDU_CLA;
    const INS: u8 = Instruction::GetAppName as u8;
}

/// Dashboard app and version request APDU (handled by the OS rather than the app)
#[derive(Copy, Clone, PartialEq, Debug, Default, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct AppAndVersionReq;

impl ApduStatic for AppAndVersionReq {
    /// Dashboard commands use class `0xb0`
    const CLA: u8 = BOLOS_APDU_CLA;
    const INS: u8 = BOLOS_INS_GET_APP_AND_VERSION;
}

/// Application version response APDU
///
/// ## Encoding:
/// ```text
///  0                   1                   2
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     MAJOR     |     MINOR     |     PATCH     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct VersionResp {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl VersionResp {
    /// Create a new version response
    pub fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

/// Application name response APDU, the whole payload is the UTF-8 name
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct AppNameResp<'a> {
    pub name: &'a str,
}

impl<'a> Encode for AppNameResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(self.name.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.name.len();
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[..n].copy_from_slice(self.name.as_bytes());

        Ok(n)
    }
}

impl<'a> Decode<'a> for AppNameResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), Self::Error> {
        let name = core::str::from_utf8(buff).map_err(|_| ApduError::InvalidEncoding)?;

        Ok((Self { name }, buff.len()))
    }
}

/// Dashboard app and version response APDU
///
/// ## Encoding
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  FORMAT (0x01)|   NAME_LEN    |            NAME...            /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  VERSION_LEN  |                  VERSION...                   /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   FLAGS_LEN   |                   FLAGS...                    /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct AppAndVersionResp<'a> {
    /// Application name
    pub name: &'a str,

    /// Application version
    pub version: &'a str,

    /// OS flags, opaque to the client
    pub flags: &'a [u8],
}

/// App and version response format
pub const APP_AND_VERSION_FORMAT: u8 = 0x01;

impl<'a> AppAndVersionResp<'a> {
    /// Create a new app and version response
    pub fn new(name: &'a str, version: &'a str, flags: &'a [u8]) -> Self {
        Self {
            name,
            version,
            flags,
        }
    }
}

impl<'a> Encode for AppAndVersionResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(4 + self.name.len() + self.version.len() + self.flags.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = APP_AND_VERSION_FORMAT;
        let mut index = 1;

        index += enc_prefixed(self.name.as_bytes(), &mut buff[index..])?;
        index += enc_prefixed(self.version.as_bytes(), &mut buff[index..])?;
        index += enc_prefixed(self.flags, &mut buff[index..])?;

        Ok(index)
    }
}

impl<'a> Decode<'a> for AppAndVersionResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        match buff.first() {
            Some(&APP_AND_VERSION_FORMAT) => (),
            Some(_) => return Err(ApduError::InvalidEncoding),
            None => return Err(ApduError::InvalidLength),
        }
        let mut index = 1;

        let (name, n) = dec_prefixed(&buff[index..])?;
        let name = core::str::from_utf8(name).map_err(|_| ApduError::InvalidEncoding)?;
        index += n;

        let (version, n) = dec_prefixed(&buff[index..])?;
        let version = core::str::from_utf8(version).map_err(|_| ApduError::InvalidEncoding)?;
        index += n;

        let (flags, n) = dec_prefixed(&buff[index..])?;
        index += n;

        Ok((
            Self {
                name,
                version,
                flags,
            },
            index,
        ))
    }
}
