// Copyright (c) 2023 The Kaspa Ledger Developers

//! BIP32 derivation paths
//!
//! Kaspa keys live under `m/44'/111111'/account'/address_type/address_index`,
//! with `address_type` 0 for receive and 1 for change addresses.

use core::{fmt::Display, str::FromStr};

use byteorder::{BigEndian, ByteOrder};
use encdec::{DecodeOwned, Encode};
use heapless::Vec;

use crate::ApduError;

/// Hardened derivation flag
pub const HARDENED: u32 = 0x8000_0000;

/// BIP44 purpose (`44'`)
pub const PURPOSE: u32 = HARDENED | 44;

/// Kaspa coin type (`111111'`)
pub const COIN_TYPE: u32 = HARDENED | 111_111;

/// Maximum path depth supported on the wire
pub const MAX_PATH_DEPTH: usize = 10;

/// Depth of a full Kaspa address path
pub const ADDRESS_PATH_DEPTH: usize = 5;

/// Default (first hardened) account
pub const DEFAULT_ACCOUNT: u32 = HARDENED;

/// Receive address type
pub const ADDRESS_TYPE_RECEIVE: u8 = 0;

/// Change address type
pub const ADDRESS_TYPE_CHANGE: u8 = 1;

/// Path parsing errors
#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::Display)]
pub enum PathError {
    /// Path must start with `m`
    MissingRoot,
    /// Invalid path element
    InvalidElement,
    /// Path exceeds the maximum depth
    TooDeep,
}

/// BIP32 derivation path
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     DEPTH     |          PATH[0] (u32 BE)                     /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /               |          PATH[1..DEPTH]...                    /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Bip32Path(Vec<u32, MAX_PATH_DEPTH>);

impl Bip32Path {
    /// Build a path from raw elements
    pub fn new(elements: &[u32]) -> Result<Self, PathError> {
        Vec::from_slice(elements)
            .map(Self)
            .map_err(|_| PathError::TooDeep)
    }

    /// Build the address path for an account, address type and index
    pub fn address(account: u32, address_type: u8, address_index: u32) -> Self {
        let mut v = Vec::new();

        // Capacity exceeds address depth, pushes cannot fail
        for e in [
            PURPOSE,
            COIN_TYPE,
            account | HARDENED,
            address_type as u32,
            address_index,
        ] {
            let _ = v.push(e);
        }

        Self(v)
    }

    /// Path elements
    pub fn elements(&self) -> &[u32] {
        &self.0
    }

    /// Path depth
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl AsRef<[u32]> for Bip32Path {
    fn as_ref(&self) -> &[u32] {
        &self.0
    }
}

impl FromStr for Bip32Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');

        match parts.next() {
            Some("m") => (),
            _ => return Err(PathError::MissingRoot),
        }

        let mut v = Vec::new();
        for p in parts {
            let (n, hardened) = match p.strip_suffix('\'').or_else(|| p.strip_suffix('h')) {
                Some(n) => (n, true),
                None => (p, false),
            };

            let n = u32::from_str(n).map_err(|_| PathError::InvalidElement)?;
            if n & HARDENED != 0 && hardened {
                return Err(PathError::InvalidElement);
            }

            let e = match hardened {
                true => n | HARDENED,
                false => n,
            };

            v.push(e).map_err(|_| PathError::TooDeep)?;
        }

        Ok(Self(v))
    }
}

impl Display for Bip32Path {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "m")?;

        for e in self.0.iter() {
            match e & HARDENED != 0 {
                true => write!(f, "/{}'", e & !HARDENED)?,
                false => write!(f, "/{}", e)?,
            }
        }

        Ok(())
    }
}

impl Encode for Bip32Path {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(1 + self.0.len() * 4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.0.len() as u8;
        for (i, e) in self.0.iter().enumerate() {
            BigEndian::write_u32(&mut buff[1 + i * 4..][..4], *e);
        }

        Ok(n)
    }
}

impl DecodeOwned for Bip32Path {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let depth = match buff.first() {
            Some(d) => *d as usize,
            None => return Err(ApduError::InvalidLength),
        };

        if depth > MAX_PATH_DEPTH {
            return Err(ApduError::InvalidEncoding);
        }
        if buff.len() < 1 + depth * 4 {
            return Err(ApduError::InvalidLength);
        }

        let mut v = Vec::new();
        for i in 0..depth {
            let e = BigEndian::read_u32(&buff[1 + i * 4..][..4]);
            v.push(e).map_err(|_| ApduError::InvalidLength)?;
        }

        Ok((Self(v), 1 + depth * 4))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_path() {
        let p = Bip32Path::from_str("m/44'/111111'/0'/0/0").unwrap();
        assert_eq!(p.elements(), &[PURPOSE, COIN_TYPE, HARDENED, 0, 0]);
        assert_eq!(p, Bip32Path::address(0, 0, 0));

        let p = Bip32Path::from_str("m/44h/111111h/2147483647/1/3").unwrap();
        assert_eq!(p.elements(), &[PURPOSE, COIN_TYPE, 0x7fff_ffff, 1, 3]);

        assert_eq!(Bip32Path::from_str("44'/0"), Err(PathError::MissingRoot));
        assert_eq!(Bip32Path::from_str("m/x"), Err(PathError::InvalidElement));
        assert_eq!(
            Bip32Path::from_str("m/0/1/2/3/4/5/6/7/8/9/10"),
            Err(PathError::TooDeep)
        );
    }

    #[test]
    fn display_path() {
        let s = "m/44'/111111'/5'/1/42";
        let p = Bip32Path::from_str(s).unwrap();

        let mut out = heapless::String::<32>::new();
        core::fmt::write(&mut out, format_args!("{p}")).unwrap();
        assert_eq!(out.as_str(), s);
    }

    #[test]
    fn encode_path() {
        let p = Bip32Path::address(0, 0, 1);

        let mut buff = [0u8; 64];
        let n = p.encode(&mut buff).unwrap();
        assert_eq!(n, 21);
        assert_eq!(
            &buff[..n],
            &[
                5, 0x80, 0, 0, 0x2c, 0x80, 0x01, 0xb2, 0x07, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                1
            ]
        );

        let (d, m) = Bip32Path::decode_owned(&buff[..n]).unwrap();
        assert_eq!(d, p);
        assert_eq!(m, n);

        assert!(Bip32Path::decode_owned(&buff[..n - 1]).is_err());
    }
}
