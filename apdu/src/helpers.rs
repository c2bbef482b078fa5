// Copyright (c) 2023 The Kaspa Ledger Developers

//! encdec helper modules for big-endian fields and fixed arrays

/// encdec helper module for big-endian `u32` fields
pub(crate) mod be_u32 {
    use byteorder::{BigEndian, ByteOrder};

    use crate::ApduError;

    pub fn enc(v: &u32, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < 4 {
            return Err(ApduError::InvalidLength);
        }

        BigEndian::write_u32(&mut buff[..4], *v);

        Ok(4)
    }

    pub fn enc_len(_v: &u32) -> Result<usize, ApduError> {
        Ok(4)
    }

    pub fn dec(buff: &[u8]) -> Result<(u32, usize), ApduError> {
        if buff.len() < 4 {
            return Err(ApduError::InvalidLength);
        }

        Ok((BigEndian::read_u32(&buff[..4]), 4))
    }
}

/// encdec helper module for big-endian `u64` fields
pub(crate) mod be_u64 {
    use byteorder::{BigEndian, ByteOrder};

    use crate::ApduError;

    pub fn enc(v: &u64, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < 8 {
            return Err(ApduError::InvalidLength);
        }

        BigEndian::write_u64(&mut buff[..8], *v);

        Ok(8)
    }

    pub fn enc_len(_v: &u64) -> Result<usize, ApduError> {
        Ok(8)
    }

    pub fn dec(buff: &[u8]) -> Result<(u64, usize), ApduError> {
        if buff.len() < 8 {
            return Err(ApduError::InvalidLength);
        }

        Ok((BigEndian::read_u64(&buff[..8]), 8))
    }
}

/// encdec helper module for fixed size byte arrays
pub(crate) mod arr {
    use crate::ApduError;

    pub fn enc<const N: usize>(d: &[u8; N], buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < N {
            return Err(ApduError::InvalidLength);
        }

        buff[..N].copy_from_slice(d);

        Ok(N)
    }

    pub fn enc_len<const N: usize>(_d: &[u8; N]) -> Result<usize, ApduError> {
        Ok(N)
    }

    pub fn dec<const N: usize>(buff: &[u8]) -> Result<([u8; N], usize), ApduError> {
        if buff.len() < N {
            return Err(ApduError::InvalidLength);
        }

        let mut d = [0u8; N];
        d.copy_from_slice(&buff[..N]);

        Ok((d, N))
    }
}

/// Write a single-byte length prefixed field, returning the bytes written
pub(crate) fn enc_prefixed(d: &[u8], buff: &mut [u8]) -> Result<usize, crate::ApduError> {
    if d.len() > u8::MAX as usize || buff.len() < d.len() + 1 {
        return Err(crate::ApduError::InvalidLength);
    }

    buff[0] = d.len() as u8;
    buff[1..][..d.len()].copy_from_slice(d);

    Ok(d.len() + 1)
}

/// Read a single-byte length prefixed field, returning the field and bytes consumed
pub(crate) fn dec_prefixed(buff: &[u8]) -> Result<(&[u8], usize), crate::ApduError> {
    let len = match buff.first() {
        Some(l) => *l as usize,
        None => return Err(crate::ApduError::InvalidLength),
    };

    if buff.len() < len + 1 {
        return Err(crate::ApduError::InvalidLength);
    }

    Ok((&buff[1..][..len], len + 1))
}

/// Check a fixed layout record consumed the whole buffer
pub(crate) fn check_consumed(n: usize, buff: &[u8]) -> Result<(), crate::ApduError> {
    match n == buff.len() {
        true => Ok(()),
        false => Err(crate::ApduError::InvalidLength),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prefixed_fields() {
        let mut buff = [0u8; 8];

        let n = enc_prefixed(b"abc", &mut buff).unwrap();
        assert_eq!(&buff[..n], &[3, b'a', b'b', b'c']);

        let (d, m) = dec_prefixed(&buff[..n]).unwrap();
        assert_eq!(d, b"abc");
        assert_eq!(m, n);

        // Truncated
        assert!(dec_prefixed(&buff[..2]).is_err());
        assert!(dec_prefixed(&[]).is_err());
    }

    #[test]
    fn big_endian_fields() {
        let mut buff = [0u8; 8];

        be_u32::enc(&0x0102_0304, &mut buff).unwrap();
        assert_eq!(&buff[..4], &[1, 2, 3, 4]);

        be_u64::enc(&1_100_000, &mut buff).unwrap();
        assert_eq!(buff, [0, 0, 0, 0, 0, 0x10, 0xc8, 0xe0]);
        assert_eq!(be_u64::dec(&buff).unwrap(), (1_100_000, 8));

        assert!(be_u64::dec(&buff[..7]).is_err());
    }
}
