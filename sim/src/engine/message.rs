// Copyright (c) 2023 The Kaspa Ledger Developers

//! Personal message request parsing and path checks

use ledger_kaspa_apdu::{
    path::{Bip32Path, ADDRESS_PATH_DEPTH, ADDRESS_TYPE_CHANGE, COIN_TYPE, HARDENED, PURPOSE},
    status::StatusWord,
};

/// Parsed personal message request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRequest {
    pub path: Bip32Path,
    pub message: Vec<u8>,
}

fn read_u32(buff: &[u8], offset: usize) -> Option<u32> {
    let b = buff.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// Parse a message signing payload
/// (`address_type ‖ address_index ‖ account ‖ len ‖ message`)
pub fn parse_message(buff: &[u8], limit: usize) -> Result<MessageRequest, StatusWord> {
    let address_type = match buff.first() {
        Some(t) if *t <= ADDRESS_TYPE_CHANGE => *t,
        _ => return Err(StatusWord::MessageAddressTypeFail),
    };

    let address_index = read_u32(buff, 1).ok_or(StatusWord::MessageAddressIndexFail)?;

    let account = match read_u32(buff, 5) {
        Some(a) if a >= HARDENED => a,
        _ => return Err(StatusWord::MessageAddressTypeFail),
    };

    let len = *buff.get(9).ok_or(StatusWord::MessageLenParsingFail)? as usize;
    if len == 0 {
        return Err(StatusWord::MessageTooShort);
    }
    if len > limit {
        return Err(StatusWord::MessageTooLong);
    }

    let message = buff
        .get(10..10 + len)
        .ok_or(StatusWord::MessageParsingFail)?;
    if buff.len() != 10 + len {
        return Err(StatusWord::MessageUnexpected);
    }

    let path = Bip32Path::new(&[
        PURPOSE,
        COIN_TYPE,
        account,
        address_type as u32,
        address_index,
    ])
    .map_err(|_| StatusWord::MessageParsingFail)?;

    Ok(MessageRequest {
        path,
        message: message.to_vec(),
    })
}

/// Check a public key derivation path
pub fn check_path(path: &Bip32Path) -> Result<(), StatusWord> {
    let e = path.elements();

    if !(2..=ADDRESS_PATH_DEPTH).contains(&e.len()) {
        return Err(StatusWord::WrongBip32PathLen);
    }
    if e[0] != PURPOSE {
        return Err(StatusWord::WrongBip32Purpose);
    }
    if e[1] != COIN_TYPE {
        return Err(StatusWord::WrongBip32CoinType);
    }

    match e.get(3) {
        Some(t) if *t > ADDRESS_TYPE_CHANGE as u32 => Err(StatusWord::WrongBip32Type),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn payload(address_type: u8, account: u32, message: &[u8]) -> Vec<u8> {
        let mut b = vec![address_type];
        b.extend_from_slice(&7u32.to_be_bytes());
        b.extend_from_slice(&account.to_be_bytes());
        b.push(message.len() as u8);
        b.extend_from_slice(message);
        b
    }

    #[test]
    fn parse_valid() {
        let m = parse_message(&payload(1, HARDENED, b"Hello Kaspa!"), 200).unwrap();
        assert_eq!(m.message, b"Hello Kaspa!");
        assert_eq!(m.path.elements(), &[PURPOSE, COIN_TYPE, HARDENED, 1, 7]);
    }

    #[test]
    fn parse_rejections() {
        let p = payload(2, HARDENED, b"a");
        assert_eq!(parse_message(&p, 200), Err(StatusWord::MessageAddressTypeFail));

        let p = payload(0, 0, b"a");
        assert_eq!(parse_message(&p, 200), Err(StatusWord::MessageAddressTypeFail));

        assert_eq!(parse_message(&[0, 0, 0], 200), Err(StatusWord::MessageAddressIndexFail));

        let p = payload(0, HARDENED, b"a");
        assert_eq!(parse_message(&p[..9], 200), Err(StatusWord::MessageLenParsingFail));

        let p = payload(0, HARDENED, b"");
        assert_eq!(parse_message(&p, 200), Err(StatusWord::MessageTooShort));

        let p = payload(0, HARDENED, &[b'a'; 249]);
        assert_eq!(parse_message(&p, 200), Err(StatusWord::MessageTooLong));
        assert!(parse_message(&p, 255).is_ok());

        let p = payload(0, HARDENED, b"abc");
        assert_eq!(parse_message(&p[..p.len() - 1], 200), Err(StatusWord::MessageParsingFail));

        let mut p = payload(0, HARDENED, b"abc");
        p.push(0);
        assert_eq!(parse_message(&p, 200), Err(StatusWord::MessageUnexpected));
    }

    #[test]
    fn path_checks() {
        let ok = Bip32Path::address(0, 0, 3);
        assert!(check_path(&ok).is_ok());
        assert!(check_path(&Bip32Path::new(&[PURPOSE, COIN_TYPE]).unwrap()).is_ok());

        let cases: [(&[u32], StatusWord); 5] = [
            (&[PURPOSE], StatusWord::WrongBip32PathLen),
            (&[PURPOSE, COIN_TYPE, HARDENED, 0, 0, 0], StatusWord::WrongBip32PathLen),
            (&[HARDENED | 49, COIN_TYPE], StatusWord::WrongBip32Purpose),
            (&[PURPOSE, HARDENED], StatusWord::WrongBip32CoinType),
            (&[PURPOSE, COIN_TYPE, HARDENED, 2], StatusWord::WrongBip32Type),
        ];

        for (p, e) in cases {
            assert_eq!(check_path(&Bip32Path::new(p).unwrap()), Err(e));
        }
    }
}
