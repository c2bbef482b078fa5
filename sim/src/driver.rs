// Copyright (c) 2023 The Kaspa Ledger Developers

//! Key derivation for the simulated device

use bip32::{ChildNumber, DerivationPath, XPrv};
use bip39::{Language, Mnemonic, Seed};
use secp256k1::SecretKey;
use zeroize::Zeroize;

use ledger_kaspa_apdu::public_key::CHAIN_CODE_LEN;

use crate::Error;

/// Mnemonic used by the simulator unless one is provided
/// (the well known speculos test mnemonic)
pub const DEFAULT_MNEMONIC: &str = "glory promote mansion idle axis finger extra february uncover one trip resource lawn turtle enact monster seven myth punch hobby comfort wild raise skin";

/// Derived secp256k1 key and chain code, erased on drop
pub struct DerivedKey {
    pub secret: SecretKey,
    pub chain_code: [u8; CHAIN_CODE_LEN],
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.secret.non_secure_erase();
        self.chain_code.zeroize();
    }
}

/// [`Driver`] trait provides key derivation for [`Engine`](crate::Engine) instances
pub trait Driver {
    /// BIP32 derivation for secp256k1 keys
    fn bip32_derive(&self, path: &[u32]) -> Result<DerivedKey, Error>;
}

impl<T: Driver> Driver for &T {
    fn bip32_derive(&self, path: &[u32]) -> Result<DerivedKey, Error> {
        T::bip32_derive(self, path)
    }
}

/// Seed backed [Driver]
pub struct SeedDriver {
    seed: [u8; 64],
}

impl SeedDriver {
    /// Create a driver from a BIP39 mnemonic and optional passphrase
    pub fn from_mnemonic(phrase: &str, passphrase: &str) -> Result<Self, Error> {
        let m = Mnemonic::from_phrase(phrase, Language::English)
            .map_err(|e| Error::Mnemonic(e.to_string()))?;

        let s = Seed::new(&m, passphrase);

        let mut seed = [0u8; 64];
        seed.copy_from_slice(s.as_bytes());

        Ok(Self { seed })
    }

    /// Create a driver from a raw 64 byte seed
    pub fn from_seed(seed: [u8; 64]) -> Self {
        Self { seed }
    }
}

impl Default for SeedDriver {
    fn default() -> Self {
        // The default mnemonic is a valid english phrase
        match Self::from_mnemonic(DEFAULT_MNEMONIC, "") {
            Ok(d) => d,
            Err(_) => Self::from_seed([0u8; 64]),
        }
    }
}

impl Drop for SeedDriver {
    fn drop(&mut self) {
        self.seed.zeroize();
    }
}

impl Driver for SeedDriver {
    fn bip32_derive(&self, path: &[u32]) -> Result<DerivedKey, Error> {
        let mut p = DerivationPath::default();
        for e in path {
            p.push(ChildNumber::from(*e));
        }

        let xprv = XPrv::derive_from_path(&self.seed, &p).map_err(|_| Error::Derivation)?;

        let mut k = xprv.to_bytes();
        let secret = SecretKey::from_slice(&k).map_err(|_| Error::Derivation);
        k.zeroize();

        Ok(DerivedKey {
            secret: secret?,
            chain_code: xprv.attrs().chain_code,
        })
    }
}

#[cfg(test)]
mod test {
    use secp256k1::{PublicKey, Secp256k1};

    use super::*;

    #[test]
    fn derive_deterministic() {
        let d = SeedDriver::default();
        let path = [0x8000_002c, 0x8001_b207, 0x8000_0000, 0, 0];

        let a = d.bip32_derive(&path).unwrap();
        let b = d.bip32_derive(&path).unwrap();
        assert_eq!(a.secret, b.secret);
        assert_eq!(a.chain_code, b.chain_code);

        let c = d.bip32_derive(&[0x8000_002c, 0x8001_b207, 0x8000_0000, 0, 1]).unwrap();
        assert_ne!(a.secret, c.secret);
    }

    #[test]
    fn mnemonic_seeds_differ() {
        let secp = Secp256k1::new();
        let path = [0x8000_002c, 0x8001_b207, 0x8000_0000, 0, 0];

        let a = SeedDriver::from_mnemonic(DEFAULT_MNEMONIC, "").unwrap();
        let b = SeedDriver::from_mnemonic(DEFAULT_MNEMONIC, "kaspa").unwrap();

        let ka = PublicKey::from_secret_key(&secp, &a.bip32_derive(&path).unwrap().secret);
        let kb = PublicKey::from_secret_key(&secp, &b.bip32_derive(&path).unwrap().secret);
        assert_ne!(ka, kb);

        assert!(SeedDriver::from_mnemonic("not a mnemonic", "").is_err());
    }
}
