// Copyright (c) 2023 The Kaspa Ledger Developers

//! Public key derivation tests

use std::future::Future;

use log::info;

use ledger_kaspa::{apdu::path::Bip32Path, Approval, DeviceHandle, Exchange, HandleConfig};

/// Fetch public keys for `n` receive addresses, checking derivation is
/// stable and that the displayed key matches the silent one
pub async fn test<T, F>(t: T, approve: impl Fn() -> F, n: u32) -> anyhow::Result<()>
where
    T: Exchange,
    F: Future<Output = ()>,
{
    anyhow::ensure!(n > 0, "at least one key required");

    let d = DeviceHandle::new(t, HandleConfig::default());

    let mut keys = Vec::with_capacity(n as usize);

    for i in 0..n {
        let path = Bip32Path::address(0, 0, i);

        let k = d.public_key(&path).await?;
        info!("{path}: {}", hex::encode(k.compressed()));

        // Derivation must be deterministic
        assert_eq!(d.public_key(&path).await?, k);

        // And unique per index
        assert!(!keys.contains(&k.public_key));
        keys.push(k.public_key);
    }

    // Confirm the first key on-device
    let path = Bip32Path::address(0, 0, 0);
    let p = d.confirm_public_key(&path).await?;

    approve().await;

    match p.resolve().await? {
        Approval::Approved(k) => {
            info!("confirmed {path}: {}", hex::encode(k.compressed()));
            assert_eq!(Some(&k.public_key), keys.first());
        }
        Approval::Denied => anyhow::bail!("public key confirmation denied"),
    }

    Ok(())
}
