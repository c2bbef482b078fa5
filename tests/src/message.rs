// Copyright (c) 2023 The Kaspa Ledger Developers

//! Personal message signing tests

use std::future::Future;

use log::info;

use ledger_kaspa::{
    crypto, Approval, DeviceHandle, Exchange, HandleConfig, MessageSignature, PersonalMessage,
};

/// Sign a personal message for the receive address at `address_index`
pub async fn test<T, F>(
    t: T,
    approve: impl Fn() -> F,
    message: &str,
    address_index: u32,
) -> anyhow::Result<MessageSignature>
where
    T: Exchange,
    F: Future<Output = ()>,
{
    let d = DeviceHandle::new(t, HandleConfig::default());

    let m = PersonalMessage::new(message, 0, address_index)?;
    let expected = crypto::message_hash(message.as_bytes())?;

    info!("Signing message '{message}' ({})", m.path());

    let p = d.sign_message(&m).await?;

    approve().await;

    // Hash and signature are checked on resolution
    let s = match p.resolve().await? {
        Approval::Approved(s) => s,
        Approval::Denied => anyhow::bail!("message signing denied"),
    };

    info!(
        "signature: {} (hash {})",
        hex::encode(&s.signature),
        hex::encode(s.message_hash)
    );

    assert_eq!(s.message_hash, expected);
    assert_eq!(s.signature.len(), 64);

    Ok(s)
}
