// Copyright (c) 2023 The Kaspa Ledger Developers

//! Application info tests

use log::info;

use ledger_kaspa::{DeviceHandle, Exchange, HandleConfig};

/// Expected application name
pub const APP_NAME: &str = "Kaspa";

/// Fetch application name and version via both the app and dashboard
/// queries, checking they agree
pub async fn test<T: Exchange>(t: T) -> anyhow::Result<()> {
    let d = DeviceHandle::new(t, HandleConfig::default());

    let version = d.version().await?;
    info!("version: {version}");

    let name = d.app_name().await?;
    info!("name: {name}");

    assert_eq!(name, APP_NAME);

    let a = d.app_and_version().await?;
    info!("app info: {a:?}");

    assert_eq!(a.name, name);
    assert_eq!(a.version, version.to_string());

    Ok(())
}
