use std::str::FromStr;

use async_trait::async_trait;
use log::{debug, LevelFilter};
use simplelog::SimpleLogger;

use ledger_kaspa::{DeviceHandle, Error, Exchange, HandleConfig};
use ledger_kaspa_sim::*;

/// [Exchange] adaptor for an in-process simulated device
#[allow(unused)]
pub struct SimTransport(pub SimDevice<SeedDriver>);

#[async_trait]
impl Exchange for SimTransport {
    async fn submit(&mut self, apdu: &[u8]) -> Result<(), Error> {
        self.0.submit(apdu).await;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Vec<u8>, Error> {
        Ok(self.0.receive().await)
    }
}

/// Setup logging from the `LOG_LEVEL` environment variable
pub fn setup_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());
}

// Setup simulated device and transport with the default mnemonic
#[allow(unused)]
pub fn setup(policy: ApprovalPolicy, config: EngineConfig) -> (SimDevice<SeedDriver>, SimTransport) {
    setup_logging();

    debug!("Starting simulator (policy: {policy}, order: {})", config.order);

    let s = SimDevice::new(Engine::new(SeedDriver::default(), config), policy);

    (s.clone(), SimTransport(s))
}

// Setup a manually approved device and wrap the transport in a handle
#[allow(unused)]
pub fn setup_handle(config: EngineConfig) -> (SimDevice<SeedDriver>, DeviceHandle<SimTransport>) {
    let (s, t) = setup(ApprovalPolicy::Manual, config);

    (s, DeviceHandle::new(t, HandleConfig::default()))
}

/// Approve the pending request
#[allow(unused)]
pub async fn approve(s: &SimDevice<SeedDriver>) {
    debug!("Sim: Approve");

    s.approve().await.unwrap();
}

/// Deny the pending request
#[allow(unused)]
pub async fn deny(s: &SimDevice<SeedDriver>) {
    debug!("Sim: Deny");

    s.deny().await.unwrap();
}
