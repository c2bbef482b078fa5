// Copyright (c) 2023 The Kaspa Ledger Developers

//! In-process simulated device
//!
//! [SimDevice] wraps an [Engine] behind an async submit / receive pair,
//! responses to operations requiring approval are withheld until
//! [SimDevice::approve] or [SimDevice::deny] is called, or resolved
//! immediately under an automatic [ApprovalPolicy].

use std::sync::Arc;

use log::{debug, trace};
use tokio::sync::{Mutex, Notify};

use ledger_kaspa_apdu::status::StatusWord;

use crate::{Driver, Engine, EngineConfig, Error, Output, SeedDriver, State};

/// Handling of operations pending user approval
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, clap::ValueEnum, strum::Display)]
pub enum ApprovalPolicy {
    /// Wait for [SimDevice::approve] or [SimDevice::deny]
    #[default]
    Manual,
    /// Approve immediately
    Approve,
    /// Deny immediately
    Deny,
}

/// Simulated device handle, clones share the same engine
pub struct SimDevice<DRV: Driver> {
    inner: Arc<Inner<DRV>>,
}

struct Inner<DRV: Driver> {
    shared: Mutex<Shared<DRV>>,
    ready: Notify,
    policy: ApprovalPolicy,
}

struct Shared<DRV: Driver> {
    engine: Engine<DRV>,
    response: Option<Vec<u8>>,
}

impl<DRV: Driver> Clone for SimDevice<DRV> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Encode response data and status word
fn response(data: &[u8], status: StatusWord) -> Vec<u8> {
    let mut r = Vec::with_capacity(data.len() + 2);
    r.extend_from_slice(data);
    r.extend_from_slice(&(status as u16).to_be_bytes());
    r
}

fn resolved(r: Result<Vec<u8>, StatusWord>) -> Vec<u8> {
    match r {
        Ok(d) => response(&d, StatusWord::Ok),
        Err(s) => response(&[], s),
    }
}

impl SimDevice<SeedDriver> {
    /// Create a device seeded from a BIP39 mnemonic
    pub fn from_mnemonic(
        mnemonic: &str,
        config: EngineConfig,
        policy: ApprovalPolicy,
    ) -> Result<Self, Error> {
        let drv = SeedDriver::from_mnemonic(mnemonic, "")?;
        Ok(Self::new(Engine::new(drv, config), policy))
    }
}

impl<DRV: Driver> SimDevice<DRV> {
    /// Create a device from an [Engine] instance
    pub fn new(engine: Engine<DRV>, policy: ApprovalPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                shared: Mutex::new(Shared {
                    engine,
                    response: None,
                }),
                ready: Notify::new(),
                policy,
            }),
        }
    }

    /// Approval policy
    pub fn policy(&self) -> ApprovalPolicy {
        self.inner.policy
    }

    /// Submit a command frame
    pub async fn submit(&self, apdu: &[u8]) {
        trace!("submit: {:02x?}", apdu);

        let mut s = self.inner.shared.lock().await;

        let r = match s.engine.update(apdu) {
            Ok(Output::Data(d)) => Some(response(&d, StatusWord::Ok)),
            Err(e) => Some(response(&[], e)),
            Ok(Output::Pending) => match self.inner.policy {
                ApprovalPolicy::Manual => {
                    debug!("awaiting approval ({})", s.engine.state());
                    None
                }
                ApprovalPolicy::Approve => Some(resolved(s.engine.approve())),
                ApprovalPolicy::Deny => {
                    let _ = s.engine.deny();
                    Some(response(&[], StatusWord::Deny))
                }
            },
        };

        if let Some(r) = r {
            s.response = Some(r);
            self.inner.ready.notify_one();
        }
    }

    /// Await the next response (`data ‖ SW`)
    pub async fn receive(&self) -> Vec<u8> {
        loop {
            if let Some(r) = self.inner.shared.lock().await.response.take() {
                trace!("receive: {:02x?}", r);
                return r;
            }

            self.inner.ready.notified().await;
        }
    }

    /// Submit a command frame and await the response
    pub async fn exchange(&self, apdu: &[u8]) -> Vec<u8> {
        self.submit(apdu).await;
        self.receive().await
    }

    /// Approve the pending operation
    pub async fn approve(&self) -> Result<(), Error> {
        let mut s = self.inner.shared.lock().await;
        if !s.engine.is_pending() {
            return Err(Error::NotPending);
        }

        debug!("approving {}", s.engine.state());

        let r = resolved(s.engine.approve());
        s.response = Some(r);
        self.inner.ready.notify_one();

        Ok(())
    }

    /// Deny the pending operation
    pub async fn deny(&self) -> Result<(), Error> {
        let mut s = self.inner.shared.lock().await;

        debug!("denying {}", s.engine.state());

        s.engine.deny().map_err(|_| Error::NotPending)?;

        s.response = Some(response(&[], StatusWord::Deny));
        self.inner.ready.notify_one();

        Ok(())
    }

    /// Check whether an operation is awaiting approval
    pub async fn is_pending(&self) -> bool {
        self.inner.shared.lock().await.engine.is_pending()
    }

    /// Fetch engine state
    pub async fn state(&self) -> State {
        self.inner.shared.lock().await.engine.state()
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    const GET_VERSION: [u8; 5] = [0xe0, 0x03, 0x00, 0x00, 0x00];

    fn device(policy: ApprovalPolicy) -> SimDevice<SeedDriver> {
        SimDevice::new(Engine::new(SeedDriver::default(), EngineConfig::default()), policy)
    }

    fn message_apdu() -> Vec<u8> {
        let mut b = vec![0xe0, 0x07, 0x00, 0x00, 14, 0, 0, 0, 0, 0, 0x80, 0, 0, 0, 4];
        b.extend_from_slice(b"test");
        b
    }

    #[tokio::test]
    async fn exchange_immediate() {
        let d = device(ApprovalPolicy::Manual);

        assert_eq!(d.exchange(&GET_VERSION).await, vec![1, 1, 0, 0x90, 0x00]);
        assert_eq!(d.exchange(&[0xe0, 0x03, 0x01, 0x00, 0x00]).await, vec![0x6a, 0x86]);
    }

    #[tokio::test]
    async fn manual_approval() {
        let d = device(ApprovalPolicy::Manual);

        d.submit(&message_apdu()).await;
        assert!(d.is_pending().await);

        // Response withheld until approval
        let r = tokio::time::timeout(Duration::from_millis(50), d.receive()).await;
        assert!(r.is_err());

        d.approve().await.unwrap();

        let r = d.receive().await;
        assert_eq!(&r[r.len() - 2..], &[0x90, 0x00]);
        assert_eq!(r.len(), 1 + 64 + 1 + 32 + 2);

        assert!(matches!(d.approve().await, Err(Error::NotPending)));
    }

    #[tokio::test]
    async fn manual_denial() {
        let d = device(ApprovalPolicy::Manual);

        d.submit(&message_apdu()).await;

        let h = d.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            h.deny().await.unwrap();
        });

        assert_eq!(d.receive().await, vec![0x69, 0x85]);
        assert_eq!(d.state().await, State::Init);
    }

    #[tokio::test]
    async fn automatic_policies() {
        let d = device(ApprovalPolicy::Approve);
        let r = d.exchange(&message_apdu()).await;
        assert_eq!(&r[r.len() - 2..], &[0x90, 0x00]);

        let d = device(ApprovalPolicy::Deny);
        assert_eq!(d.exchange(&message_apdu()).await, vec![0x69, 0x85]);
    }
}
