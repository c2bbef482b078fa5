// Copyright (c) 2023 The Kaspa Ledger Developers

//! Operations awaiting on-device approval
//!
//! Requests requiring user interaction are issued first, returning a
//! [PendingApproval] that holds the transport exclusively. Callers then
//! [resolve](PendingApproval::resolve) it to wait for the operator.

use std::time::Duration;

use log::debug;
use tokio::sync::OwnedMutexGuard;

use ledger_kaspa_apdu::status::StatusWord;

use crate::{
    transport::{split_response, Exchange},
    Error,
};

/// Outcome of an approval request
#[derive(Clone, Debug, PartialEq)]
pub enum Approval<T> {
    /// Approved by the user, carrying the operation result
    Approved(T),
    /// Rejected by the user
    Denied,
}

impl<T> Approval<T> {
    /// Check whether the request was approved
    pub fn is_approved(&self) -> bool {
        matches!(self, Approval::Approved(_))
    }

    /// Fetch the approved value, if any
    pub fn approved(self) -> Option<T> {
        match self {
            Approval::Approved(v) => Some(v),
            Approval::Denied => None,
        }
    }
}

/// Completion of an approved operation, consuming the response data
pub trait Finish<T: Exchange>: Send {
    type Output;

    /// Handle the approved response, the transport guard is released on
    /// return unless retained by the output
    fn finish(self, t: OwnedMutexGuard<T>, data: Vec<u8>) -> Result<Self::Output, Error>;
}

/// Finish by decoding the approved response
pub struct Decoded<R>(pub fn(&[u8]) -> Result<R, Error>);

impl<T: Exchange, R> Finish<T> for Decoded<R> {
    type Output = R;

    fn finish(self, _t: OwnedMutexGuard<T>, data: Vec<u8>) -> Result<R, Error> {
        (self.0)(&data)
    }
}

/// Request awaiting on-device approval
///
/// The final frame has been submitted, the transport stays locked until
/// this is resolved or dropped.
#[must_use]
pub struct PendingApproval<T: Exchange, F: Finish<T>> {
    t: OwnedMutexGuard<T>,
    user_timeout: Option<Duration>,
    finish: F,
}

impl<T: Exchange, F: Finish<T>> PendingApproval<T, F> {
    pub(crate) fn new(t: OwnedMutexGuard<T>, user_timeout: Option<Duration>, finish: F) -> Self {
        Self {
            t,
            user_timeout,
            finish,
        }
    }

    /// Wait for the user to approve or deny the request
    pub async fn resolve(mut self) -> Result<Approval<F::Output>, Error> {
        debug!("Awaiting user approval");

        let raw = match self.user_timeout {
            Some(d) => tokio::time::timeout(d, self.t.receive())
                .await
                .map_err(|_| Error::UserTimeout)??,
            None => self.t.receive().await?,
        };

        let (status, data) = split_response(&raw)?;

        match StatusWord::from_u16(status) {
            Some(StatusWord::Ok) => {
                debug!("Request approved");
                self.finish.finish(self.t, data).map(Approval::Approved)
            }
            Some(StatusWord::Deny) => {
                debug!("Request denied");
                Ok(Approval::Denied)
            }
            Some(s) => Err(Error::Status(s)),
            None => Err(Error::UnknownStatus(status)),
        }
    }
}
