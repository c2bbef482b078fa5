// Copyright (c) 2023 The Kaspa Ledger Developers

//! Per-input signature collection

use std::time::Duration;

use encdec::DecodeOwned;
use log::{debug, warn};
use tokio::sync::OwnedMutexGuard;

use ledger_kaspa_apdu::{
    frame::Frame,
    tx::{SignatureScheme, TxNextSignatureReq, TxSignatureResp, SIGHASH_LEN},
    Continuation, Phase,
};

use super::{calc_sighash, Transaction};
use crate::{
    approval::Finish,
    crypto,
    transport::{request, Exchange},
    Error,
};

/// Verified signature for a transaction input
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputSignature {
    /// Index of the signed input
    pub input_index: u8,
    /// Signature scheme
    pub scheme: SignatureScheme,
    /// Signature bytes (64 byte schnorr or DER encoded ECDSA)
    pub signature: Vec<u8>,
    /// Recovery id / parity reported by the device
    pub recovery_id: u8,
    /// Signature hash
    pub sighash: [u8; SIGHASH_LEN],
}

/// Finish a signing exchange, starting the [SignatureStream]
pub struct TxSigning {
    pub(crate) tx: Transaction,
    pub(crate) keys: Vec<[u8; 33]>,
    pub(crate) request_timeout: Duration,
}

impl<T: Exchange> Finish<T> for TxSigning {
    type Output = SignatureStream<T>;

    fn finish(self, t: OwnedMutexGuard<T>, data: Vec<u8>) -> Result<Self::Output, Error> {
        let (first, _) = TxSignatureResp::decode_owned(&data)?;

        Ok(SignatureStream {
            t,
            seen: vec![false; self.tx.inputs().len()],
            tx: self.tx,
            keys: self.keys,
            pending: Some(first),
            received: 0,
            done: false,
            request_timeout: self.request_timeout,
        })
    }
}

/// Bounded sequence of per-input signatures
///
/// The first response arrives with the approval, each further call to
/// [next](SignatureStream::next) requests the next pending signature. At
/// most one response is pulled per input, and each is checked against the
/// locally computed sighash and input key before being returned.
///
/// The transport remains locked until the stream is dropped.
pub struct SignatureStream<T: Exchange> {
    t: OwnedMutexGuard<T>,
    tx: Transaction,
    keys: Vec<[u8; 33]>,
    pending: Option<TxSignatureResp>,
    seen: Vec<bool>,
    received: usize,
    done: bool,
    request_timeout: Duration,
}

impl<T: Exchange> SignatureStream<T> {
    /// Number of inputs to be signed
    pub fn expected(&self) -> usize {
        self.seen.len()
    }

    /// Number of verified signatures received
    pub fn received(&self) -> usize {
        self.received
    }

    /// Fetch the next signature, `None` once the device reports no more
    pub async fn next(&mut self) -> Option<Result<InputSignature, Error>> {
        if self.done {
            return None;
        }

        let r = match self.pending.take() {
            Some(r) => Ok(r),
            None => self.fetch().await,
        };

        let r = r.and_then(|r| self.check(r));
        if r.is_err() {
            self.done = true;
        }

        Some(r)
    }

    /// Collect every signature, sorted by input index
    pub async fn collect(mut self) -> Result<Vec<InputSignature>, Error> {
        let mut signatures = Vec::with_capacity(self.expected());

        while let Some(s) = self.next().await {
            signatures.push(s?);
        }

        if signatures.len() != self.expected() {
            return Err(Error::MissingSignatures {
                expected: self.expected(),
                received: signatures.len(),
            });
        }

        signatures.sort_by_key(|s| s.input_index);

        Ok(signatures)
    }

    async fn fetch(&mut self) -> Result<TxSignatureResp, Error> {
        if self.received >= self.expected() {
            warn!("Device signalled more than {} signatures", self.expected());
            return Err(Error::TooManySignatures(self.expected()));
        }

        debug!("Requesting next signature");

        let f = Frame::tagged(&TxNextSignatureReq, Phase::NextSignature, Continuation::Last)?;
        let data = request(&mut *self.t, &f, self.request_timeout).await?;

        let (r, _) = TxSignatureResp::decode_owned(&data)?;

        Ok(r)
    }

    fn check(&mut self, r: TxSignatureResp) -> Result<InputSignature, Error> {
        let i = r.input_index;
        let index = i as usize;

        match self.seen.get(index) {
            None => return Err(Error::UnexpectedInputIndex(i)),
            Some(true) => return Err(Error::DuplicateSignature(i)),
            Some(false) => (),
        }

        let sighash = calc_sighash(&self.tx, index, &self.keys[index], r.scheme)?;
        if sighash != r.sighash {
            warn!(
                "Sighash mismatch for input {i} (expected: {}, device: {})",
                hex::encode(sighash),
                hex::encode(r.sighash)
            );
            return Err(Error::SighashMismatch(i));
        }

        if crypto::verify(r.scheme, &self.keys[index], &r.signature, &sighash).is_err() {
            warn!("Signature verification failed for input {i}");
            return Err(Error::InvalidSignature(i));
        }

        debug!("Received signature for input {i} (more: {})", r.has_more);

        self.seen[index] = true;
        self.received += 1;
        self.done = !r.has_more;

        Ok(InputSignature {
            input_index: i,
            scheme: r.scheme,
            signature: r.signature.to_vec(),
            recovery_id: r.recovery_id,
            sighash,
        })
    }
}

#[cfg(test)]
mod test {
    use std::{collections::VecDeque, sync::Arc};

    use async_trait::async_trait;
    use encdec::Encode;
    use secp256k1::{Keypair, Message, PublicKey, Secp256k1, SecretKey};
    use tokio::sync::Mutex;

    use super::*;
    use crate::tx::test::test_tx;

    /// Transport replaying scripted responses
    #[derive(Default)]
    struct Scripted {
        responses: VecDeque<Vec<u8>>,
        sent: usize,
    }

    #[async_trait]
    impl Exchange for Scripted {
        async fn submit(&mut self, _apdu: &[u8]) -> Result<(), Error> {
            self.sent += 1;
            Ok(())
        }

        async fn receive(&mut self) -> Result<Vec<u8>, Error> {
            self.responses.pop_front().ok_or(Error::UnexpectedResponse)
        }
    }

    fn secret(i: usize) -> SecretKey {
        SecretKey::from_slice(&[i as u8 + 1; 32]).unwrap()
    }

    fn keyed_tx(n: usize) -> (Transaction, Vec<[u8; 33]>) {
        let secp = Secp256k1::new();
        let keys = (0..n)
            .map(|i| PublicKey::from_secret_key(&secp, &secret(i)).serialize())
            .collect();
        (test_tx(n, 1), keys)
    }

    fn sign(tx: &Transaction, keys: &[[u8; 33]], i: usize, has_more: bool) -> TxSignatureResp {
        let secp = Secp256k1::new();
        let kp = Keypair::from_secret_key(&secp, &secret(i));

        let sighash = calc_sighash(tx, i, &keys[i], SignatureScheme::Schnorr).unwrap();
        let sig = secp.sign_schnorr_no_aux_rand(&Message::from_digest(sighash), &kp);

        TxSignatureResp {
            has_more,
            input_index: i as u8,
            scheme: SignatureScheme::Schnorr,
            signature: heapless::Vec::from_slice(&sig.serialize()).unwrap(),
            recovery_id: 0,
            sighash,
        }
    }

    fn encode_ok(r: &TxSignatureResp) -> Vec<u8> {
        let mut buff = vec![0u8; 256];
        let n = r.encode(&mut buff).unwrap();
        buff.truncate(n);
        buff.extend_from_slice(&[0x90, 0x00]);
        buff
    }

    async fn stream(
        tx: Transaction,
        keys: Vec<[u8; 33]>,
        first: TxSignatureResp,
        rest: &[TxSignatureResp],
    ) -> SignatureStream<Scripted> {
        let t = Scripted {
            responses: rest.iter().map(encode_ok).collect(),
            sent: 0,
        };
        let t = Arc::new(Mutex::new(t)).lock_owned().await;

        let mut data = vec![0u8; 256];
        let n = first.encode(&mut data).unwrap();
        data.truncate(n);

        let f = TxSigning {
            tx,
            keys,
            request_timeout: Duration::from_secs(1),
        };
        f.finish(t, data).unwrap()
    }

    #[tokio::test]
    async fn collect_out_of_order() {
        let (tx, keys) = keyed_tx(3);

        let first = sign(&tx, &keys, 2, true);
        let rest = [sign(&tx, &keys, 0, true), sign(&tx, &keys, 1, false)];

        let s = stream(tx, keys, first, &rest).await;
        let sigs = s.collect().await.unwrap();

        let indices: Vec<_> = sigs.iter().map(|s| s.input_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn stream_bounded() {
        let (tx, keys) = keyed_tx(2);

        // Device keeps signalling more after every input is signed
        let first = sign(&tx, &keys, 0, true);
        let rest = [sign(&tx, &keys, 1, true), sign(&tx, &keys, 1, true)];

        let mut s = stream(tx, keys, first, &rest).await;
        assert!(s.next().await.unwrap().is_ok());
        assert!(s.next().await.unwrap().is_ok());
        assert!(matches!(
            s.next().await,
            Some(Err(Error::TooManySignatures(2)))
        ));
        assert!(s.next().await.is_none());

        // Only one follow-up request per remaining input
        assert_eq!(s.t.sent, 1);
    }

    #[tokio::test]
    async fn stream_duplicate() {
        let (tx, keys) = keyed_tx(2);

        let first = sign(&tx, &keys, 0, true);
        let rest = [sign(&tx, &keys, 0, false)];

        let s = stream(tx, keys, first, &rest).await;
        assert!(matches!(
            s.collect().await,
            Err(Error::DuplicateSignature(0))
        ));
    }

    #[tokio::test]
    async fn stream_missing() {
        let (tx, keys) = keyed_tx(2);

        let first = sign(&tx, &keys, 1, false);

        let s = stream(tx, keys, first, &[]).await;
        assert!(matches!(
            s.collect().await,
            Err(Error::MissingSignatures {
                expected: 2,
                received: 1
            })
        ));
    }

    #[tokio::test]
    async fn stream_unexpected_index() {
        let (tx, keys) = keyed_tx(1);

        let mut first = sign(&tx, &keys, 0, false);
        first.input_index = 4;

        let mut s = stream(tx, keys, first, &[]).await;
        assert!(matches!(
            s.next().await,
            Some(Err(Error::UnexpectedInputIndex(4)))
        ));
    }

    #[tokio::test]
    async fn stream_sighash_mismatch() {
        let (tx, keys) = keyed_tx(1);

        let mut first = sign(&tx, &keys, 0, false);
        first.sighash[0] ^= 0xff;

        let mut s = stream(tx, keys, first, &[]).await;
        assert!(matches!(
            s.next().await,
            Some(Err(Error::SighashMismatch(0)))
        ));
    }

    #[tokio::test]
    async fn stream_invalid_signature() {
        let (tx, keys) = keyed_tx(2);

        // Signed with the key for input 1
        let mut first = sign(&tx, &keys, 1, false);
        first.input_index = 0;
        first.sighash = calc_sighash(&tx, 0, &keys[0], SignatureScheme::Schnorr).unwrap();

        let mut s = stream(tx, keys, first, &[]).await;
        assert!(matches!(
            s.next().await,
            Some(Err(Error::InvalidSignature(0)))
        ));
    }
}
