// Copyright (c) 2026 Originchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! The zig-zag state machine: three `incoming_data` calls per peer assemble
//! one mutually signed block.
//!
//! The initiator calls with `end_point = false` throughout; the responder's
//! first call carries `end_point = true`. Any schema mismatch, list
//! disagreement, or signature failure poisons the machine; no partial block
//! is ever emitted, and a completed block is surrendered at most once.

use std::sync::Arc;
use thiserror::Error;

use crate::core::boundwitness::signing_data;
use crate::core::packer::{PackError, Packer};
use crate::core::security::signer::{Signer, SignerError};
use crate::core::types::{BoundWitness, Payload, PublicKey, Signature, Transfer};

/// Negotiation errors. All of them are terminal for the assembler.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// Protocol mismatch during assembly.
    #[error("negotiation aborted: {0}")]
    Aborted(&'static str),
    /// A counterparty signature failed to verify during integration.
    #[error("invalid signature during integration")]
    SignatureInvalid,
    /// Wire-format failure while computing signing bytes.
    #[error(transparent)]
    Codec(#[from] PackError),
    /// Local signer failure.
    #[error(transparent)]
    Signer(#[from] SignerError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Created,
    Offered,
    Signed,
    Done,
    Failed,
}

/// Two-party bound-witness assembler.
///
/// The data model admits N participants; this state machine deliberately
/// rejects any exchange that would produce more than two.
pub struct ZigZagAssembler {
    packer: Arc<Packer>,
    signers: Vec<Arc<dyn Signer>>,
    payload: Payload,
    key_sets: Vec<Vec<PublicKey>>,
    payloads: Vec<Payload>,
    signature_sets: Vec<Option<Vec<Signature>>>,
    local_slot: Option<usize>,
    signing_bytes: Option<Vec<u8>>,
    phase: Phase,
    completed: Option<BoundWitness>,
}

impl ZigZagAssembler {
    /// New assembler for one exchange.
    pub fn new(packer: Arc<Packer>, signers: Vec<Arc<dyn Signer>>, payload: Payload) -> Self {
        Self {
            packer,
            signers,
            payload,
            key_sets: Vec::new(),
            payloads: Vec::new(),
            signature_sets: Vec::new(),
            local_slot: None,
            signing_bytes: None,
            phase: Phase::Created,
            completed: None,
        }
    }

    /// Advance the exchange with the counterparty's transfer (or `None` to
    /// open it) and return the transfer to send back.
    pub fn incoming_data(
        &mut self,
        transfer: Option<Transfer>,
        end_point: bool,
    ) -> Result<Transfer, NegotiationError> {
        match self.step(transfer, end_point) {
            Ok(t) => Ok(t),
            Err(e) => {
                self.phase = Phase::Failed;
                self.completed = None;
                Err(e)
            }
        }
    }

    /// Whether a completed block has been assembled.
    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Surrender the completed block. Yields at most once.
    pub fn take_completed(&mut self) -> Option<BoundWitness> {
        self.completed.take()
    }

    fn step(
        &mut self,
        transfer: Option<Transfer>,
        end_point: bool,
    ) -> Result<Transfer, NegotiationError> {
        match self.phase {
            Phase::Created => {
                if end_point {
                    let t = transfer
                        .ok_or(NegotiationError::Aborted("responder needs an opening offer"))?;
                    if !t.signature_sets.is_empty() {
                        return Err(NegotiationError::Aborted("premature signatures"));
                    }
                    self.integrate_offer(&t)?;
                    self.append_local()?;
                    self.ensure_two_party()?;
                    let bytes = self.compute_signing_bytes()?;
                    let own = self.sign_local(&bytes)?;
                    self.phase = Phase::Signed;
                    Ok(Transfer {
                        key_sets: vec![self.local_keys()],
                        payloads: vec![self.payload.clone()],
                        signature_sets: vec![own],
                    })
                } else {
                    if transfer.is_some() {
                        return Err(NegotiationError::Aborted("initiator opens the exchange"));
                    }
                    self.append_local()?;
                    self.phase = Phase::Offered;
                    Ok(Transfer {
                        key_sets: vec![self.local_keys()],
                        payloads: vec![self.payload.clone()],
                        signature_sets: Vec::new(),
                    })
                }
            }
            Phase::Offered => {
                let t = transfer
                    .ok_or(NegotiationError::Aborted("missing counterparty transfer"))?;
                self.integrate_offer(&t)?;
                self.ensure_two_party()?;
                let bytes = self.compute_signing_bytes()?;
                self.integrate_signatures(&t, &bytes)?;
                let own = self.sign_local(&bytes)?;
                self.assemble()?;
                self.phase = Phase::Done;
                Ok(Transfer {
                    key_sets: Vec::new(),
                    payloads: Vec::new(),
                    signature_sets: vec![own],
                })
            }
            Phase::Signed => {
                let t = transfer
                    .ok_or(NegotiationError::Aborted("missing closing signatures"))?;
                if !t.key_sets.is_empty() || !t.payloads.is_empty() {
                    return Err(NegotiationError::Aborted("late contribution"));
                }
                let bytes = self
                    .signing_bytes
                    .clone()
                    .ok_or(NegotiationError::Aborted("signing bytes not computed"))?;
                self.integrate_signatures(&t, &bytes)?;
                self.assemble()?;
                self.phase = Phase::Done;
                Ok(Transfer::default())
            }
            Phase::Done | Phase::Failed => {
                Err(NegotiationError::Aborted("exchange already finished"))
            }
        }
    }

    fn local_keys(&self) -> Vec<PublicKey> {
        self.signers.iter().map(|s| s.public_key()).collect()
    }

    fn check_new_keys(&self, keys: &[PublicKey]) -> Result<(), NegotiationError> {
        for (i, key) in keys.iter().enumerate() {
            let dup_within = keys[..i].iter().any(|k| k == key);
            let dup_existing = self
                .key_sets
                .iter()
                .any(|ks| ks.iter().any(|k| k == key));
            if dup_within || dup_existing {
                return Err(NegotiationError::Aborted("duplicate public key"));
            }
        }
        Ok(())
    }

    fn integrate_offer(&mut self, t: &Transfer) -> Result<(), NegotiationError> {
        if t.key_sets.len() != t.payloads.len() {
            return Err(NegotiationError::Aborted("ragged transfer lists"));
        }
        if t.key_sets.is_empty() {
            return Err(NegotiationError::Aborted("empty counterparty offer"));
        }
        for (keys, payload) in t.key_sets.iter().zip(&t.payloads) {
            if keys.is_empty() {
                return Err(NegotiationError::Aborted("participant without keys"));
            }
            self.check_new_keys(keys)?;
            self.key_sets.push(keys.clone());
            self.payloads.push(payload.clone());
            self.signature_sets.push(None);
        }
        Ok(())
    }

    fn append_local(&mut self) -> Result<(), NegotiationError> {
        if self.signers.is_empty() {
            return Err(NegotiationError::Aborted("no local signers"));
        }
        let keys = self.local_keys();
        self.check_new_keys(&keys)?;
        self.local_slot = Some(self.key_sets.len());
        self.key_sets.push(keys);
        self.payloads.push(self.payload.clone());
        self.signature_sets.push(None);
        Ok(())
    }

    fn ensure_two_party(&self) -> Result<(), NegotiationError> {
        if self.key_sets.len() != 2 {
            return Err(NegotiationError::Aborted("exactly two participants"));
        }
        Ok(())
    }

    fn compute_signing_bytes(&mut self) -> Result<Vec<u8>, NegotiationError> {
        let bytes = signing_data(&self.packer, &self.key_sets, &self.payloads)?;
        self.signing_bytes = Some(bytes.clone());
        Ok(bytes)
    }

    fn sign_local(&mut self, bytes: &[u8]) -> Result<Vec<Signature>, NegotiationError> {
        let slot = self
            .local_slot
            .ok_or(NegotiationError::Aborted("local party not appended"))?;
        let mut sigs = Vec::with_capacity(self.signers.len());
        for signer in &self.signers {
            sigs.push(signer.sign(bytes)?);
        }
        self.signature_sets[slot] = Some(sigs.clone());
        Ok(sigs)
    }

    /// Assign the counterparty's signature sets to the open slots in order,
    /// verifying each signature against the canonical bytes.
    fn integrate_signatures(
        &mut self,
        t: &Transfer,
        bytes: &[u8],
    ) -> Result<(), NegotiationError> {
        let mut incoming = t.signature_sets.iter();
        for slot in 0..self.key_sets.len() {
            if Some(slot) == self.local_slot || self.signature_sets[slot].is_some() {
                continue;
            }
            let sigs = incoming
                .next()
                .ok_or(NegotiationError::Aborted("missing signatures"))?;
            let keys = &self.key_sets[slot];
            if keys.len() != sigs.len() {
                return Err(NegotiationError::Aborted("signature count mismatch"));
            }
            for (key, sig) in keys.iter().zip(sigs) {
                if !key.verify(bytes, sig) {
                    return Err(NegotiationError::SignatureInvalid);
                }
            }
            self.signature_sets[slot] = Some(sigs.clone());
        }
        if incoming.next().is_some() {
            return Err(NegotiationError::Aborted("surplus signatures"));
        }
        Ok(())
    }

    fn assemble(&mut self) -> Result<(), NegotiationError> {
        let mut signature_sets = Vec::with_capacity(self.signature_sets.len());
        for slot in &self.signature_sets {
            signature_sets.push(
                slot.clone()
                    .ok_or(NegotiationError::Aborted("unsigned participant"))?,
            );
        }
        self.completed = Some(BoundWitness {
            key_sets: self.key_sets.clone(),
            payloads: self.payloads.clone(),
            signature_sets,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::security::signer::Ed25519Signer;
    use crate::core::types::Item;

    fn packer() -> Arc<Packer> {
        Arc::new(Packer::with_defaults().unwrap())
    }

    fn signer() -> Arc<dyn Signer> {
        Arc::new(Ed25519Signer::generate().unwrap())
    }

    fn payload(rssi: i8) -> Payload {
        Payload {
            signed: vec![Item::ChainIndex(0), Item::Rssi(rssi)],
            unsigned: Vec::new(),
        }
    }

    /// Run a complete two-party exchange in memory.
    fn exchange(
        a: &mut ZigZagAssembler,
        b: &mut ZigZagAssembler,
    ) -> Result<(BoundWitness, BoundWitness), NegotiationError> {
        let t1 = a.incoming_data(None, false)?;
        let t2 = b.incoming_data(Some(t1), true)?;
        let t3 = a.incoming_data(Some(t2), false)?;
        let _ = b.incoming_data(Some(t3), false)?;
        Ok((a.take_completed().unwrap(), b.take_completed().unwrap()))
    }

    #[test]
    fn both_sides_assemble_the_same_block() {
        let p = packer();
        let mut a = ZigZagAssembler::new(p.clone(), vec![signer()], payload(-5));
        let mut b = ZigZagAssembler::new(p.clone(), vec![signer()], payload(-10));

        let (block_a, block_b) = exchange(&mut a, &mut b).unwrap();
        assert_eq!(block_a, block_b);
        assert_eq!(block_a.participants(), 2);

        let bytes = signing_data(&p, &block_a.key_sets, &block_a.payloads).unwrap();
        for (keys, sigs) in block_a.key_sets.iter().zip(&block_a.signature_sets) {
            for (key, sig) in keys.iter().zip(sigs) {
                assert!(key.verify(&bytes, sig));
            }
        }
    }

    #[test]
    fn completed_block_is_surrendered_once() {
        let p = packer();
        let mut a = ZigZagAssembler::new(p.clone(), vec![signer()], payload(-1));
        let mut b = ZigZagAssembler::new(p, vec![signer()], payload(-2));
        let _ = exchange(&mut a, &mut b).unwrap();
        assert!(a.take_completed().is_none());
    }

    #[test]
    fn duplicate_key_aborts() {
        let p = packer();
        let shared = signer();
        let mut a = ZigZagAssembler::new(p.clone(), vec![shared.clone()], payload(-1));
        let mut b = ZigZagAssembler::new(p, vec![shared], payload(-2));

        let t1 = a.incoming_data(None, false).unwrap();
        let err = b.incoming_data(Some(t1), true).unwrap_err();
        assert!(matches!(err, NegotiationError::Aborted(_)));
        // Machine is poisoned afterwards.
        assert!(b.incoming_data(None, false).is_err());
    }

    #[test]
    fn responder_without_offer_aborts() {
        let p = packer();
        let mut b = ZigZagAssembler::new(p, vec![signer()], payload(0));
        assert!(matches!(
            b.incoming_data(None, true),
            Err(NegotiationError::Aborted(_))
        ));
    }

    #[test]
    fn tampered_payload_fails_signature_check() {
        let p = packer();
        let mut a = ZigZagAssembler::new(p.clone(), vec![signer()], payload(-1));
        let mut b = ZigZagAssembler::new(p, vec![signer()], payload(-2));

        let t1 = a.incoming_data(None, false).unwrap();
        let mut t2 = b.incoming_data(Some(t1), true).unwrap();
        // Tamper with the responder's signed heuristics after it signed.
        t2.payloads[0].signed[0] = Item::ChainIndex(99);
        let err = a.incoming_data(Some(t2), false).unwrap_err();
        assert!(matches!(err, NegotiationError::SignatureInvalid));
        assert!(a.take_completed().is_none());
    }
}
