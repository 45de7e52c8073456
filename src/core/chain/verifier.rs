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
#![warn(missing_docs)]

//! Origin-chain verifier: validates an ordered run of blocks belonging to
//! one participant against the linkage rules. Failures come back as a
//! structured report, never as an error through normal flow.

use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

use crate::core::boundwitness::{hash_bound_witness, signing_data};
use crate::core::packer::Packer;
use crate::core::security::hasher::HashProvider;
use crate::core::types::{BoundWitness, ChainHash, HashKind, Item, PublicKey};

/// Why a chain was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ChainFault {
    #[error("malformed block structure")]
    Structure,
    #[error("duplicate public key in block")]
    DuplicateKey,
    #[error("participant not present in block")]
    UnknownParty,
    #[error("missing chain index")]
    MissingIndex,
    #[error("wrong chain index")]
    WrongIndex,
    #[error("missing previous hash")]
    MissingPreviousHash,
    #[error("previous hash mismatch")]
    PreviousHashMismatch,
    #[error("unsupported hash algorithm")]
    UnsupportedHash,
    #[error("next public key commitment not honored")]
    NextKeyMismatch,
    #[error("invalid signature")]
    SignatureInvalid,
}

/// Verification outcome.
#[derive(Clone, Debug)]
pub struct ChainReport {
    /// Whether every supplied block passed.
    pub is_valid: bool,
    /// Position of the first failing block.
    pub first_invalid_index: Option<usize>,
    /// Why it failed.
    pub reason: Option<ChainFault>,
}

impl ChainReport {
    fn valid() -> Self {
        Self {
            is_valid: true,
            first_invalid_index: None,
            reason: None,
        }
    }

    fn invalid(index: usize, fault: ChainFault) -> Self {
        Self {
            is_valid: false,
            first_invalid_index: Some(index),
            reason: Some(fault),
        }
    }
}

/// How the caller identifies the participant whose chain is being checked.
#[derive(Clone, Debug)]
pub enum Party {
    /// Slot position within the earliest supplied block.
    Position(usize),
    /// A public key the participant holds in the earliest supplied block.
    GenesisKey(PublicKey),
}

/// Stateless verifier; shares the packer and hash providers across calls.
pub struct ChainVerifier {
    packer: Arc<Packer>,
    providers: Vec<Arc<dyn HashProvider>>,
}

impl ChainVerifier {
    /// New verifier over the given hash providers.
    pub fn new(packer: Arc<Packer>, providers: Vec<Arc<dyn HashProvider>>) -> Self {
        Self { packer, providers }
    }

    fn provider_for(&self, kind: HashKind) -> Option<&dyn HashProvider> {
        self.providers
            .iter()
            .find(|p| p.kind() == kind)
            .map(|p| p.as_ref())
    }

    /// Validate `blocks` as consecutive entries of one participant's chain.
    ///
    /// The expected index for the earliest block is the one it declares;
    /// continuity is then enforced strictly.
    pub fn verify(&self, blocks: &[BoundWitness], party: &Party) -> ChainReport {
        let mut expected_index: Option<u64> = None;
        let mut party_keys: Vec<PublicKey> = Vec::new();
        let mut committed_key: Option<PublicKey> = None;

        for (k, block) in blocks.iter().enumerate() {
            if let Err(fault) = check_shape(block) {
                return ChainReport::invalid(k, fault);
            }

            let slot = if k == 0 {
                match party {
                    Party::Position(i) if *i < block.key_sets.len() => *i,
                    Party::Position(_) => return ChainReport::invalid(k, ChainFault::UnknownParty),
                    Party::GenesisKey(pk) => {
                        match block
                            .key_sets
                            .iter()
                            .position(|ks| ks.iter().any(|key| key.ct_eq(pk)))
                        {
                            Some(i) => i,
                            None => return ChainReport::invalid(k, ChainFault::UnknownParty),
                        }
                    }
                }
            } else {
                match find_slot(block, &party_keys, committed_key.as_ref()) {
                    Some(i) => i,
                    None => {
                        let fault = if committed_key.is_some() {
                            ChainFault::NextKeyMismatch
                        } else {
                            ChainFault::UnknownParty
                        };
                        return ChainReport::invalid(k, fault);
                    }
                }
            };
            let signed = &block.payloads[slot].signed;

            let Some(index) = find_chain_index(signed) else {
                return ChainReport::invalid(k, ChainFault::MissingIndex);
            };
            if let Some(expected) = expected_index {
                if index != expected {
                    return ChainReport::invalid(k, ChainFault::WrongIndex);
                }
            }

            if k > 0 {
                let Some(prev_ref) = find_previous_hash(signed) else {
                    return ChainReport::invalid(k, ChainFault::MissingPreviousHash);
                };
                let Some(provider) = self.provider_for(prev_ref.kind) else {
                    return ChainReport::invalid(k, ChainFault::UnsupportedHash);
                };
                let prev_hash =
                    match hash_bound_witness(&self.packer, provider, &blocks[k - 1]) {
                        Ok(h) => h,
                        Err(_) => return ChainReport::invalid(k, ChainFault::Structure),
                    };
                if !prev_ref.ct_eq(&prev_hash) {
                    return ChainReport::invalid(k, ChainFault::PreviousHashMismatch);
                }

                if let Some(committed) = &committed_key {
                    if !block.key_sets[slot].iter().any(|key| key.ct_eq(committed)) {
                        return ChainReport::invalid(k, ChainFault::NextKeyMismatch);
                    }
                }
            }

            if let Err(fault) = self.check_signatures(block) {
                return ChainReport::invalid(k, fault);
            }

            expected_index = Some(index.wrapping_add(1));
            party_keys = block.key_sets[slot].clone();
            committed_key = find_next_key(signed).cloned();
        }

        ChainReport::valid()
    }

    fn check_signatures(&self, block: &BoundWitness) -> Result<(), ChainFault> {
        let bytes = signing_data(&self.packer, &block.key_sets, &block.payloads)
            .map_err(|_| ChainFault::Structure)?;
        for (keys, sigs) in block.key_sets.iter().zip(&block.signature_sets) {
            if keys.len() != sigs.len() {
                return Err(ChainFault::Structure);
            }
            for (key, sig) in keys.iter().zip(sigs) {
                if !key.verify(&bytes, sig) {
                    return Err(ChainFault::SignatureInvalid);
                }
            }
        }
        Ok(())
    }
}

fn check_shape(block: &BoundWitness) -> Result<(), ChainFault> {
    let n = block.key_sets.len();
    if n == 0 || block.payloads.len() != n || block.signature_sets.len() != n {
        return Err(ChainFault::Structure);
    }
    let mut seen: BTreeSet<&[u8]> = BTreeSet::new();
    for keys in &block.key_sets {
        if keys.is_empty() {
            return Err(ChainFault::Structure);
        }
        for key in keys {
            if !seen.insert(key.bytes.as_slice()) {
                return Err(ChainFault::DuplicateKey);
            }
        }
    }
    Ok(())
}

/// A participant carries over from the previous block either through a key
/// it already held or through the key it committed to.
fn find_slot(
    block: &BoundWitness,
    party_keys: &[PublicKey],
    committed: Option<&PublicKey>,
) -> Option<usize> {
    if let Some(p) = committed {
        if let Some(i) = block
            .key_sets
            .iter()
            .position(|ks| ks.iter().any(|key| key.ct_eq(p)))
        {
            return Some(i);
        }
    }
    block.key_sets.iter().position(|ks| {
        ks.iter()
            .any(|key| party_keys.iter().any(|held| held.ct_eq(key)))
    })
}

fn find_chain_index(items: &[Item]) -> Option<u64> {
    items.iter().find_map(|i| match i {
        Item::ChainIndex(v) => Some(*v),
        _ => None,
    })
}

fn find_previous_hash(items: &[Item]) -> Option<&ChainHash> {
    items.iter().find_map(|i| match i {
        Item::PreviousHash(h) => Some(h),
        _ => None,
    })
}

fn find_next_key(items: &[Item]) -> Option<&PublicKey> {
    items.iter().find_map(|i| match i {
        Item::NextPublicKey(k) => Some(k),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chain_is_trivially_valid() {
        let packer = Arc::new(Packer::with_defaults().unwrap());
        let verifier = ChainVerifier::new(
            packer,
            vec![Arc::new(crate::core::security::hasher::Sha256Provider)],
        );
        let report = verifier.verify(&[], &Party::Position(0));
        assert!(report.is_valid);
        assert!(report.first_invalid_index.is_none());
    }

    #[test]
    fn ragged_block_is_structural_fault() {
        let packer = Arc::new(Packer::with_defaults().unwrap());
        let verifier = ChainVerifier::new(
            packer,
            vec![Arc::new(crate::core::security::hasher::Sha256Provider)],
        );
        let block = BoundWitness {
            key_sets: vec![vec![PublicKey {
                kind: crate::core::types::KeyKind::Ed25519,
                bytes: vec![1; 32],
            }]],
            payloads: Vec::new(),
            signature_sets: Vec::new(),
        };
        let report = verifier.verify(&[block], &Party::Position(0));
        assert!(!report.is_valid);
        assert_eq!(report.first_invalid_index, Some(0));
        assert_eq!(report.reason, Some(ChainFault::Structure));
    }
}
