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

use std::sync::Arc;

use originchain::core::boundwitness::assembler::ZigZagAssembler;
use originchain::core::boundwitness::hash_bound_witness;
use originchain::core::chain::repository::OriginChainRepo;
use originchain::core::chain::verifier::{ChainFault, ChainVerifier, Party};
use originchain::core::packer::Packer;
use originchain::core::security::hasher::Sha256Provider;
use originchain::core::security::signer::{Ed25519Signer, Signer};
use originchain::core::types::{BoundWitness, ChainHash, Item, Payload, PublicKey};
use originchain::networking::handler::{PayloadProvider, StandardPayloadProvider};

fn packer() -> Arc<Packer> {
    Arc::new(Packer::with_defaults().unwrap())
}

fn signer() -> Arc<dyn Signer> {
    Arc::new(Ed25519Signer::generate().unwrap())
}

fn verifier(packer: &Arc<Packer>) -> ChainVerifier {
    ChainVerifier::new(packer.clone(), vec![Arc::new(Sha256Provider)])
}

/// Run a full in-memory zig-zag with explicit payloads.
fn raw_exchange(
    packer: &Arc<Packer>,
    signers_a: Vec<Arc<dyn Signer>>,
    payload_a: Payload,
    signers_b: Vec<Arc<dyn Signer>>,
    payload_b: Payload,
) -> BoundWitness {
    let mut a = ZigZagAssembler::new(packer.clone(), signers_a, payload_a);
    let mut b = ZigZagAssembler::new(packer.clone(), signers_b, payload_b);
    let t1 = a.incoming_data(None, false).unwrap();
    let t2 = b.incoming_data(Some(t1), true).unwrap();
    let t3 = a.incoming_data(Some(t2), false).unwrap();
    b.incoming_data(Some(t3), false).unwrap();
    let block_a = a.take_completed().unwrap();
    let block_b = b.take_completed().unwrap();
    assert_eq!(block_a, block_b);
    block_a
}

/// Exchange driven by repository snapshots, committing the block to both
/// repositories afterwards.
fn repo_exchange(
    packer: &Arc<Packer>,
    repo_a: &OriginChainRepo,
    repo_b: &OriginChainRepo,
    extra_a: Vec<Item>,
    extra_b: Vec<Item>,
) -> BoundWitness {
    let snap_a = repo_a.snapshot();
    let snap_b = repo_b.snapshot();
    let payload_a = StandardPayloadProvider::with_heuristics(extra_a, Vec::new()).payload(&snap_a);
    let payload_b = StandardPayloadProvider::with_heuristics(extra_b, Vec::new()).payload(&snap_b);
    let block = raw_exchange(
        packer,
        snap_a.signers.clone(),
        payload_a,
        snap_b.signers.clone(),
        payload_b,
    );
    let hash = hash_bound_witness(packer, &Sha256Provider, &block).unwrap();
    repo_a.update_origin_chain_state(hash.clone()).unwrap();
    repo_b.update_origin_chain_state(hash).unwrap();
    block
}

fn genesis_key(repo: &OriginChainRepo) -> PublicKey {
    repo.get_genesis_signer().unwrap().public_key()
}

#[test]
fn fresh_encounter_with_rssi_verifies() {
    let p = packer();
    let repo_a = OriginChainRepo::open(vec![signer()], None).unwrap();
    let repo_b = OriginChainRepo::open(vec![signer()], None).unwrap();

    let block = repo_exchange(
        &p,
        &repo_a,
        &repo_b,
        vec![Item::Rssi(-5)],
        vec![Item::Rssi(-10)],
    );

    let v = verifier(&p);
    let report = v.verify(std::slice::from_ref(&block), &Party::Position(0));
    assert!(report.is_valid);

    let report = v.verify(
        std::slice::from_ref(&block),
        &Party::GenesisKey(genesis_key(&repo_b)),
    );
    assert!(report.is_valid);
}

#[test]
fn participant_without_chain_index_is_rejected() {
    let p = packer();
    let a = signer();
    let b = signer();
    let b_key = b.public_key();

    // B contributes an empty signed-heuristics list.
    let payload_a = Payload {
        signed: vec![Item::ChainIndex(0), Item::Rssi(-5)],
        unsigned: Vec::new(),
    };
    let block = raw_exchange(&p, vec![a], payload_a, vec![b], Payload::default());

    let report = verifier(&p).verify(std::slice::from_ref(&block), &Party::GenesisKey(b_key));
    assert!(!report.is_valid);
    assert_eq!(report.first_invalid_index, Some(0));
    assert_eq!(report.reason, Some(ChainFault::MissingIndex));
}

#[test]
fn linked_blocks_verify_in_order_only() {
    let p = packer();
    let repo_a = OriginChainRepo::open(vec![signer()], None).unwrap();
    let a_key = genesis_key(&repo_a);

    let b1 = repo_exchange(
        &p,
        &repo_a,
        &OriginChainRepo::open(vec![signer()], None).unwrap(),
        vec![],
        vec![],
    );
    let b2 = repo_exchange(
        &p,
        &repo_a,
        &OriginChainRepo::open(vec![signer()], None).unwrap(),
        vec![],
        vec![],
    );

    let v = verifier(&p);
    let ordered = [b1.clone(), b2.clone()];
    assert!(v.verify(&ordered, &Party::GenesisKey(a_key.clone())).is_valid);

    let reversed = [b2, b1];
    let report = v.verify(&reversed, &Party::GenesisKey(a_key));
    assert!(!report.is_valid);
    assert_eq!(report.first_invalid_index, Some(1));
}

#[test]
fn skipped_chain_index_is_rejected() {
    let p = packer();
    let repo_a = OriginChainRepo::open(vec![signer()], None).unwrap();
    let a_key = genesis_key(&repo_a);

    let b1 = repo_exchange(
        &p,
        &repo_a,
        &OriginChainRepo::open(vec![signer()], None).unwrap(),
        vec![],
        vec![],
    );

    // Second block declares index 2 instead of 1, with valid linkage and
    // signatures otherwise.
    let prev = repo_a.get_previous_hash().unwrap();
    let payload_a = Payload {
        signed: vec![Item::ChainIndex(2), Item::PreviousHash(prev)],
        unsigned: Vec::new(),
    };
    let payload_b = Payload {
        signed: vec![Item::ChainIndex(0)],
        unsigned: Vec::new(),
    };
    let snap = repo_a.snapshot();
    let b2 = raw_exchange(&p, snap.signers, payload_a, vec![signer()], payload_b);

    let report = verifier(&p).verify(&[b1, b2], &Party::GenesisKey(a_key));
    assert!(!report.is_valid);
    assert_eq!(report.first_invalid_index, Some(1));
    assert_eq!(report.reason, Some(ChainFault::WrongIndex));
}

#[test]
fn next_key_commitment_must_be_honored() {
    let p = packer();
    let repo_a = OriginChainRepo::open(vec![signer()], None).unwrap();
    let a_key = genesis_key(&repo_a);

    // Queue a rotation: the first block commits to the new signer's key.
    let rotated = signer();
    repo_a.add_signer(rotated.clone());

    let b1 = repo_exchange(
        &p,
        &repo_a,
        &OriginChainRepo::open(vec![signer()], None).unwrap(),
        vec![],
        vec![],
    );
    assert!(b1.payloads[0]
        .signed
        .iter()
        .any(|i| matches!(i, Item::NextPublicKey(k) if *k == rotated.public_key())));

    // Honored: the rotated signer now co-signs the next block.
    let b2 = repo_exchange(
        &p,
        &repo_a,
        &OriginChainRepo::open(vec![signer()], None).unwrap(),
        vec![],
        vec![],
    );
    let v = verifier(&p);
    assert!(v
        .verify(&[b1.clone(), b2], &Party::GenesisKey(a_key.clone()))
        .is_valid);

    // Broken: a block with the right index and previous hash, produced by an
    // unrelated signer.
    let stranger = OriginChainRepo::open(vec![signer()], None).unwrap();
    let hash = hash_bound_witness(&p, &Sha256Provider, &b1).unwrap();
    stranger.update_origin_chain_state(hash).unwrap();
    let b2_forged = repo_exchange(
        &p,
        &stranger,
        &OriginChainRepo::open(vec![signer()], None).unwrap(),
        vec![],
        vec![],
    );

    let report = v.verify(&[b1, b2_forged], &Party::GenesisKey(a_key));
    assert!(!report.is_valid);
    assert_eq!(report.first_invalid_index, Some(1));
    assert_eq!(report.reason, Some(ChainFault::NextKeyMismatch));
}

#[test]
fn tampered_previous_hash_is_rejected() {
    let p = packer();
    let repo_a = OriginChainRepo::open(vec![signer()], None).unwrap();
    let a_key = genesis_key(&repo_a);

    let b1 = repo_exchange(
        &p,
        &repo_a,
        &OriginChainRepo::open(vec![signer()], None).unwrap(),
        vec![],
        vec![],
    );

    // Second block references a hash that is not hash(b1).
    let bogus = ChainHash {
        kind: originchain::core::types::HashKind::Sha256,
        bytes: vec![0u8; 32],
    };
    let payload_a = Payload {
        signed: vec![Item::ChainIndex(1), Item::PreviousHash(bogus)],
        unsigned: Vec::new(),
    };
    let snap = repo_a.snapshot();
    let b2 = raw_exchange(
        &p,
        snap.signers,
        payload_a,
        vec![signer()],
        Payload {
            signed: vec![Item::ChainIndex(0)],
            unsigned: Vec::new(),
        },
    );

    let report = verifier(&p).verify(&[b1, b2], &Party::GenesisKey(a_key));
    assert!(!report.is_valid);
    assert_eq!(report.first_invalid_index, Some(1));
    assert_eq!(report.reason, Some(ChainFault::PreviousHashMismatch));
}
