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
use originchain::core::chain::repository::OriginChainRepo;
use originchain::core::chain::verifier::{ChainVerifier, Party};
use originchain::core::packer::{Framing, Packer};
use originchain::core::security::hasher::Sha256Provider;
use originchain::core::security::signer::{Ed25519Signer, Signer};
use originchain::core::types::{Item, Payload};
use originchain::monitoring::metrics::Metrics;
use originchain::networking::driver::DriverError;
use originchain::networking::handler::{
    BoundWitnessHandler, HandlerError, Role, StandardPayloadProvider,
};
use originchain::networking::pipe::{FramedPipe, Pipe, PipeError, DEFAULT_MAX_FRAME};

fn packer() -> Arc<Packer> {
    Arc::new(Packer::with_defaults().unwrap())
}

fn node(packer: &Arc<Packer>) -> (Arc<OriginChainRepo>, BoundWitnessHandler) {
    let signer: Arc<dyn Signer> = Arc::new(Ed25519Signer::generate().unwrap());
    let repo = Arc::new(OriginChainRepo::open(vec![signer], None).unwrap());
    let handler = BoundWitnessHandler::new(
        packer.clone(),
        repo.clone(),
        Arc::new(Sha256Provider),
        Arc::new(StandardPayloadProvider::with_heuristics(
            vec![Item::Rssi(-7)],
            Vec::new(),
        )),
        Arc::new(Metrics::new().unwrap()),
    );
    (repo, handler)
}

#[tokio::test]
async fn two_nodes_complete_an_encounter_over_a_pipe() {
    let p = packer();
    let (repo_a, handler_a) = node(&p);
    let (repo_b, handler_b) = node(&p);

    let (client, server) = tokio::io::duplex(64 * 1024);
    let responder = tokio::spawn(async move {
        handler_b
            .handle(FramedPipe::new(server, DEFAULT_MAX_FRAME), Role::Responder)
            .await
    });

    let block_a = handler_a
        .handle(FramedPipe::new(client, DEFAULT_MAX_FRAME), Role::Initiator)
        .await
        .unwrap();
    let block_b = responder.await.unwrap().unwrap();

    assert_eq!(block_a, block_b);
    assert_eq!(block_a.participants(), 2);

    // Both chains advanced to the same head.
    assert_eq!(repo_a.get_index(), 1);
    assert_eq!(repo_b.get_index(), 1);
    assert_eq!(repo_a.get_previous_hash(), repo_b.get_previous_hash());

    // The committed block verifies for either participant.
    let verifier = ChainVerifier::new(p, vec![Arc::new(Sha256Provider)]);
    let a_key = repo_a.get_genesis_signer().unwrap().public_key();
    let b_key = repo_b.get_genesis_signer().unwrap().public_key();
    assert!(verifier
        .verify(std::slice::from_ref(&block_a), &Party::GenesisKey(a_key))
        .is_valid);
    assert!(verifier
        .verify(std::slice::from_ref(&block_a), &Party::GenesisKey(b_key))
        .is_valid);
}

#[tokio::test]
async fn disconnect_before_closing_signatures_leaves_chain_untouched() {
    let p = packer();
    let (repo_b, handler_b) = node(&p);

    let (client, server) = tokio::io::duplex(64 * 1024);
    let responder = tokio::spawn(async move {
        handler_b
            .handle(FramedPipe::new(server, DEFAULT_MAX_FRAME), Role::Responder)
            .await
    });

    // Hand-drive the initiator far enough to receive the counter-offer,
    // then vanish instead of sending the closing signatures.
    let signer: Arc<dyn Signer> = Arc::new(Ed25519Signer::generate().unwrap());
    let mut assembler = ZigZagAssembler::new(
        p.clone(),
        vec![signer],
        Payload {
            signed: vec![Item::ChainIndex(0)],
            unsigned: Vec::new(),
        },
    );
    let t1 = assembler.incoming_data(None, false).unwrap();

    let mut pipe = FramedPipe::new(client, DEFAULT_MAX_FRAME);
    let mut first = vec![4u8, 0, 0, 0, 1];
    first.extend_from_slice(
        &p.serialize_item(&Item::Transfer(t1), Framing::Untyped).unwrap(),
    );
    let response = pipe.send(&first, true).await.unwrap().unwrap();
    assert!(!response.is_empty());
    drop(pipe);

    let err = responder.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        HandlerError::Driver(DriverError::Pipe(PipeError::Disconnected))
    ));
    assert_eq!(repo_b.get_index(), 0);
    assert!(repo_b.get_previous_hash().is_none());
}
