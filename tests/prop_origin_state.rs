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

use originchain::core::chain::repository::OriginChainRepo;
use originchain::core::security::signer::{Ed25519Signer, Signer};
use originchain::core::types::{ChainHash, HashKind};
use proptest::prelude::*;

fn signer() -> Arc<dyn Signer> {
    Arc::new(Ed25519Signer::generate().unwrap())
}

fn arb_hash() -> impl Strategy<Value = ChainHash> {
    any::<[u8; 32]>().prop_map(|b| ChainHash {
        kind: HashKind::Sha256,
        bytes: b.to_vec(),
    })
}

proptest! {
    /// N commits from genesis produce index N, with the last hash as head,
    /// regardless of interleaved reads and queued rotations.
    #[test]
    fn prop_index_counts_commits(
        hashes in prop::collection::vec(arb_hash(), 1..24),
        rotate_every in 1usize..6,
    ) {
        let repo = OriginChainRepo::open(vec![signer()], None).unwrap();

        for (n, hash) in hashes.iter().enumerate() {
            if n % rotate_every == 0 {
                repo.add_signer(signer());
            }
            let _ = repo.get_signers();
            repo.update_origin_chain_state(hash.clone()).unwrap();
            prop_assert_eq!(repo.get_index(), (n + 1) as u64);
            prop_assert!(repo.get_next_public_key().is_none());
        }

        let previous_hash = repo.get_previous_hash();
        prop_assert_eq!(previous_hash.as_ref(), hashes.last());
        // previous_hash is None iff index == 0, and we committed at least once.
        prop_assert!(repo.get_previous_hash().is_some());
    }

    /// The genesis signer is still in front after any rotation schedule.
    #[test]
    fn prop_genesis_signer_is_fixed(adds in 0usize..6, removes in 0usize..10) {
        let genesis = signer();
        let genesis_key = genesis.public_key();
        let repo = OriginChainRepo::open(vec![genesis], None).unwrap();

        for _ in 0..adds {
            repo.add_signer(signer());
            repo.update_origin_chain_state(ChainHash {
                kind: HashKind::Sha256,
                bytes: vec![7; 32],
            })
            .unwrap();
        }
        for _ in 0..removes {
            let _ = repo.remove_oldest_signer();
        }

        let current = repo.get_signers();
        prop_assert!(!current.is_empty());
        prop_assert_eq!(current[0].public_key(), genesis_key.clone());
        prop_assert_eq!(
            repo.get_genesis_signer().unwrap().public_key(),
            genesis_key
        );
    }
}
