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

use originchain::core::packer::codecs::ids;
use originchain::core::packer::{Framing, Packer};
use originchain::core::types::{
    BoundWitness, ChainHash, HashKind, Item, KeyKind, Payload, PublicKey, Signature, Transfer,
};
use proptest::prelude::*;

fn arb_hash() -> impl Strategy<Value = ChainHash> {
    any::<[u8; 32]>().prop_map(|b| ChainHash {
        kind: HashKind::Sha256,
        bytes: b.to_vec(),
    })
}

fn arb_key() -> impl Strategy<Value = PublicKey> {
    any::<[u8; 32]>().prop_map(|b| PublicKey {
        kind: KeyKind::Ed25519,
        bytes: b.to_vec(),
    })
}

fn arb_sig() -> impl Strategy<Value = Signature> {
    prop::collection::vec(any::<u8>(), 64).prop_map(|b| Signature {
        kind: KeyKind::Ed25519,
        bytes: b,
    })
}

fn arb_leaf() -> impl Strategy<Value = Item> {
    prop_oneof![
        any::<i8>().prop_map(Item::Rssi),
        any::<u64>().prop_map(Item::ChainIndex),
        arb_hash().prop_map(Item::PreviousHash),
        arb_key().prop_map(Item::NextPublicKey),
        arb_hash().prop_map(Item::Hash),
        arb_key().prop_map(Item::Key),
        arb_sig().prop_map(Item::Sig),
        prop::collection::vec(arb_key(), 0..3).prop_map(Item::KeySet),
        prop::collection::vec(arb_sig(), 0..3).prop_map(Item::SignatureSet),
    ]
}

fn arb_payload() -> impl Strategy<Value = Payload> {
    (
        prop::collection::vec(arb_leaf(), 0..4),
        prop::collection::vec(arb_leaf(), 0..3),
    )
        .prop_map(|(signed, unsigned)| Payload { signed, unsigned })
}

fn arb_slot() -> impl Strategy<Value = (Vec<PublicKey>, Payload, Vec<Signature>)> {
    (
        prop::collection::vec(arb_key(), 0..3),
        arb_payload(),
        prop::collection::vec(arb_sig(), 0..3),
    )
}

fn arb_item() -> impl Strategy<Value = Item> {
    prop_oneof![
        arb_leaf(),
        prop::collection::vec(arb_leaf(), 0..4).prop_map(Item::Array),
        arb_payload().prop_map(Item::Payload),
        prop::collection::vec(arb_slot(), 0..3).prop_map(|slots| {
            let mut block = BoundWitness::default();
            for (keys, payload, sigs) in slots {
                block.key_sets.push(keys);
                block.payloads.push(payload);
                block.signature_sets.push(sigs);
            }
            Item::BoundWitness(block)
        }),
        (
            prop::collection::vec(prop::collection::vec(arb_key(), 0..3), 0..2),
            prop::collection::vec(arb_payload(), 0..2),
            prop::collection::vec(prop::collection::vec(arb_sig(), 0..3), 0..2),
        )
            .prop_map(|(key_sets, payloads, signature_sets)| {
                Item::Transfer(Transfer {
                    key_sets,
                    payloads,
                    signature_sets,
                })
            }),
    ]
}

proptest! {
    #[test]
    fn prop_typed_round_trip(item in arb_item()) {
        let packer = Packer::with_defaults().unwrap();
        let bytes = packer.serialize_item(&item, Framing::Typed).unwrap();
        let back = packer.deserialize(&bytes).unwrap();
        prop_assert_eq!(back, item);
    }

    #[test]
    fn prop_untyped_round_trip(item in arb_item()) {
        let packer = Packer::with_defaults().unwrap();
        let (major, minor) = originchain::core::packer::codecs::id_of(&item);
        let bytes = packer.serialize_item(&item, Framing::Untyped).unwrap();
        let back = packer
            .deserialize_known(major, minor, &bytes, Framing::Untyped)
            .unwrap();
        prop_assert_eq!(back, item);
    }

    #[test]
    fn prop_decoder_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let packer = Packer::with_defaults().unwrap();
        let _ = packer.deserialize(&bytes);
        let (major, minor) = ids::TRANSFER;
        let _ = packer.deserialize_known(major, minor, &bytes, Framing::Untyped);
    }

    #[test]
    fn prop_truncation_is_rejected(item in arb_item()) {
        let packer = Packer::with_defaults().unwrap();
        let bytes = packer.serialize_item(&item, Framing::Typed).unwrap();
        if bytes.len() > 2 {
            prop_assert!(packer.deserialize(&bytes[..bytes.len() - 1]).is_err());
        }
    }
}
