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

//! Built-in codecs for every protocol entity.

use crate::core::packer::{Codec, Framing, PackError, Packer};
use crate::core::types::{
    BoundWitness, ChainHash, HashKind, Item, KeyKind, Payload, PublicKey, Signature, Transfer,
};

/// Wire identifiers for the built-in types.
pub mod ids {
    /// Mixed-type collection.
    pub const MULTI_ARRAY: (u8, u8) = (0x00, 0x01);
    /// Signed RSSI heuristic.
    pub const RSSI: (u8, u8) = (0x01, 0x01);
    /// Origin-chain index heuristic.
    pub const CHAIN_INDEX: (u8, u8) = (0x01, 0x02);
    /// Previous-hash heuristic.
    pub const PREVIOUS_HASH: (u8, u8) = (0x01, 0x03);
    /// Next-public-key commitment heuristic.
    pub const NEXT_PUBLIC_KEY: (u8, u8) = (0x01, 0x04);
    /// Completed block.
    pub const BOUND_WITNESS: (u8, u8) = (0x02, 0x01);
    /// One participant's public keys.
    pub const KEY_SET: (u8, u8) = (0x02, 0x02);
    /// One participant's signatures.
    pub const SIGNATURE_SET: (u8, u8) = (0x02, 0x03);
    /// One participant's payload.
    pub const PAYLOAD: (u8, u8) = (0x02, 0x04);
    /// One leg of the zig-zag exchange.
    pub const TRANSFER: (u8, u8) = (0x02, 0x05);
    /// SHA-256 digest.
    pub const SHA256_HASH: (u8, u8) = (0x03, 0x01);
    /// Ed25519 public key.
    pub const ED25519_PUBLIC_KEY: (u8, u8) = (0x04, 0x01);
    /// Ed25519 signature.
    pub const ED25519_SIGNATURE: (u8, u8) = (0x05, 0x01);
}

/// Canonical `(major, minor)` for an item.
pub fn id_of(item: &Item) -> (u8, u8) {
    match item {
        Item::Array(_) => ids::MULTI_ARRAY,
        Item::Rssi(_) => ids::RSSI,
        Item::ChainIndex(_) => ids::CHAIN_INDEX,
        Item::PreviousHash(_) => ids::PREVIOUS_HASH,
        Item::NextPublicKey(_) => ids::NEXT_PUBLIC_KEY,
        Item::BoundWitness(_) => ids::BOUND_WITNESS,
        Item::KeySet(_) => ids::KEY_SET,
        Item::SignatureSet(_) => ids::SIGNATURE_SET,
        Item::Payload(_) => ids::PAYLOAD,
        Item::Transfer(_) => ids::TRANSFER,
        Item::Hash(h) => match h.kind {
            HashKind::Sha256 => ids::SHA256_HASH,
        },
        Item::Key(k) => match k.kind {
            KeyKind::Ed25519 => ids::ED25519_PUBLIC_KEY,
        },
        Item::Sig(s) => match s.kind {
            KeyKind::Ed25519 => ids::ED25519_SIGNATURE,
        },
    }
}

/// Register every built-in codec. Startup only.
pub fn register_defaults(packer: &mut Packer) -> Result<(), PackError> {
    packer.register(Box::new(MultiArrayCodec))?;
    packer.register(Box::new(RssiCodec))?;
    packer.register(Box::new(ChainIndexCodec))?;
    packer.register(Box::new(PreviousHashCodec))?;
    packer.register(Box::new(NextPublicKeyCodec))?;
    packer.register(Box::new(BoundWitnessCodec))?;
    packer.register(Box::new(KeySetCodec))?;
    packer.register(Box::new(SignatureSetCodec))?;
    packer.register(Box::new(PayloadCodec))?;
    packer.register(Box::new(TransferCodec))?;
    packer.register(Box::new(Sha256HashCodec))?;
    packer.register(Box::new(Ed25519KeyCodec))?;
    packer.register(Box::new(Ed25519SignatureCodec))?;
    Ok(())
}

struct MultiArrayCodec;

impl Codec for MultiArrayCodec {
    fn name(&self) -> &'static str {
        "array"
    }
    fn id(&self) -> (u8, u8) {
        ids::MULTI_ARRAY
    }
    fn size_prefix_width(&self) -> usize {
        4
    }
    fn serialize(&self, item: &Item, packer: &Packer) -> Result<Vec<u8>, PackError> {
        let Item::Array(children) = item else {
            return Err(PackError::WrongItem);
        };
        let mut out = Vec::new();
        for child in children {
            out.extend_from_slice(&packer.serialize_item(child, Framing::Typed)?);
        }
        Ok(out)
    }
    fn deserialize(&self, bytes: &[u8], packer: &Packer) -> Result<Item, PackError> {
        let mut children = Vec::new();
        let mut off = 0usize;
        while off < bytes.len() {
            let (child, used) = packer.take_typed(&bytes[off..])?;
            children.push(child);
            off += used;
        }
        Ok(Item::Array(children))
    }
}

struct RssiCodec;

impl Codec for RssiCodec {
    fn name(&self) -> &'static str {
        "rssi"
    }
    fn id(&self) -> (u8, u8) {
        ids::RSSI
    }
    fn size_prefix_width(&self) -> usize {
        0
    }
    fn serialize(&self, item: &Item, _packer: &Packer) -> Result<Vec<u8>, PackError> {
        let Item::Rssi(v) = item else {
            return Err(PackError::WrongItem);
        };
        Ok(vec![*v as u8])
    }
    fn deserialize(&self, bytes: &[u8], _packer: &Packer) -> Result<Item, PackError> {
        if bytes.len() != 1 {
            return Err(PackError::Malformed("rssi length"));
        }
        Ok(Item::Rssi(bytes[0] as i8))
    }
    fn read_size(&self, _header: &[u8]) -> Result<usize, PackError> {
        Ok(1)
    }
}

struct ChainIndexCodec;

impl Codec for ChainIndexCodec {
    fn name(&self) -> &'static str {
        "chain-index"
    }
    fn id(&self) -> (u8, u8) {
        ids::CHAIN_INDEX
    }
    fn size_prefix_width(&self) -> usize {
        0
    }
    fn serialize(&self, item: &Item, _packer: &Packer) -> Result<Vec<u8>, PackError> {
        let Item::ChainIndex(v) = item else {
            return Err(PackError::WrongItem);
        };
        Ok(v.to_be_bytes().to_vec())
    }
    fn deserialize(&self, bytes: &[u8], _packer: &Packer) -> Result<Item, PackError> {
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| PackError::Malformed("chain index length"))?;
        Ok(Item::ChainIndex(u64::from_be_bytes(raw)))
    }
    fn read_size(&self, _header: &[u8]) -> Result<usize, PackError> {
        Ok(8)
    }
}

struct PreviousHashCodec;

impl Codec for PreviousHashCodec {
    fn name(&self) -> &'static str {
        "previous-hash"
    }
    fn id(&self) -> (u8, u8) {
        ids::PREVIOUS_HASH
    }
    fn size_prefix_width(&self) -> usize {
        1
    }
    fn serialize(&self, item: &Item, packer: &Packer) -> Result<Vec<u8>, PackError> {
        let Item::PreviousHash(h) = item else {
            return Err(PackError::WrongItem);
        };
        packer.serialize_item(&Item::Hash(h.clone()), Framing::Typed)
    }
    fn deserialize(&self, bytes: &[u8], packer: &Packer) -> Result<Item, PackError> {
        let (child, used) = packer.take_typed(bytes)?;
        if used != bytes.len() {
            return Err(PackError::Malformed("previous hash trailing bytes"));
        }
        let Item::Hash(h) = child else {
            return Err(PackError::Malformed("previous hash wraps a non-hash"));
        };
        Ok(Item::PreviousHash(h))
    }
}

struct NextPublicKeyCodec;

impl Codec for NextPublicKeyCodec {
    fn name(&self) -> &'static str {
        "next-public-key"
    }
    fn id(&self) -> (u8, u8) {
        ids::NEXT_PUBLIC_KEY
    }
    fn size_prefix_width(&self) -> usize {
        1
    }
    fn serialize(&self, item: &Item, packer: &Packer) -> Result<Vec<u8>, PackError> {
        let Item::NextPublicKey(k) = item else {
            return Err(PackError::WrongItem);
        };
        packer.serialize_item(&Item::Key(k.clone()), Framing::Typed)
    }
    fn deserialize(&self, bytes: &[u8], packer: &Packer) -> Result<Item, PackError> {
        let (child, used) = packer.take_typed(bytes)?;
        if used != bytes.len() {
            return Err(PackError::Malformed("next public key trailing bytes"));
        }
        let Item::Key(k) = child else {
            return Err(PackError::Malformed("next public key wraps a non-key"));
        };
        Ok(Item::NextPublicKey(k))
    }
}

struct KeySetCodec;

impl Codec for KeySetCodec {
    fn name(&self) -> &'static str {
        "key-set"
    }
    fn id(&self) -> (u8, u8) {
        ids::KEY_SET
    }
    fn size_prefix_width(&self) -> usize {
        2
    }
    fn serialize(&self, item: &Item, packer: &Packer) -> Result<Vec<u8>, PackError> {
        let Item::KeySet(keys) = item else {
            return Err(PackError::WrongItem);
        };
        let mut out = Vec::new();
        for key in keys {
            out.extend_from_slice(&packer.serialize_item(&Item::Key(key.clone()), Framing::Typed)?);
        }
        Ok(out)
    }
    fn deserialize(&self, bytes: &[u8], packer: &Packer) -> Result<Item, PackError> {
        let mut keys = Vec::new();
        let mut off = 0usize;
        while off < bytes.len() {
            let (child, used) = packer.take_typed(&bytes[off..])?;
            let Item::Key(k) = child else {
                return Err(PackError::Malformed("key set holds a non-key"));
            };
            keys.push(k);
            off += used;
        }
        Ok(Item::KeySet(keys))
    }
}

struct SignatureSetCodec;

impl Codec for SignatureSetCodec {
    fn name(&self) -> &'static str {
        "signature-set"
    }
    fn id(&self) -> (u8, u8) {
        ids::SIGNATURE_SET
    }
    fn size_prefix_width(&self) -> usize {
        2
    }
    fn serialize(&self, item: &Item, packer: &Packer) -> Result<Vec<u8>, PackError> {
        let Item::SignatureSet(sigs) = item else {
            return Err(PackError::WrongItem);
        };
        let mut out = Vec::new();
        for sig in sigs {
            out.extend_from_slice(&packer.serialize_item(&Item::Sig(sig.clone()), Framing::Typed)?);
        }
        Ok(out)
    }
    fn deserialize(&self, bytes: &[u8], packer: &Packer) -> Result<Item, PackError> {
        let mut sigs = Vec::new();
        let mut off = 0usize;
        while off < bytes.len() {
            let (child, used) = packer.take_typed(&bytes[off..])?;
            let Item::Sig(s) = child else {
                return Err(PackError::Malformed("signature set holds a non-signature"));
            };
            sigs.push(s);
            off += used;
        }
        Ok(Item::SignatureSet(sigs))
    }
}

struct PayloadCodec;

impl Codec for PayloadCodec {
    fn name(&self) -> &'static str {
        "payload"
    }
    fn id(&self) -> (u8, u8) {
        ids::PAYLOAD
    }
    fn size_prefix_width(&self) -> usize {
        4
    }
    fn serialize(&self, item: &Item, packer: &Packer) -> Result<Vec<u8>, PackError> {
        let Item::Payload(p) = item else {
            return Err(PackError::WrongItem);
        };
        let mut out =
            packer.serialize_item(&Item::Array(p.signed.clone()), Framing::Untyped)?;
        out.extend_from_slice(
            &packer.serialize_item(&Item::Array(p.unsigned.clone()), Framing::Untyped)?,
        );
        Ok(out)
    }
    fn deserialize(&self, bytes: &[u8], packer: &Packer) -> Result<Item, PackError> {
        let (maj, min) = ids::MULTI_ARRAY;
        let (signed, used) = packer.take_untyped(maj, min, bytes)?;
        let (unsigned, used2) = packer.take_untyped(maj, min, &bytes[used..])?;
        if used + used2 != bytes.len() {
            return Err(PackError::Malformed("payload trailing bytes"));
        }
        let (Item::Array(signed), Item::Array(unsigned)) = (signed, unsigned) else {
            return Err(PackError::Malformed("payload section is not an array"));
        };
        Ok(Item::Payload(Payload { signed, unsigned }))
    }
}

fn serialize_triple(
    packer: &Packer,
    key_sets: &[Vec<PublicKey>],
    payloads: &[Payload],
    signature_sets: &[Vec<Signature>],
) -> Result<Vec<u8>, PackError> {
    let keys = Item::Array(key_sets.iter().cloned().map(Item::KeySet).collect());
    let pays = Item::Array(payloads.iter().cloned().map(Item::Payload).collect());
    let sigs = Item::Array(
        signature_sets
            .iter()
            .cloned()
            .map(Item::SignatureSet)
            .collect(),
    );
    let mut out = packer.serialize_item(&keys, Framing::Untyped)?;
    out.extend_from_slice(&packer.serialize_item(&pays, Framing::Untyped)?);
    out.extend_from_slice(&packer.serialize_item(&sigs, Framing::Untyped)?);
    Ok(out)
}

type Triple = (Vec<Vec<PublicKey>>, Vec<Payload>, Vec<Vec<Signature>>);

fn deserialize_triple(packer: &Packer, bytes: &[u8]) -> Result<Triple, PackError> {
    let (maj, min) = ids::MULTI_ARRAY;
    let (keys, a) = packer.take_untyped(maj, min, bytes)?;
    let (pays, b) = packer.take_untyped(maj, min, &bytes[a..])?;
    let (sigs, c) = packer.take_untyped(maj, min, &bytes[a + b..])?;
    if a + b + c != bytes.len() {
        return Err(PackError::Malformed("block trailing bytes"));
    }
    let (Item::Array(keys), Item::Array(pays), Item::Array(sigs)) = (keys, pays, sigs) else {
        return Err(PackError::Malformed("block section is not an array"));
    };
    let key_sets = keys
        .into_iter()
        .map(|i| match i {
            Item::KeySet(ks) => Ok(ks),
            _ => Err(PackError::Malformed("expected a key set")),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let payloads = pays
        .into_iter()
        .map(|i| match i {
            Item::Payload(p) => Ok(p),
            _ => Err(PackError::Malformed("expected a payload")),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let signature_sets = sigs
        .into_iter()
        .map(|i| match i {
            Item::SignatureSet(ss) => Ok(ss),
            _ => Err(PackError::Malformed("expected a signature set")),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((key_sets, payloads, signature_sets))
}

struct BoundWitnessCodec;

impl Codec for BoundWitnessCodec {
    fn name(&self) -> &'static str {
        "bound-witness"
    }
    fn id(&self) -> (u8, u8) {
        ids::BOUND_WITNESS
    }
    fn size_prefix_width(&self) -> usize {
        4
    }
    fn serialize(&self, item: &Item, packer: &Packer) -> Result<Vec<u8>, PackError> {
        let Item::BoundWitness(bw) = item else {
            return Err(PackError::WrongItem);
        };
        serialize_triple(packer, &bw.key_sets, &bw.payloads, &bw.signature_sets)
    }
    fn deserialize(&self, bytes: &[u8], packer: &Packer) -> Result<Item, PackError> {
        let (key_sets, payloads, signature_sets) = deserialize_triple(packer, bytes)?;
        if key_sets.len() != payloads.len() || key_sets.len() != signature_sets.len() {
            return Err(PackError::Malformed("ragged block lists"));
        }
        Ok(Item::BoundWitness(BoundWitness {
            key_sets,
            payloads,
            signature_sets,
        }))
    }
}

struct TransferCodec;

impl Codec for TransferCodec {
    fn name(&self) -> &'static str {
        "transfer"
    }
    fn id(&self) -> (u8, u8) {
        ids::TRANSFER
    }
    fn size_prefix_width(&self) -> usize {
        4
    }
    fn serialize(&self, item: &Item, packer: &Packer) -> Result<Vec<u8>, PackError> {
        let Item::Transfer(t) = item else {
            return Err(PackError::WrongItem);
        };
        serialize_triple(packer, &t.key_sets, &t.payloads, &t.signature_sets)
    }
    fn deserialize(&self, bytes: &[u8], packer: &Packer) -> Result<Item, PackError> {
        let (key_sets, payloads, signature_sets) = deserialize_triple(packer, bytes)?;
        Ok(Item::Transfer(Transfer {
            key_sets,
            payloads,
            signature_sets,
        }))
    }
}

struct Sha256HashCodec;

impl Codec for Sha256HashCodec {
    fn name(&self) -> &'static str {
        "sha256"
    }
    fn id(&self) -> (u8, u8) {
        ids::SHA256_HASH
    }
    fn size_prefix_width(&self) -> usize {
        0
    }
    fn serialize(&self, item: &Item, _packer: &Packer) -> Result<Vec<u8>, PackError> {
        let Item::Hash(h) = item else {
            return Err(PackError::WrongItem);
        };
        if h.kind != HashKind::Sha256 || h.bytes.len() != 32 {
            return Err(PackError::WrongItem);
        }
        Ok(h.bytes.clone())
    }
    fn deserialize(&self, bytes: &[u8], _packer: &Packer) -> Result<Item, PackError> {
        if bytes.len() != 32 {
            return Err(PackError::Malformed("sha256 digest length"));
        }
        Ok(Item::Hash(ChainHash {
            kind: HashKind::Sha256,
            bytes: bytes.to_vec(),
        }))
    }
    fn read_size(&self, _header: &[u8]) -> Result<usize, PackError> {
        Ok(32)
    }
}

struct Ed25519KeyCodec;

impl Codec for Ed25519KeyCodec {
    fn name(&self) -> &'static str {
        "ed25519-public-key"
    }
    fn id(&self) -> (u8, u8) {
        ids::ED25519_PUBLIC_KEY
    }
    fn size_prefix_width(&self) -> usize {
        0
    }
    fn serialize(&self, item: &Item, _packer: &Packer) -> Result<Vec<u8>, PackError> {
        let Item::Key(k) = item else {
            return Err(PackError::WrongItem);
        };
        if k.kind != KeyKind::Ed25519 || k.bytes.len() != 32 {
            return Err(PackError::WrongItem);
        }
        Ok(k.bytes.clone())
    }
    fn deserialize(&self, bytes: &[u8], _packer: &Packer) -> Result<Item, PackError> {
        if bytes.len() != 32 {
            return Err(PackError::Malformed("ed25519 key length"));
        }
        Ok(Item::Key(PublicKey {
            kind: KeyKind::Ed25519,
            bytes: bytes.to_vec(),
        }))
    }
    fn read_size(&self, _header: &[u8]) -> Result<usize, PackError> {
        Ok(32)
    }
}

struct Ed25519SignatureCodec;

impl Codec for Ed25519SignatureCodec {
    fn name(&self) -> &'static str {
        "ed25519-signature"
    }
    fn id(&self) -> (u8, u8) {
        ids::ED25519_SIGNATURE
    }
    fn size_prefix_width(&self) -> usize {
        0
    }
    fn serialize(&self, item: &Item, _packer: &Packer) -> Result<Vec<u8>, PackError> {
        let Item::Sig(s) = item else {
            return Err(PackError::WrongItem);
        };
        if s.kind != KeyKind::Ed25519 || s.bytes.len() != 64 {
            return Err(PackError::WrongItem);
        }
        Ok(s.bytes.clone())
    }
    fn deserialize(&self, bytes: &[u8], _packer: &Packer) -> Result<Item, PackError> {
        if bytes.len() != 64 {
            return Err(PackError::Malformed("ed25519 signature length"));
        }
        Ok(Item::Sig(Signature {
            kind: KeyKind::Ed25519,
            bytes: bytes.to_vec(),
        }))
    }
    fn read_size(&self, _header: &[u8]) -> Result<usize, PackError> {
        Ok(64)
    }
}
