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

//! Bound witness assembly and canonical signing bytes.

pub mod assembler;
pub mod extractor;

use crate::core::packer::{Framing, PackError, Packer};
use crate::core::security::hasher::HashProvider;
use crate::core::types::{BoundWitness, ChainHash, Item, Payload, PublicKey};

/// Canonical bytes covered by every signature of a block: the key sets in
/// participant order, then each participant's signed heuristics, all as
/// untyped arrays. Both peers must produce identical bytes.
pub fn signing_data(
    packer: &Packer,
    key_sets: &[Vec<PublicKey>],
    payloads: &[Payload],
) -> Result<Vec<u8>, PackError> {
    let keys = Item::Array(key_sets.iter().cloned().map(Item::KeySet).collect());
    let mut out = packer.serialize_item(&keys, Framing::Untyped)?;
    for payload in payloads {
        out.extend_from_slice(
            &packer.serialize_item(&Item::Array(payload.signed.clone()), Framing::Untyped)?,
        );
    }
    Ok(out)
}

/// Hash of a block: the digest of its canonical signing data. Stable under
/// signature encoding and independent of unsigned metadata.
pub fn hash_bound_witness(
    packer: &Packer,
    hasher: &dyn HashProvider,
    block: &BoundWitness,
) -> Result<ChainHash, PackError> {
    Ok(hasher.hash(&signing_data(packer, &block.key_sets, &block.payloads)?))
}
