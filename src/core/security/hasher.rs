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

//! Hash capability. Providers are stateless and freely shareable.

use ring::digest;

use crate::core::types::{ChainHash, HashKind};

/// A hash provider announces its algorithm and digests bytes.
pub trait HashProvider: Send + Sync {
    /// Algorithm identifier embedded in produced digests.
    fn kind(&self) -> HashKind;
    /// Digest `bytes`.
    fn hash(&self, bytes: &[u8]) -> ChainHash;
}

/// SHA-256 provider.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Provider;

impl HashProvider for Sha256Provider {
    fn kind(&self) -> HashKind {
        HashKind::Sha256
    }

    fn hash(&self, bytes: &[u8]) -> ChainHash {
        let d = digest::digest(&digest::SHA256, bytes);
        ChainHash {
            kind: HashKind::Sha256,
            bytes: d.as_ref().to_vec(),
        }
    }
}
