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

//! Deterministic protocol types and canonical encoding helpers.

use bincode::Options;
use ring::signature::{UnparsedPublicKey, ED25519};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Canonical serialization error (persisted snapshots only; the wire format
/// lives in `core::packer`).
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization")]
    Serialize,
    #[error("deserialization")]
    Deserialize,
    #[error("size limit exceeded")]
    TooLarge,
}

/// Canonical bincode options (deterministic).
fn bincode_opts() -> impl Options {
    // Fixint encoding provides a stable integer representation.
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Encode with deterministic rules.
pub fn encode_canonical<T: Serialize>(v: &T) -> Result<Vec<u8>, CodecError> {
    bincode_opts()
        .serialize(v)
        .map_err(|_| CodecError::Serialize)
}

/// Decode with a hard size cap.
pub fn decode_canonical_limited<T: DeserializeOwned>(
    bytes: &[u8],
    max: usize,
) -> Result<T, CodecError> {
    if bytes.len() > max {
        return Err(CodecError::TooLarge);
    }
    // Cap inside the deserializer as well to bound container allocations.
    bincode_opts()
        .with_limit(max as u64)
        .deserialize(bytes)
        .map_err(|_| CodecError::Deserialize)
}

/// Hash algorithm identifier carried by every digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HashKind {
    /// SHA-256 (32-byte digest).
    Sha256,
}

/// Opaque digest tagged by its algorithm. Equality is byte equality.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainHash {
    /// Algorithm that produced the digest.
    pub kind: HashKind,
    /// Digest bytes.
    pub bytes: Vec<u8>,
}

impl ChainHash {
    /// Constant-time equality for linkage checks.
    pub fn ct_eq(&self, other: &ChainHash) -> bool {
        self.kind == other.kind && bool::from(self.bytes.ct_eq(&other.bytes))
    }
}

/// Key algorithm identifier shared by public keys and signatures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    /// Ed25519 (32-byte keys, 64-byte signatures).
    Ed25519,
}

/// Typed public key bytes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey {
    /// Key algorithm.
    pub kind: KeyKind,
    /// Raw key bytes.
    pub bytes: Vec<u8>,
}

impl PublicKey {
    /// Verify `sig` over `msg`. Malformed keys or signatures verify as false.
    pub fn verify(&self, msg: &[u8], sig: &Signature) -> bool {
        match self.kind {
            KeyKind::Ed25519 => {
                if self.bytes.len() != 32 || sig.kind != KeyKind::Ed25519 || sig.bytes.len() != 64 {
                    return false;
                }
                let pk = UnparsedPublicKey::new(&ED25519, &self.bytes);
                pk.verify(msg, &sig.bytes).is_ok()
            }
        }
    }

    /// Constant-time equality for next-public-key commitments.
    pub fn ct_eq(&self, other: &PublicKey) -> bool {
        self.kind == other.kind && bool::from(self.bytes.ct_eq(&other.bytes))
    }
}

/// Typed signature bytes produced by a signer.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Signature {
    /// Key algorithm.
    pub kind: KeyKind,
    /// Raw signature bytes.
    pub bytes: Vec<u8>,
}

/// A protocol value, tagged by its wire type.
///
/// The discriminant maps one-to-one onto a `(major, minor)` pair; parsing
/// dispatches through the packer registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    /// Mixed-type collection of typed children.
    Array(Vec<Item>),
    /// Signed RSSI heuristic.
    Rssi(i8),
    /// Position of the block in the producing peer's origin chain.
    ChainIndex(u64),
    /// Hash of the previous block in the producing peer's origin chain.
    PreviousHash(ChainHash),
    /// Commitment that the next block will be signed by this key.
    NextPublicKey(PublicKey),
    /// Bare digest.
    Hash(ChainHash),
    /// Bare public key.
    Key(PublicKey),
    /// Bare signature.
    Sig(Signature),
    /// One participant's ordered public keys.
    KeySet(Vec<PublicKey>),
    /// One participant's ordered signatures.
    SignatureSet(Vec<Signature>),
    /// One participant's payload.
    Payload(Payload),
    /// A completed (or embedded, bridged) block.
    BoundWitness(BoundWitness),
    /// One leg of the zig-zag exchange.
    Transfer(Transfer),
}

/// One peer's contribution of heuristics to a block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payload {
    /// Heuristics covered by the signatures.
    pub signed: Vec<Item>,
    /// Metadata outside the signed envelope.
    pub unsigned: Vec<Item>,
}

/// A mutually signed block: parallel ordered lists, one slot per participant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoundWitness {
    /// `key_sets[i]` are participant i's public keys.
    pub key_sets: Vec<Vec<PublicKey>>,
    /// `payloads[i]` is participant i's payload.
    pub payloads: Vec<Payload>,
    /// `signature_sets[i]` are participant i's signatures, parallel to its keys.
    pub signature_sets: Vec<Vec<Signature>>,
}

impl BoundWitness {
    /// Number of participants.
    pub fn participants(&self) -> usize {
        self.key_sets.len()
    }
}

/// One message of the zig-zag exchange: the lists the other side has not
/// integrated yet. Lists grow monotonically over the exchange; empty means
/// "nothing new of that kind".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transfer {
    /// Key sets contributed by the sender.
    pub key_sets: Vec<Vec<PublicKey>>,
    /// Payloads contributed by the sender.
    pub payloads: Vec<Payload>,
    /// Signature sets contributed by the sender.
    pub signature_sets: Vec<Vec<Signature>>,
}

/// Node configuration root.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node settings.
    #[serde(default)]
    pub node: NodeSettings,
    /// Network settings.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Metrics settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node: NodeSettings::default(),
            network: NetworkConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

/// Node settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    /// Human-readable name.
    pub name: String,
    /// Data directory (db + keys).
    pub data_dir: String,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            name: "originchain".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

/// Network settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// TCP listen address, e.g. 0.0.0.0:4141.
    pub listen_addr: String,
    /// Peers to dial once at startup (initiator role).
    #[serde(default)]
    pub dial: Vec<String>,
    /// Maximum inbound frame size in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

fn default_max_frame_bytes() -> usize {
    1 << 20
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:4141".to_string(),
            dial: Vec::new(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

/// Metrics settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// HTTP listen address for /metrics; disabled when absent.
    #[serde(default)]
    pub listen_addr: Option<String>,
}
