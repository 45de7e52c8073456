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

//! Self-describing binary format: a registry of codecs keyed by
//! `(major, minor)` plus the three wire framings.
//!
//! - **Raw**: payload bytes only (parent knows type and length).
//! - **Untyped**: big-endian size prefix of per-type width W, counting
//!   itself, then the payload. W = 0 means fixed-length.
//! - **Typed**: `major || minor` then the untyped form.
//!
//! All multi-byte integers are big-endian. Serialization is a pure function
//! of the value graph.

pub mod codecs;

use crate::core::types::Item;
use std::collections::BTreeMap;
use thiserror::Error;

/// Wire format errors.
#[derive(Debug, Error)]
pub enum PackError {
    #[error("unknown type {major:#04x}/{minor:#04x}")]
    UnknownType {
        /// Major type byte.
        major: u8,
        /// Minor type byte.
        minor: u8,
    },
    #[error("malformed value: {0}")]
    Malformed(&'static str),
    #[error("duplicate codec {major:#04x}/{minor:#04x}")]
    DuplicateCodec {
        /// Major type byte.
        major: u8,
        /// Minor type byte.
        minor: u8,
    },
    #[error("item kind does not match codec")]
    WrongItem,
    #[error("value too large for size prefix")]
    Oversize,
}

/// Framing selector for serialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    /// Payload bytes only.
    Raw,
    /// Size prefix + payload.
    Untyped,
    /// Type header + size prefix + payload.
    Typed,
}

/// One registered wire type.
///
/// `serialize` produces raw payload bytes; `deserialize` consumes exactly the
/// raw payload. Framing is applied and stripped by the packer.
pub trait Codec: Send + Sync {
    /// Debug name, unique within a packer.
    fn name(&self) -> &'static str;
    /// `(major, minor)` identifier.
    fn id(&self) -> (u8, u8);
    /// Size prefix width in bytes: 0 (fixed length), 1, 2, or 4.
    fn size_prefix_width(&self) -> usize;
    /// Encode `item` as raw payload bytes.
    fn serialize(&self, item: &Item, packer: &Packer) -> Result<Vec<u8>, PackError>;
    /// Decode from raw payload bytes.
    fn deserialize(&self, bytes: &[u8], packer: &Packer) -> Result<Item, PackError>;
    /// Untyped length of the value whose encoding starts at `header`:
    /// `W + payload_len` for prefixed types, the fixed payload length for
    /// W = 0 types (which ignore `header`).
    fn read_size(&self, header: &[u8]) -> Result<usize, PackError> {
        read_prefixed_size(self.size_prefix_width(), header)
    }
}

/// Parse a size prefix of `width` bytes. The encoded value counts itself.
pub fn read_prefixed_size(width: usize, header: &[u8]) -> Result<usize, PackError> {
    if header.len() < width {
        return Err(PackError::Malformed("short size prefix"));
    }
    let v = match width {
        1 => header[0] as usize,
        2 => u16::from_be_bytes([header[0], header[1]]) as usize,
        4 => u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize,
        _ => return Err(PackError::Malformed("unsupported size prefix width")),
    };
    if v < width {
        return Err(PackError::Malformed("size prefix smaller than itself"));
    }
    Ok(v)
}

fn write_size_prefix(width: usize, payload_len: usize) -> Result<Vec<u8>, PackError> {
    let total = payload_len
        .checked_add(width)
        .ok_or(PackError::Oversize)?;
    match width {
        1 => {
            let v = u8::try_from(total).map_err(|_| PackError::Oversize)?;
            Ok(vec![v])
        }
        2 => {
            let v = u16::try_from(total).map_err(|_| PackError::Oversize)?;
            Ok(v.to_be_bytes().to_vec())
        }
        4 => {
            let v = u32::try_from(total).map_err(|_| PackError::Oversize)?;
            Ok(v.to_be_bytes().to_vec())
        }
        _ => Err(PackError::Malformed("unsupported size prefix width")),
    }
}

/// Registry of codecs; read-only after startup registration and freely
/// shareable across sessions.
pub struct Packer {
    by_id: BTreeMap<(u8, u8), Box<dyn Codec>>,
    by_name: BTreeMap<&'static str, (u8, u8)>,
}

impl Packer {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            by_id: BTreeMap::new(),
            by_name: BTreeMap::new(),
        }
    }

    /// Registry with every built-in protocol codec.
    pub fn with_defaults() -> Result<Self, PackError> {
        let mut p = Self::new();
        codecs::register_defaults(&mut p)?;
        Ok(p)
    }

    /// Register a codec. Fails on a duplicate `(major, minor)`.
    pub fn register(&mut self, codec: Box<dyn Codec>) -> Result<(), PackError> {
        let (major, minor) = codec.id();
        if self.by_id.contains_key(&(major, minor)) {
            return Err(PackError::DuplicateCodec { major, minor });
        }
        self.by_name.insert(codec.name(), (major, minor));
        self.by_id.insert((major, minor), codec);
        Ok(())
    }

    /// Look up a codec by identifier.
    pub fn lookup(&self, major: u8, minor: u8) -> Result<&dyn Codec, PackError> {
        self.by_id
            .get(&(major, minor))
            .map(|c| c.as_ref())
            .ok_or(PackError::UnknownType { major, minor })
    }

    /// Look up a codec by debug name.
    pub fn lookup_by_name(&self, name: &str) -> Option<&dyn Codec> {
        self.by_name
            .get(name)
            .and_then(|id| self.by_id.get(id))
            .map(|c| c.as_ref())
    }

    /// Serialize `item` as the given type with the given framing.
    pub fn serialize(
        &self,
        item: &Item,
        major: u8,
        minor: u8,
        framing: Framing,
    ) -> Result<Vec<u8>, PackError> {
        let codec = self.lookup(major, minor)?;
        let payload = codec.serialize(item, self)?;
        let width = codec.size_prefix_width();
        match framing {
            Framing::Raw => Ok(payload),
            Framing::Untyped => {
                if width == 0 {
                    return Ok(payload);
                }
                let mut out = write_size_prefix(width, payload.len())?;
                out.extend_from_slice(&payload);
                Ok(out)
            }
            Framing::Typed => {
                let mut out = Vec::with_capacity(2 + width + payload.len());
                out.push(major);
                out.push(minor);
                if width > 0 {
                    out.extend_from_slice(&write_size_prefix(width, payload.len())?);
                }
                out.extend_from_slice(&payload);
                Ok(out)
            }
        }
    }

    /// Serialize `item` under its canonical `(major, minor)`.
    pub fn serialize_item(&self, item: &Item, framing: Framing) -> Result<Vec<u8>, PackError> {
        let (major, minor) = codecs::id_of(item);
        self.serialize(item, major, minor, framing)
    }

    /// Deserialize one typed value occupying the whole buffer.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Item, PackError> {
        if bytes.len() < 2 {
            return Err(PackError::Malformed("short type header"));
        }
        self.deserialize_known(bytes[0], bytes[1], &bytes[2..], Framing::Untyped)
    }

    /// Deserialize one value of a known type occupying the whole buffer.
    pub fn deserialize_known(
        &self,
        major: u8,
        minor: u8,
        bytes: &[u8],
        framing: Framing,
    ) -> Result<Item, PackError> {
        let codec = self.lookup(major, minor)?;
        match framing {
            Framing::Raw => codec.deserialize(bytes, self),
            Framing::Typed => {
                if bytes.len() < 2 {
                    return Err(PackError::Malformed("short type header"));
                }
                if (bytes[0], bytes[1]) != (major, minor) {
                    return Err(PackError::Malformed("type header mismatch"));
                }
                self.deserialize_known(major, minor, &bytes[2..], Framing::Untyped)
            }
            Framing::Untyped => {
                let width = codec.size_prefix_width();
                if width == 0 {
                    let fixed = codec.read_size(&[])?;
                    if bytes.len() != fixed {
                        return Err(PackError::Malformed("fixed-length value length mismatch"));
                    }
                    codec.deserialize(bytes, self)
                } else {
                    let total = codec.read_size(bytes)?;
                    if total != bytes.len() {
                        return Err(PackError::Malformed("inconsistent size prefix"));
                    }
                    codec.deserialize(&bytes[width..], self)
                }
            }
        }
    }

    /// Parse one typed child from the front of `bytes`.
    /// Returns the item and the number of bytes consumed.
    pub(crate) fn take_typed(&self, bytes: &[u8]) -> Result<(Item, usize), PackError> {
        if bytes.len() < 2 {
            return Err(PackError::Malformed("short type header"));
        }
        let codec = self.lookup(bytes[0], bytes[1])?;
        let rest = &bytes[2..];
        let width = codec.size_prefix_width();
        let ulen = if width == 0 {
            codec.read_size(&[])?
        } else {
            codec.read_size(rest)?
        };
        if rest.len() < ulen {
            return Err(PackError::Malformed("truncated value"));
        }
        let payload = if width == 0 {
            &rest[..ulen]
        } else {
            &rest[width..ulen]
        };
        let item = codec.deserialize(payload, self)?;
        Ok((item, 2 + ulen))
    }

    /// Parse one untyped child of a known type from the front of `bytes`.
    /// Returns the item and the number of bytes consumed.
    pub(crate) fn take_untyped(
        &self,
        major: u8,
        minor: u8,
        bytes: &[u8],
    ) -> Result<(Item, usize), PackError> {
        let codec = self.lookup(major, minor)?;
        let width = codec.size_prefix_width();
        let ulen = if width == 0 {
            codec.read_size(&[])?
        } else {
            codec.read_size(bytes)?
        };
        if bytes.len() < ulen {
            return Err(PackError::Malformed("truncated value"));
        }
        let payload = if width == 0 {
            &bytes[..ulen]
        } else {
            &bytes[width..ulen]
        };
        let item = codec.deserialize(payload, self)?;
        Ok((item, ulen))
    }
}

impl Default for Packer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::codecs::ids;
    use super::*;
    use crate::core::types::{ChainHash, HashKind};

    fn packer() -> Packer {
        Packer::with_defaults().unwrap()
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut p = packer();
        let err = codecs::register_defaults(&mut p).unwrap_err();
        assert!(matches!(err, PackError::DuplicateCodec { .. }));
    }

    #[test]
    fn unknown_type_surfaces() {
        let p = packer();
        let err = p.deserialize(&[0xfe, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            PackError::UnknownType {
                major: 0xfe,
                minor: 0xfe
            }
        ));
    }

    #[test]
    fn short_buffer_is_malformed() {
        let p = packer();
        assert!(matches!(
            p.deserialize(&[0x00]),
            Err(PackError::Malformed(_))
        ));
        // Typed chain index truncated after the header.
        let (maj, min) = ids::CHAIN_INDEX;
        assert!(matches!(
            p.deserialize(&[maj, min, 0x01, 0x02]),
            Err(PackError::Malformed(_))
        ));
    }

    #[test]
    fn inconsistent_size_prefix_is_malformed() {
        let p = packer();
        let (maj, min) = ids::MULTI_ARRAY;
        // Prefix claims 9 total bytes but only the 4-byte prefix follows.
        let bytes = [maj, min, 0x00, 0x00, 0x00, 0x09];
        assert!(matches!(
            p.deserialize(&bytes),
            Err(PackError::Malformed(_))
        ));
        // Prefix smaller than its own width.
        let bytes = [maj, min, 0x00, 0x00, 0x00, 0x02];
        assert!(matches!(
            p.deserialize(&bytes),
            Err(PackError::Malformed(_))
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let p = packer();
        let mut bytes = p
            .serialize_item(&Item::ChainIndex(7), Framing::Typed)
            .unwrap();
        bytes.push(0x00);
        assert!(matches!(
            p.deserialize(&bytes),
            Err(PackError::Malformed(_))
        ));
    }

    #[test]
    fn lookup_by_name_matches_id() {
        let p = packer();
        let c = p.lookup_by_name("bound-witness").unwrap();
        assert_eq!(c.id(), ids::BOUND_WITNESS);
    }

    #[test]
    fn previous_hash_round_trips_nested() {
        let p = packer();
        let item = Item::PreviousHash(ChainHash {
            kind: HashKind::Sha256,
            bytes: vec![0xab; 32],
        });
        let bytes = p.serialize_item(&item, Framing::Typed).unwrap();
        assert_eq!(p.deserialize(&bytes).unwrap(), item);
    }
}
