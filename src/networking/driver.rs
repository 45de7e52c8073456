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

//! Interaction driver: runs one side of the zig-zag over a pipe.
//!
//! The first initiator frame carries a catalogue header advertising the
//! sub-protocol: one size byte (always 4) then a 4-byte big-endian bitmask.
//! Every later frame is a bare untyped transfer.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::core::boundwitness::assembler::{NegotiationError, ZigZagAssembler};
use crate::core::packer::codecs::ids;
use crate::core::packer::{Framing, PackError, Packer};
use crate::core::types::{BoundWitness, Item, Transfer};
use crate::networking::pipe::{Pipe, PipeError};

/// Catalogue bit for the bound-witness sub-protocol. Remaining bits are
/// reserved.
pub const CATALOGUE_BOUND_WITNESS: u32 = 0x0000_0001;

const CATALOGUE_SIZE: u8 = 4;

/// Driver errors.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Pipe(#[from] PipeError),
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
    #[error(transparent)]
    Codec(#[from] PackError),
    #[error("unsupported catalogue {0:#010x}")]
    UnsupportedCatalogue(u32),
    #[error("peer sent no response")]
    MissingResponse,
    #[error("exchange finished without a block")]
    Incomplete,
}

fn catalogue_header(mask: u32) -> [u8; 5] {
    let mut header = [0u8; 5];
    header[0] = CATALOGUE_SIZE;
    header[1..5].copy_from_slice(&mask.to_be_bytes());
    header
}

fn split_catalogue(frame: &[u8]) -> Result<(u32, &[u8]), DriverError> {
    if frame.len() < 5 || frame[0] != CATALOGUE_SIZE {
        return Err(DriverError::Codec(PackError::Malformed("catalogue header")));
    }
    let mask = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]);
    Ok((mask, &frame[5..]))
}

fn encode_transfer(packer: &Packer, transfer: &Transfer) -> Result<Vec<u8>, PackError> {
    packer.serialize_item(&Item::Transfer(transfer.clone()), Framing::Untyped)
}

fn decode_transfer(packer: &Packer, bytes: &[u8]) -> Result<Transfer, PackError> {
    let (major, minor) = ids::TRANSFER;
    match packer.deserialize_known(major, minor, bytes, Framing::Untyped)? {
        Item::Transfer(t) => Ok(t),
        _ => Err(PackError::Malformed("expected a transfer")),
    }
}

/// Drives one peer session over an owned pipe.
pub struct InteractionDriver<P: Pipe> {
    pipe: P,
    packer: Arc<Packer>,
    catalogue: u32,
}

impl<P: Pipe> InteractionDriver<P> {
    /// New driver advertising the bound-witness catalogue.
    pub fn new(pipe: P, packer: Arc<Packer>) -> Self {
        Self {
            pipe,
            packer,
            catalogue: CATALOGUE_BOUND_WITNESS,
        }
    }

    /// Initiator side: open, await the counter-offer, close with our
    /// signatures.
    pub async fn run_initiator(
        &mut self,
        assembler: &mut ZigZagAssembler,
    ) -> Result<BoundWitness, DriverError> {
        let t1 = assembler.incoming_data(None, false)?;
        let mut first = catalogue_header(self.catalogue).to_vec();
        first.extend_from_slice(&encode_transfer(&self.packer, &t1)?);

        debug!(bytes = first.len(), "sending opening transfer");
        let response = self
            .pipe
            .send(&first, true)
            .await?
            .ok_or(DriverError::MissingResponse)?;

        let t2 = decode_transfer(&self.packer, &response)?;
        let t3 = assembler.incoming_data(Some(t2), false)?;
        self.pipe
            .send(&encode_transfer(&self.packer, &t3)?, false)
            .await?;
        self.pipe.close().await;

        assembler.take_completed().ok_or(DriverError::Incomplete)
    }

    /// Responder side: consume the catalogue-prefixed opening frame, reply,
    /// await the closing signatures.
    pub async fn run_responder(
        &mut self,
        assembler: &mut ZigZagAssembler,
    ) -> Result<BoundWitness, DriverError> {
        let first = self.pipe.recv().await?;
        let (mask, rest) = split_catalogue(&first)?;
        if mask & CATALOGUE_BOUND_WITNESS == 0 {
            return Err(DriverError::UnsupportedCatalogue(mask));
        }

        let t1 = decode_transfer(&self.packer, rest)?;
        let t2 = assembler.incoming_data(Some(t1), true)?;

        debug!(bytes_in = first.len(), "answering opening transfer");
        let response = self
            .pipe
            .send(&encode_transfer(&self.packer, &t2)?, true)
            .await?
            .ok_or(DriverError::MissingResponse)?;

        let t3 = decode_transfer(&self.packer, &response)?;
        let _ = assembler.incoming_data(Some(t3), false)?;
        self.pipe.close().await;

        assembler.take_completed().ok_or(DriverError::Incomplete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_header_round_trips() {
        let header = catalogue_header(CATALOGUE_BOUND_WITNESS);
        let (mask, rest) = split_catalogue(&header).unwrap();
        assert_eq!(mask, CATALOGUE_BOUND_WITNESS);
        assert!(rest.is_empty());
    }

    #[test]
    fn truncated_catalogue_is_malformed() {
        assert!(split_catalogue(&[4, 0, 0]).is_err());
        assert!(split_catalogue(&[3, 0, 0, 0, 1]).is_err());
    }
}
