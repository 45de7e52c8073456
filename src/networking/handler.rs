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

//! Session glue: build the local payload from the repository, run the
//! driver, and on success hash the block, notify listeners, and advance the
//! chain. On failure the repository is untouched.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::boundwitness::assembler::ZigZagAssembler;
use crate::core::boundwitness::hash_bound_witness;
use crate::core::chain::repository::{ChainSnapshot, ChainStateError, OriginChainRepo};
use crate::core::packer::{PackError, Packer};
use crate::core::security::hasher::HashProvider;
use crate::core::types::{BoundWitness, Item, Payload};
use crate::monitoring::metrics::Metrics;
use crate::networking::driver::{DriverError, InteractionDriver};
use crate::networking::pipe::{Pipe, PipeError};

/// Handler errors.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Codec(#[from] PackError),
    #[error(transparent)]
    State(#[from] ChainStateError),
}

/// Which side of the exchange this session plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// We open the exchange.
    Initiator,
    /// The peer opened it.
    Responder,
}

/// Notified with every completed block, before the repository advances.
pub trait SuccessListener: Send + Sync {
    /// A block was completed in a session on this node.
    fn on_bound_witness_success(&self, block: &BoundWitness);
}

/// Builds the local payload from a repository snapshot.
pub trait PayloadProvider: Send + Sync {
    /// Payload for the next exchange.
    fn payload(&self, snapshot: &ChainSnapshot) -> Payload;
}

/// Standard payload: chain continuity heuristics from the snapshot plus
/// caller-supplied extras (e.g. RSSI).
#[derive(Default)]
pub struct StandardPayloadProvider {
    extra_signed: Vec<Item>,
    extra_unsigned: Vec<Item>,
}

impl StandardPayloadProvider {
    /// Continuity heuristics only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Continuity heuristics plus fixed extras.
    pub fn with_heuristics(extra_signed: Vec<Item>, extra_unsigned: Vec<Item>) -> Self {
        Self {
            extra_signed,
            extra_unsigned,
        }
    }
}

impl PayloadProvider for StandardPayloadProvider {
    fn payload(&self, snapshot: &ChainSnapshot) -> Payload {
        let mut signed = vec![Item::ChainIndex(snapshot.index)];
        if let Some(hash) = &snapshot.previous_hash {
            signed.push(Item::PreviousHash(hash.clone()));
        }
        if let Some(key) = &snapshot.next_public_key {
            signed.push(Item::NextPublicKey(key.clone()));
        }
        signed.extend(self.extra_signed.iter().cloned());
        Payload {
            signed,
            unsigned: self.extra_unsigned.clone(),
        }
    }
}

/// Per-connection session handler.
pub struct BoundWitnessHandler {
    packer: Arc<Packer>,
    repo: Arc<OriginChainRepo>,
    hasher: Arc<dyn HashProvider>,
    payloads: Arc<dyn PayloadProvider>,
    listeners: Vec<Arc<dyn SuccessListener>>,
    metrics: Arc<Metrics>,
}

impl BoundWitnessHandler {
    /// New handler over shared components.
    pub fn new(
        packer: Arc<Packer>,
        repo: Arc<OriginChainRepo>,
        hasher: Arc<dyn HashProvider>,
        payloads: Arc<dyn PayloadProvider>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            packer,
            repo,
            hasher,
            payloads,
            listeners: Vec::new(),
            metrics,
        }
    }

    /// Register a success listener. Startup only.
    pub fn add_listener(&mut self, listener: Arc<dyn SuccessListener>) {
        self.listeners.push(listener);
    }

    /// Run one session over `pipe`.
    pub async fn handle<P: Pipe>(&self, pipe: P, role: Role) -> Result<BoundWitness, HandlerError> {
        self.metrics.sessions_active.inc();
        let result = self.run(pipe, role).await;
        self.metrics.sessions_active.dec();

        match &result {
            Ok(_) => {
                self.metrics.bound_witness_total.inc();
                self.metrics
                    .origin_height
                    .set(i64::try_from(self.repo.get_index()).unwrap_or(i64::MAX));
                info!(index = self.repo.get_index(), "bound witness committed");
            }
            Err(HandlerError::Driver(DriverError::Pipe(PipeError::Disconnected))) => {
                self.metrics.peer_disconnect_total.inc();
                warn!("peer disconnected mid-exchange");
            }
            Err(e) => {
                self.metrics.negotiation_failed_total.inc();
                warn!(error = %e, "bound witness session failed");
            }
        }

        result
    }

    async fn run<P: Pipe>(&self, pipe: P, role: Role) -> Result<BoundWitness, HandlerError> {
        let snapshot = self.repo.snapshot();
        let payload = self.payloads.payload(&snapshot);
        let mut assembler =
            ZigZagAssembler::new(self.packer.clone(), snapshot.signers.clone(), payload);
        let mut driver = InteractionDriver::new(pipe, self.packer.clone());

        let block = match role {
            Role::Initiator => driver.run_initiator(&mut assembler).await?,
            Role::Responder => driver.run_responder(&mut assembler).await?,
        };

        let hash = hash_bound_witness(&self.packer, self.hasher.as_ref(), &block)?;
        for listener in &self.listeners {
            listener.on_bound_witness_success(&block);
        }
        self.repo.update_origin_chain_state(hash)?;
        Ok(block)
    }
}
