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

use prometheus::{IntCounter, IntGauge, Registry};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus")]
    Prom,
}

/// Metrics container.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Committed origin-chain height.
    pub origin_height: IntGauge,
    /// Sessions currently in flight.
    pub sessions_active: IntGauge,
    /// Completed bound witnesses.
    pub bound_witness_total: IntCounter,
    /// Sessions aborted by protocol failure.
    pub negotiation_failed_total: IntCounter,
    /// Sessions aborted by peer disconnect.
    pub peer_disconnect_total: IntCounter,
}

impl Metrics {
    /// Create and register metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let origin_height = IntGauge::new("originchain_height", "Committed origin-chain height")
            .map_err(|_| MetricsError::Prom)?;
        let sessions_active =
            IntGauge::new("originchain_sessions_active", "Sessions currently in flight")
                .map_err(|_| MetricsError::Prom)?;
        let bound_witness_total = IntCounter::new(
            "originchain_bound_witness_total",
            "Completed bound witnesses",
        )
        .map_err(|_| MetricsError::Prom)?;
        let negotiation_failed_total = IntCounter::new(
            "originchain_negotiation_failed_total",
            "Sessions aborted by protocol failure",
        )
        .map_err(|_| MetricsError::Prom)?;
        let peer_disconnect_total = IntCounter::new(
            "originchain_peer_disconnect_total",
            "Sessions aborted by peer disconnect",
        )
        .map_err(|_| MetricsError::Prom)?;

        registry
            .register(Box::new(origin_height.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(sessions_active.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(bound_witness_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(negotiation_failed_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(peer_disconnect_total.clone()))
            .map_err(|_| MetricsError::Prom)?;

        Ok(Self {
            registry,
            origin_height,
            sessions_active,
            bound_witness_total,
            negotiation_failed_total,
            peer_disconnect_total,
        })
    }
}
