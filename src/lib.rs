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

//! Originchain - a peer-to-peer node whose participants co-sign attestations
//! of transient encounters ("bound witnesses") and keep them on personal
//! hash-linked origin chains.
//!
//! This crate provides:
//! - A self-describing, length-prefixed binary format behind a codec registry
//! - The three-message zig-zag exchange that assembles one block per encounter
//! - The origin-chain state repository (index, previous hash, signer rotation)
//! - A chain verifier enforcing the linkage rules
//! - A framed TCP transport, session handler, and Prometheus monitoring

/// Core protocol engine (types, wire format, chain state, bound witnesses).
pub mod core;
/// Observability (metrics, /metrics endpoint).
pub mod monitoring;
/// Networking (framed pipe, interaction driver, session handler).
pub mod networking;
