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

//! Origin-chain state repository: the single writer of one peer's chain
//! continuity values (index, previous hash, signer rotation, next-key
//! commitment). All other components read snapshots.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::core::security::signer::Signer;
use crate::core::types::{decode_canonical_limited, encode_canonical, ChainHash, PublicKey};

const STATE_KEY: &[u8] = b"origin/state";
const STATE_MAX_BYTES: usize = 64 * 1024;

/// Repository errors.
#[derive(Debug, Error)]
pub enum ChainStateError {
    #[error("no rotatable signers")]
    NoRotatableSigners,
    #[error("repository unavailable")]
    Unavailable,
}

/// Continuity values persisted across restarts. Signers live in the keystore,
/// not here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedChainState {
    /// Number of committed blocks.
    pub index: u64,
    /// Hash of the most recent block, absent at genesis.
    pub previous_hash: Option<ChainHash>,
    /// Pending next-public-key commitment.
    pub next_public_key: Option<PublicKey>,
}

/// Durable backend for the repository.
pub trait ChainStateStore: Send + Sync {
    /// Load the last saved state, if any.
    fn load(&self) -> Result<Option<PersistedChainState>, ChainStateError>;
    /// Save `state`, replacing any previous snapshot.
    fn save(&self, state: &PersistedChainState) -> Result<(), ChainStateError>;
}

/// In-memory store for tests and ephemeral nodes.
#[derive(Default)]
pub struct MemoryChainStore {
    slot: Mutex<Option<PersistedChainState>>,
}

impl ChainStateStore for MemoryChainStore {
    fn load(&self) -> Result<Option<PersistedChainState>, ChainStateError> {
        Ok(self
            .slot
            .lock()
            .map_err(|_| ChainStateError::Unavailable)?
            .clone())
    }

    fn save(&self, state: &PersistedChainState) -> Result<(), ChainStateError> {
        *self
            .slot
            .lock()
            .map_err(|_| ChainStateError::Unavailable)? = Some(state.clone());
        Ok(())
    }
}

/// sled-backed store.
pub struct SledChainStore {
    db: sled::Db,
}

impl SledChainStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> Result<Self, ChainStateError> {
        let db = sled::open(path).map_err(|_| ChainStateError::Unavailable)?;
        Ok(Self { db })
    }
}

impl ChainStateStore for SledChainStore {
    fn load(&self) -> Result<Option<PersistedChainState>, ChainStateError> {
        let Some(bytes) = self
            .db
            .get(STATE_KEY)
            .map_err(|_| ChainStateError::Unavailable)?
        else {
            return Ok(None);
        };
        let state = decode_canonical_limited(&bytes, STATE_MAX_BYTES)
            .map_err(|_| ChainStateError::Unavailable)?;
        Ok(Some(state))
    }

    fn save(&self, state: &PersistedChainState) -> Result<(), ChainStateError> {
        let bytes = encode_canonical(state).map_err(|_| ChainStateError::Unavailable)?;
        self.db
            .insert(STATE_KEY, bytes)
            .map_err(|_| ChainStateError::Unavailable)?;
        self.db.flush().map_err(|_| ChainStateError::Unavailable)?;
        Ok(())
    }
}

/// A consistent read of the repository, taken under the writer lock.
#[derive(Clone)]
pub struct ChainSnapshot {
    /// Pending-block index.
    pub index: u64,
    /// Hash of the last committed block.
    pub previous_hash: Option<ChainHash>,
    /// Pending next-public-key commitment to embed in the next payload.
    pub next_public_key: Option<PublicKey>,
    /// Current signers at snapshot time.
    pub signers: Vec<Arc<dyn Signer>>,
}

struct Inner {
    index: u64,
    previous_hash: Option<ChainHash>,
    current: VecDeque<Arc<dyn Signer>>,
    waiting: VecDeque<Arc<dyn Signer>>,
    next_public_key: Option<PublicKey>,
}

/// The repository. `current[0]` is the genesis signer and is never rotated
/// out.
pub struct OriginChainRepo {
    inner: Mutex<Inner>,
    store: Option<Arc<dyn ChainStateStore>>,
}

impl OriginChainRepo {
    /// Create a repository, restoring persisted continuity values from
    /// `store` when present.
    pub fn open(
        signers: Vec<Arc<dyn Signer>>,
        store: Option<Arc<dyn ChainStateStore>>,
    ) -> Result<Self, ChainStateError> {
        let mut inner = Inner {
            index: 0,
            previous_hash: None,
            current: signers.into(),
            waiting: VecDeque::new(),
            next_public_key: None,
        };
        if let Some(store) = &store {
            if let Some(persisted) = store.load()? {
                inner.index = persisted.index;
                inner.previous_hash = persisted.previous_hash;
                inner.next_public_key = persisted.next_public_key;
            }
        }
        Ok(Self {
            inner: Mutex::new(inner),
            store,
        })
    }

    // Mutations are transactional under the lock, so a poisoned guard still
    // holds a consistent state.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Pending-block index.
    pub fn get_index(&self) -> u64 {
        self.lock().index
    }

    /// Hash of the most recently committed block.
    pub fn get_previous_hash(&self) -> Option<ChainHash> {
        self.lock().previous_hash.clone()
    }

    /// Copy of the current signers.
    pub fn get_signers(&self) -> Vec<Arc<dyn Signer>> {
        self.lock().current.iter().cloned().collect()
    }

    /// Copy of the queued signers.
    pub fn get_waiting_signers(&self) -> Vec<Arc<dyn Signer>> {
        self.lock().waiting.iter().cloned().collect()
    }

    /// The genesis signer, if any signer has been set.
    pub fn get_genesis_signer(&self) -> Option<Arc<dyn Signer>> {
        self.lock().current.front().cloned()
    }

    /// Pending next-public-key commitment.
    pub fn get_next_public_key(&self) -> Option<PublicKey> {
        self.lock().next_public_key.clone()
    }

    /// Consistent snapshot of everything a payload needs.
    pub fn snapshot(&self) -> ChainSnapshot {
        let inner = self.lock();
        ChainSnapshot {
            index: inner.index,
            previous_hash: inner.previous_hash.clone(),
            next_public_key: inner.next_public_key.clone(),
            signers: inner.current.iter().cloned().collect(),
        }
    }

    /// Queue a signer for rotation and commit to its key in the next block.
    pub fn add_signer(&self, signer: Arc<dyn Signer>) {
        let mut inner = self.lock();
        inner.next_public_key = Some(signer.public_key());
        inner.waiting.push_back(signer);
    }

    /// Remove the oldest non-genesis signer. The genesis signer is fixed.
    pub fn remove_oldest_signer(&self) -> Result<(), ChainStateError> {
        let mut inner = self.lock();
        if inner.current.len() < 2 {
            return Err(ChainStateError::NoRotatableSigners);
        }
        let _ = inner.current.remove(1);
        Ok(())
    }

    /// Replace the current signers wholesale (recovery/bootstrap). Queued
    /// signers and the pending commitment are left untouched.
    pub fn set_current_signers(&self, signers: Vec<Arc<dyn Signer>>) {
        self.lock().current = signers.into();
    }

    /// Commit a block: advance the index, record its hash, drain one queued
    /// signer, clear the commitment. Persisted before the in-memory state
    /// changes, so a store failure leaves the repository untouched.
    pub fn update_origin_chain_state(&self, hash: ChainHash) -> Result<(), ChainStateError> {
        let mut inner = self.lock();
        let next_index = inner.index + 1;
        if let Some(store) = &self.store {
            store.save(&PersistedChainState {
                index: next_index,
                previous_hash: Some(hash.clone()),
                next_public_key: None,
            })?;
        }
        inner.index = next_index;
        inner.previous_hash = Some(hash);
        if let Some(s) = inner.waiting.pop_front() {
            inner.current.push_back(s);
        }
        inner.next_public_key = None;
        Ok(())
    }
}
