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

//! Signer capability: Ed25519 signing with an encrypted-at-rest key file.
//!
//! ### Key file format
//! With `ORIGINCHAIN_KEY_PASSPHRASE` set, the Ed25519 PKCS#8 bytes are
//! sealed into a self-describing container:
//!
//! `"OCK1" || format(1) || kdf_iters(u32 be) || salt(32) || nonce(12) || ciphertext+tag`
//!
//! The cipher is ChaCha20-Poly1305 under a key stretched with
//! PBKDF2-HMAC-SHA512; the whole header doubles as AEAD associated data, so
//! a tampered format byte or KDF cost fails authentication. The KDF cost is
//! stored in the container, which keeps old key files readable after the
//! default changes.

use ring::{
    aead, pbkdf2,
    rand::{SecureRandom, SystemRandom},
    signature::{Ed25519KeyPair, KeyPair},
};
use std::{
    fs,
    io::Write,
    num::NonZeroU32,
    path::Path,
    sync::Mutex,
    time::Instant,
};
use thiserror::Error;
use zeroize::Zeroize;

use crate::core::types::{KeyKind, PublicKey, Signature};

const KEY_MAGIC: &[u8] = b"OCK1";
const KEY_FORMAT_V1: u8 = 1;

const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
// magic + format + iters + salt + nonce
const HEADER_LEN: usize = 4 + 1 + 4 + SALT_LEN + NONCE_LEN;

const KDF_ITERS_DEFAULT: u32 = 600_000;

const PASSPHRASE_ENV: &str = "ORIGINCHAIN_KEY_PASSPHRASE";

/// Signer errors.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("io")]
    Io,
    #[error("invalid key encoding")]
    InvalidKey,
    #[error("missing passphrase (set ORIGINCHAIN_KEY_PASSPHRASE)")]
    MissingPassphrase,
    #[error("crypto")]
    Crypto,
    #[error("rate limited")]
    RateLimited,
}

/// A signing capability: owns key material, exposes the public key and signs.
pub trait Signer: Send + Sync {
    /// Public key for this signer.
    fn public_key(&self) -> PublicKey;
    /// Sign message bytes.
    fn sign(&self, msg: &[u8]) -> Result<Signature, SignerError>;
}

fn passphrase_from_env() -> Option<Vec<u8>> {
    std::env::var(PASSPHRASE_ENV)
        .ok()
        .map(String::into_bytes)
        .filter(|p| !p.is_empty())
}

fn kdf_iters() -> NonZeroU32 {
    // ORIGINCHAIN_KDF_ITERS overrides the sealing cost for new key files;
    // existing files carry their cost in the header.
    let iters = std::env::var("ORIGINCHAIN_KDF_ITERS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(KDF_ITERS_DEFAULT)
        .clamp(50_000, 5_000_000);
    NonZeroU32::new(iters).unwrap_or(NonZeroU32::MIN)
}

fn stretch_key(passphrase: &[u8], salt: &[u8], iters: NonZeroU32) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA512, iters, salt, passphrase, &mut key);
    key
}

fn aead_key(stretched: &mut [u8; 32]) -> Result<aead::LessSafeKey, SignerError> {
    let unbound = aead::UnboundKey::new(&aead::CHACHA20_POLY1305, stretched)
        .map_err(|_| SignerError::Crypto)?;
    stretched.zeroize();
    Ok(aead::LessSafeKey::new(unbound))
}

fn seal_key_file(passphrase: &[u8], pkcs8: &[u8]) -> Result<Vec<u8>, SignerError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt).map_err(|_| SignerError::Crypto)?;
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill(&mut nonce).map_err(|_| SignerError::Crypto)?;
    let iters = kdf_iters();

    let mut out = Vec::with_capacity(HEADER_LEN + pkcs8.len() + TAG_LEN);
    out.extend_from_slice(KEY_MAGIC);
    out.push(KEY_FORMAT_V1);
    out.extend_from_slice(&iters.get().to_be_bytes());
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce);

    let mut stretched = stretch_key(passphrase, &salt, iters);
    let cipher = aead_key(&mut stretched)?;

    let mut sealed = pkcs8.to_vec();
    cipher
        .seal_in_place_append_tag(
            aead::Nonce::assume_unique_for_key(nonce),
            aead::Aad::from(&out[..HEADER_LEN]),
            &mut sealed,
        )
        .map_err(|_| SignerError::Crypto)?;

    out.extend_from_slice(&sealed);
    Ok(out)
}

fn open_key_file(passphrase: &[u8], file: &[u8]) -> Result<Vec<u8>, SignerError> {
    if file.len() < HEADER_LEN + TAG_LEN
        || !file.starts_with(KEY_MAGIC)
        || file[4] != KEY_FORMAT_V1
    {
        return Err(SignerError::InvalidKey);
    }
    let iters = u32::from_be_bytes([file[5], file[6], file[7], file[8]]);
    let iters = NonZeroU32::new(iters).ok_or(SignerError::InvalidKey)?;
    let salt = &file[9..9 + SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&file[9 + SALT_LEN..HEADER_LEN]);

    let mut stretched = stretch_key(passphrase, salt, iters);
    let cipher = aead_key(&mut stretched)?;

    let mut sealed = file[HEADER_LEN..].to_vec();
    let plain = cipher
        .open_in_place(
            aead::Nonce::assume_unique_for_key(nonce),
            aead::Aad::from(&file[..HEADER_LEN]),
            &mut sealed,
        )
        .map_err(|_| SignerError::Crypto)?;
    Ok(plain.to_vec())
}

/// Stage next to the target, fsync, then rename over it. Private mode is set
/// at creation so the bytes never exist world-readable.
fn write_key_file(path: &Path, bytes: &[u8]) -> Result<(), SignerError> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Err(SignerError::Io);
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|_| SignerError::Io)?;

    let staging = dir.join(format!("{name}.staging"));
    let _ = fs::remove_file(&staging);

    let mut opts = fs::OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut f = opts.open(&staging).map_err(|_| SignerError::Io)?;
    f.write_all(bytes).map_err(|_| SignerError::Io)?;
    f.sync_all().map_err(|_| SignerError::Io)?;
    drop(f);

    fs::rename(&staging, path).map_err(|_| SignerError::Io)
}

/// Caps signing throughput per wall-clock second.
struct SignBudget {
    started: Instant,
    window: u64,
    spent: u32,
    per_sec: u32,
}

impl SignBudget {
    fn new(per_sec: u32) -> Self {
        Self {
            started: Instant::now(),
            window: 0,
            spent: 0,
            per_sec,
        }
    }

    fn try_spend(&mut self) -> bool {
        let window = self.started.elapsed().as_secs();
        if window != self.window {
            self.window = window;
            self.spent = 0;
        }
        if self.spent >= self.per_sec {
            return false;
        }
        self.spent += 1;
        true
    }
}

/// File-backed Ed25519 signer.
pub struct Ed25519Signer {
    keypair: Ed25519KeyPair,
    budget: Mutex<SignBudget>,
}

impl Ed25519Signer {
    /// Fresh in-memory signer (session keys, tests).
    pub fn generate() -> Result<Self, SignerError> {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).map_err(|_| SignerError::InvalidKey)?;
        let kp = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).map_err(|_| SignerError::InvalidKey)?;
        Ok(Self::from_keypair(kp))
    }

    /// Load or create an Ed25519 PKCS#8 key file.
    ///
    /// If `ORIGINCHAIN_KEY_PASSPHRASE` is set, the key file is sealed at
    /// rest; an unsealed file without the container magic is accepted as
    /// plaintext PKCS#8.
    pub fn load_or_create(path: &Path) -> Result<Self, SignerError> {
        let pass = passphrase_from_env();

        if path.exists() {
            let file = fs::read(path).map_err(|_| SignerError::Io)?;
            let mut pkcs8 = if file.starts_with(KEY_MAGIC) {
                let pass = pass.ok_or(SignerError::MissingPassphrase)?;
                open_key_file(&pass, &file)?
            } else {
                file
            };
            let parsed = Ed25519KeyPair::from_pkcs8(&pkcs8);
            pkcs8.zeroize();
            return Ok(Self::from_keypair(parsed.map_err(|_| SignerError::InvalidKey)?));
        }

        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).map_err(|_| SignerError::InvalidKey)?;
        // Parse before persisting; an unparseable key never reaches disk.
        let kp = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).map_err(|_| SignerError::InvalidKey)?;

        let mut plain = pkcs8.as_ref().to_vec();
        let on_disk = match &pass {
            Some(p) => seal_key_file(p, &plain)?,
            None => plain.clone(),
        };
        write_key_file(path, &on_disk)?;
        plain.zeroize();

        Ok(Self::from_keypair(kp))
    }

    fn from_keypair(keypair: Ed25519KeyPair) -> Self {
        Self {
            keypair,
            budget: Mutex::new(SignBudget::new(10_000)),
        }
    }
}

impl Signer for Ed25519Signer {
    fn public_key(&self) -> PublicKey {
        PublicKey {
            kind: KeyKind::Ed25519,
            bytes: self.keypair.public_key().as_ref().to_vec(),
        }
    }

    fn sign(&self, msg: &[u8]) -> Result<Signature, SignerError> {
        let allowed = self
            .budget
            .lock()
            .map_err(|_| SignerError::RateLimited)?
            .try_spend();
        if !allowed {
            return Err(SignerError::RateLimited);
        }

        let sig = self.keypair.sign(msg);
        Ok(Signature {
            kind: KeyKind::Ed25519,
            bytes: sig.as_ref().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let signer = Ed25519Signer::generate().unwrap();
        let msg = b"encounter";
        let sig = signer.sign(msg).unwrap();
        assert!(signer.public_key().verify(msg, &sig));
        assert!(!signer.public_key().verify(b"other", &sig));
    }

    #[test]
    fn load_or_create_persists_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.key");
        let a = Ed25519Signer::load_or_create(&path).unwrap();
        let b = Ed25519Signer::load_or_create(&path).unwrap();
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn sealed_container_round_trips_and_authenticates() {
        let pass = b"correct horse battery staple";
        let secret = vec![0x42u8; 85];

        let sealed = seal_key_file(pass, &secret).unwrap();
        assert!(sealed.starts_with(KEY_MAGIC));
        assert_eq!(open_key_file(pass, &sealed).unwrap(), secret);

        // Wrong passphrase fails authentication.
        assert!(open_key_file(b"wrong", &sealed).is_err());

        // A flipped header byte (KDF cost) fails authentication too.
        let mut tampered = sealed;
        tampered[6] ^= 1;
        assert!(open_key_file(pass, &tampered).is_err());
    }
}
