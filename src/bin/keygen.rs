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

use anyhow::Result;
use std::path::PathBuf;

use originchain::core::security::signer::{Ed25519Signer, Signer};

fn main() -> Result<()> {
    let out_dir = std::env::args().nth(1).unwrap_or_else(|| "data".to_string());
    let mut key_path = PathBuf::from(out_dir);
    std::fs::create_dir_all(&key_path)?;
    key_path.push("node.key");

    let signer = Ed25519Signer::load_or_create(&key_path)?;
    let pk = signer.public_key();

    println!("public key: {}", hex::encode(&pk.bytes));
    println!("address:    {}", bs58::encode(&pk.bytes).into_string());
    Ok(())
}
