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

//! Extraction of bridged blocks embedded in a completed block's signed
//! heuristics.

use crate::core::types::{BoundWitness, Item};

/// Collect every embedded block from `block`'s signed heuristics, descending
/// through arrays, as a flat list in encounter order.
pub fn extract_nested(block: &BoundWitness) -> Vec<BoundWitness> {
    let mut found = Vec::new();
    for payload in &block.payloads {
        for item in &payload.signed {
            collect(item, &mut found);
        }
    }
    found
}

fn collect(item: &Item, found: &mut Vec<BoundWitness>) {
    match item {
        Item::BoundWitness(bw) => found.push(bw.clone()),
        Item::Array(children) => {
            for child in children {
                collect(child, found);
            }
        }
        _ => {}
    }
}
