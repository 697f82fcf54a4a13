// Copyright 2020 Karl Sundequist Blomdahl <karl.sundequist.blomdahl@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use dashmap::DashMap;

use crate::predict::PredictResponse;

/// A concurrent cache of network answers, keyed by the hash of the game
/// state they were computed for. Identical states turn up constantly across
/// parallel games (especially near the opening), caching their responses
/// saves whole batch slots.
///
/// Keying by hash means a colliding pair of distinct states would share an
/// answer. A stale heuristic is harmless to the search, so no effort is
/// spent on exact keys.
#[derive(Default)]
pub struct PredictCache {
    entries: DashMap<u64, PredictResponse>
}

impl PredictCache {
    pub fn new() -> PredictCache {
        PredictCache { entries: DashMap::new() }
    }

    /// Returns the cached response for the given state hash, if any.
    pub fn get(&self, key: u64) -> Option<PredictResponse> {
        self.entries.get(&key).map(|entry| entry.value().clone())
    }

    /// Stores the response for the given state hash.
    pub fn insert(&self, key: u64, response: PredictResponse) {
        self.entries.insert(key, response);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
