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

use wl_game::{GameState, Team};
use wl_nn::Experience;

/// Everything one self-play game produced: the experiences in the exact
/// order the decisions were made, the state the game ended in, and the seed
/// its private generator started from (replaying with the same seed against
/// the same predictor reproduces the game).
pub struct GameResult {
    /// The index of the game within the batch.
    pub index: usize,

    /// The seed of the game's private generator.
    pub seed: u64,

    /// The recorded decisions, in order.
    pub experiences: Vec<Experience>,

    /// The state the game stopped in.
    pub final_state: GameState,

    /// Whether the game actually ran to termination (false when self-play
    /// was cancelled under it).
    pub finished: bool
}

impl GameResult {
    /// Returns the final value of the game with respect to team 0, the
    /// sign convention of the experience dataset.
    pub fn value(&self) -> f64 {
        self.final_state.game_value(Team::Red)
    }

    /// Returns the number of decisions recorded.
    pub fn decisions(&self) -> usize {
        self.experiences.len()
    }
}
