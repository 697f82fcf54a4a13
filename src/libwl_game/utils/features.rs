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

use crate::board::Board;
use crate::state::GameState;
use crate::team::Team;
use crate::unit::Unit;

/// The number of features each unit contributes to the board tensor.
pub const NUM_FEATURES: usize = 19;

/// The number of channels of each cell of the board tensor, one feature set
/// per team.
pub const VECTOR_DIM: usize = 2 * NUM_FEATURES;

/// Returns the feature vector of the given unit. The per-turn flags are
/// deliberately not included, the network has to learn the statistics, not
/// the bookkeeping.
///
/// The features are, in order: `count`, `movement`, `ws`, `bs`, `t`,
/// `total_w`, `a`, `ld`, `sv`, `rg_range`, `rg_s`, `rg_ap`, `rg_dmg`,
/// `rg_shots`, `ml_s`, `ml_ap`, `ml_dmg`, `rg_is_rapid`, `rg_is_heavy`.
pub fn unit_to_vector(unit: &Unit) -> [f32; NUM_FEATURES] {
    [
        unit.count as f32,
        unit.movement as f32,
        unit.ws as f32,
        unit.bs as f32,
        unit.t as f32,
        unit.total_w as f32,
        unit.a as f32,
        unit.ld as f32,
        unit.sv as f32,
        unit.rg_range as f32,
        unit.rg_s as f32,
        unit.rg_ap as f32,
        unit.rg_dmg as f32,
        unit.rg_shots as f32,
        unit.ml_s as f32,
        unit.ml_ap as f32,
        unit.ml_dmg as f32,
        if unit.rg_is_rapid { 1.0 } else { 0.0 },
        if unit.rg_is_heavy { 1.0 } else { 0.0 }
    ]
}

/// Returns the board tensor of shape `size x size x VECTOR_DIM` (row-major
/// over cells) for the given board, from the point of view of `to_act`. A
/// cell holding one of the acting team's units carries its feature vector in
/// the first `NUM_FEATURES` channels, an enemy-held cell carries it in the
/// last `NUM_FEATURES` channels, and empty cells are all zero.
///
/// # Arguments
///
/// * `board` -
/// * `to_act` - the team whose point of view the tensor encodes
///
pub fn board_to_tensor(board: &Board, to_act: Team) -> Vec<f32> {
    let size = board.size();
    let mut out = vec! [0.0; size * size * VECTOR_DIM];

    for team in [Team::Red, Team::Blue] {
        let offset = if team == to_act { 0 } else { NUM_FEATURES };

        for point in board.all_units(team) {
            let features = unit_to_vector(board.unit_on(point).unwrap());
            let base = point.to_index(size) * VECTOR_DIM + offset;

            out[base..base + NUM_FEATURES].copy_from_slice(&features);
        }
    }

    out
}

/// Returns the board tensor of the given state, from the point of view of
/// its acting team.
pub fn state_to_tensor(state: &GameState) -> Vec<f32> {
    board_to_tensor(state.board(), state.acting_team())
}
