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

use crate::board::{Board, Point};
use super::{Command, Outcomes};

/// Returns every legal movement order for the unit on the given cell: any
/// empty cell within the unit's movement allowance that is not adjacent to
/// an enemy. A unit locked in melee may still move (falling back), but pays
/// for it by being unable to shoot or charge for the rest of the turn.
pub fn commands(point: Point, board: &Board) -> Vec<Command> {
    let unit = board.unit_on(point).expect("no unit on the source square");
    let team = board.team_on(point).unwrap();

    board.squares_within(point, unit.movement as f32)
        .into_iter()
        .filter(|&to| !board.is_occupied(to) && !board.has_adjacent_enemy(to, team))
        .map(|to| Command::Move { from: point, to })
        .collect()
}

/// Moves the unit at `from` to `to`. Deterministic, but returned as a
/// (degenerate) distribution like every other resolution.
pub fn apply(board: &Board, from: Point, to: Point) -> Outcomes {
    assert!(board.is_occupied(from));
    assert!(!board.is_occupied(to));

    let team = board.team_on(from).unwrap();
    let mut unit = board.unit_on(from).unwrap().clone();
    assert!(board.distance(from, to) <= unit.movement as f32);
    assert!(!board.has_adjacent_enemy(to, team));

    unit.moved = true;
    unit.moved_out_of_combat = board.has_adjacent_enemy(from, team);

    let mut next = board.clone();
    next.clear(from);
    next.set(to, unit, team);

    vec! [(next, 1.0)]
}
