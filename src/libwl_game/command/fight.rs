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
use crate::prob::penetrating_hit_probability;
use super::{resolve_attacks, Command, Outcomes};

/// Returns every legal fight order for the unit on the given cell: any
/// adjacent enemy, as long as the unit is in melee, carries a melee weapon,
/// and has at least one attack.
pub fn commands(point: Point, board: &Board) -> Vec<Command> {
    let unit = board.unit_on(point).expect("no unit on the source square");
    let team = board.team_on(point).unwrap();

    if !board.has_adjacent_enemy(point, team) || !unit.has_melee_weapon() || unit.a <= 0 {
        return vec! [];
    }

    let size = board.size();
    let left = point.x.saturating_sub(1);
    let right = (point.x + 1).min(size - 1);
    let top = point.y.saturating_sub(1);
    let bottom = (point.y + 1).min(size - 1);
    let mut out = vec! [];

    for y in top..=bottom {
        for x in left..=right {
            let target = Point::new(x, y);

            if target != point && board.team_on(target) == Some(team.opposite()) {
                out.push(Command::Fight { from: point, target });
            }
        }
    }

    out
}

/// Strikes the unit on `target` with the melee weapon of the unit at `from`,
/// returning the distribution over the number of penetrating hits.
pub fn apply(board: &Board, from: Point, target: Point) -> Outcomes {
    assert!(board.is_occupied(from));
    assert!(board.is_occupied(target));

    let team = board.team_on(from).unwrap();
    let fighter = board.unit_on(from).unwrap();
    let defender = board.unit_on(target).unwrap();

    assert!(board.team_on(target) == Some(team.opposite()));
    assert!(from.x.abs_diff(target.x) <= 1 && from.y.abs_diff(target.y) <= 1);
    assert!(fighter.has_melee_weapon() && fighter.a > 0);

    let p = penetrating_hit_probability(
        fighter.ws,
        fighter.ml_s,
        fighter.ml_ap,
        defender.t,
        defender.sv,
        defender.inv
    );
    let attacks = (fighter.a * fighter.count) as usize;

    let mut attacker = fighter.clone();
    attacker.fought = true;

    resolve_attacks(board, from, attacker, target, p, attacks, fighter.ml_dmg)
}
