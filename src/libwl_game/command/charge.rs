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
use crate::prob::charge_pass_probability;
use super::{push, shooting, then, Command, Outcomes};

/// The maximum physical distance (in inches) any unit may charge.
const CHARGE_RANGE: f32 = 12.0;

/// Returns every legal charge order for the unit on the given cell: any
/// empty cell within twelve inches that stands adjacent to an enemy, as long
/// as the charging unit is not already in melee and did not fall back this
/// turn.
pub fn commands(point: Point, board: &Board) -> Vec<Command> {
    let unit = board.unit_on(point).expect("no unit on the source square");
    let team = board.team_on(point).unwrap();

    if unit.moved_out_of_combat || board.has_adjacent_enemy(point, team) {
        return vec! [];
    }

    board.squares_within(point, CHARGE_RANGE)
        .into_iter()
        .filter(|&to| !board.is_occupied(to) && board.has_adjacent_enemy(to, team))
        .map(|to| Command::Charge { from: point, to })
        .collect()
}

/// Declares a charge from `from` to `to`. Every enemy adjacent to the
/// destination that has a ranged weapon in range and is not itself in melee
/// first fires overwatch at the charging unit (on sixes), then the 2d6
/// distance roll splits every surviving branch into a success (the unit
/// moves onto the destination) and a failure (the unit stays put).
pub fn apply(board: &Board, from: Point, to: Point) -> Outcomes {
    assert!(board.is_occupied(from));
    assert!(!board.is_occupied(to));

    let team = board.team_on(from).unwrap();
    let unit = board.unit_on(from).unwrap();
    let distance = board.distance(from, to);

    assert!(board.has_adjacent_enemy(to, team));
    assert!(!board.has_adjacent_enemy(from, team));
    assert!(distance <= CHARGE_RANGE);
    assert!(!unit.moved_out_of_combat);

    // overwatch, one defender at a time, composing the distributions as we
    // go
    let mut outcomes = vec! [(board.clone(), 1.0)];

    for defender in adjacent_enemies(board, to, team) {
        let in_melee = board.has_adjacent_enemy(defender, team.opposite());
        let can_fire = board.unit_on(defender)
            .map(|enemy| enemy.has_ranged_weapon() && board.distance(defender, from) <= enemy.rg_range as f32)
            .unwrap_or(false);

        if !in_melee && can_fire {
            outcomes = then(outcomes, |next| {
                shooting::apply(next, defender, from, Some(6), true)
            });
        }
    }

    // the charge was at least attempted, if the unit survived to attempt it
    for (next, _) in outcomes.iter_mut() {
        if next.is_occupied(from) {
            let mut charger = next.unit_on(from).unwrap().clone();
            charger.attempted_charge = true;
            next.set(from, charger, team);
        }
    }

    // the distance roll splits every branch
    let p_pass = charge_pass_probability(distance);
    let mut out = vec! [];

    for &(ref next, p) in outcomes.iter() {
        push(&mut out, next.clone(), p * (1.0 - p_pass));
    }

    for (mut next, p) in outcomes {
        if next.is_occupied(from) {
            let mut charger = next.unit_on(from).unwrap().clone();
            charger.successful_charge = true;
            next.clear(from);
            next.set(to, charger, team);
        }

        push(&mut out, next, p * p_pass);
    }

    out
}

/// Returns the positions of all units hostile to `team` on the up to eight
/// cells surrounding `point`, in row-major order.
fn adjacent_enemies(board: &Board, point: Point, team: crate::team::Team) -> Vec<Point> {
    let size = board.size();
    let left = point.x.saturating_sub(1);
    let right = (point.x + 1).min(size - 1);
    let top = point.y.saturating_sub(1);
    let bottom = (point.y + 1).min(size - 1);
    let mut out = vec! [];

    for y in top..=bottom {
        for x in left..=right {
            let other = Point::new(x, y);

            if other != point && board.team_on(other) == Some(team.opposite()) {
                out.push(other);
            }
        }
    }

    out
}
