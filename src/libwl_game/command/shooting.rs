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

/// Returns every legal shooting order for the unit on the given cell: any
/// enemy within range of its ranged weapon, as long as the shooter is not in
/// melee, did not fall back this turn, and the target is not itself locked
/// in melee (no firing into a fight).
pub fn commands(point: Point, board: &Board) -> Vec<Command> {
    let unit = board.unit_on(point).expect("no unit on the source square");
    let team = board.team_on(point).unwrap();

    if !unit.has_ranged_weapon() || unit.moved_out_of_combat || board.has_adjacent_enemy(point, team) {
        return vec! [];
    }

    board.squares_within(point, unit.rg_range as f32)
        .into_iter()
        .filter(|&target| {
            board.team_on(target) == Some(team.opposite())
                && !board.has_adjacent_enemy(target, team.opposite())
        })
        .map(|target| Command::Shoot { from: point, target, override_hit_skill: None, safe_target: false })
        .collect()
}

/// Fires the ranged weapon of the unit at `from` at the unit on `target`,
/// returning the distribution over the number of penetrating hits.
///
/// # Arguments
///
/// * `board` -
/// * `from` - the position of the shooter
/// * `target` - the position of the target
/// * `override_hit_skill` - replaces the shooter's ballistic skill when set
///   (overwatch fires on sixes); the shooter's flags are left untouched
/// * `safe_target` - succeed silently when the target square is empty, used
///   by overwatch where an earlier shot may already have destroyed the
///   charging unit
///
pub fn apply(
    board: &Board,
    from: Point,
    target: Point,
    override_hit_skill: Option<i32>,
    safe_target: bool
) -> Outcomes {
    if safe_target && !board.is_occupied(target) {
        return vec! [(board.clone(), 1.0)];
    }

    assert!(board.is_occupied(from));
    assert!(board.is_occupied(target));

    let team = board.team_on(from).unwrap();
    let shooter = board.unit_on(from).unwrap();
    let defender = board.unit_on(target).unwrap();
    let distance = board.distance(from, target);

    assert!(board.team_on(target) == Some(team.opposite()));
    assert!(shooter.has_ranged_weapon());
    assert!(distance <= shooter.rg_range as f32);
    assert!(!shooter.moved_out_of_combat);
    assert!(!board.has_adjacent_enemy(from, team));
    assert!(!board.has_adjacent_enemy(target, team.opposite()));

    // heavy weapons are fired on the move at a flat 6+, overwatch overrides
    // the skill outright
    let hit_skill = override_hit_skill.unwrap_or(
        if shooter.rg_is_heavy && shooter.moved { 6 } else { shooter.bs }
    );
    let p = penetrating_hit_probability(
        hit_skill,
        shooter.rg_s,
        shooter.rg_ap,
        defender.t,
        defender.sv,
        defender.inv
    );

    let mut shots = (shooter.rg_shots * shooter.count) as usize;
    if shooter.rg_is_rapid && distance <= 0.5 * shooter.rg_range as f32 {
        shots *= 2;
    }

    let mut attacker = shooter.clone();
    if override_hit_skill.is_none() {
        attacker.fired = true;
    }

    resolve_attacks(board, from, attacker, target, p, shots, shooter.rg_dmg)
}
