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
use crate::phase::Phase;
use crate::prob::morale_branches;
use crate::team::Team;
use super::{then, Outcomes};

/// Closes out the current phase on the board: every squad (of either team)
/// that lost models this phase takes a morale test, then the morale
/// bookkeeping is reset on all squads, and at the end of the fight phase all
/// of the per-turn flags are cleared too. The phase and turn counters
/// themselves belong to the game state, not the board.
///
/// # Arguments
///
/// * `board` -
/// * `phase` - the phase that is ending
///
pub fn apply(board: &Board, phase: Phase) -> Outcomes {
    let mut outcomes = vec! [(board.clone(), 1.0)];

    for team in [Team::Red, Team::Blue] {
        for point in board.all_units(team) {
            if board.unit_on(point).unwrap().models_lost > 0 {
                outcomes = then(outcomes, |next| morale(next, point));
            }
        }
    }

    let end_of_turn = phase == Phase::Fight;

    for (next, _) in outcomes.iter_mut() {
        clear_flags(next, end_of_turn);
    }

    outcomes
}

/// Takes the morale test of the squad on the given cell. Each failing roll
/// sends models fleeing, possibly destroying the squad outright.
fn morale(board: &Board, point: Point) -> Outcomes {
    let (unit, team) = match (board.unit_on(point), board.team_on(point)) {
        (Some(unit), Some(team)) => (unit, team),
        _ => return vec! [(board.clone(), 1.0)]
    };

    morale_branches(unit.ld, unit.models_lost)
        .into_iter()
        .map(|(fled, p)| {
            let mut next = board.clone();

            if fled > 0 {
                let remaining = unit.with_fled(fled);

                if remaining.is_destroyed() {
                    next.clear(point);
                } else {
                    next.set(point, remaining, team);
                }
            }

            (next, p)
        })
        .collect()
}

/// Resets the morale bookkeeping of every squad on the board, and all of the
/// per-turn flags when the turn is ending.
fn clear_flags(board: &mut Board, end_of_turn: bool) {
    for team in [Team::Red, Team::Blue] {
        for point in board.all_units(team) {
            let unit = board.unit_on(point).unwrap().with_cleared_flags(end_of_turn);

            board.set(point, unit, team);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::tests::guardsman;

    #[test]
    fn quiet_phase_is_deterministic() {
        let mut board = Board::new(10, 1.0);
        board.set(Point::new(1, 1), guardsman(), Team::Red);
        board.set(Point::new(8, 8), guardsman(), Team::Blue);

        let outcomes = apply(&board, Phase::Movement);

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].1, 1.0);
    }

    #[test]
    fn heavy_losses_trigger_morale() {
        let mut board = Board::new(10, 1.0);
        let mut unit = guardsman();
        unit.count = 5;
        unit.total_w = 5;
        unit.models_lost = 5;
        board.set(Point::new(1, 1), unit, Team::Red);

        // Ld 7, 5 lost: pass on 1-2, lose 1-4 more on 3-6
        let outcomes = apply(&board, Phase::Shooting);

        assert_eq!(outcomes.len(), 5);
        assert!((outcomes[0].1 - 2.0 / 6.0).abs() < 1e-12);

        let survivors: Vec<i32> = outcomes.iter()
            .map(|(next, _)| next.unit_on(Point::new(1, 1)).map(|u| u.count).unwrap_or(0))
            .collect();

        assert_eq!(survivors, vec! [5, 4, 3, 2, 1]);

        // the morale bookkeeping is reset in every branch
        for (next, _) in &outcomes {
            if let Some(unit) = next.unit_on(Point::new(1, 1)) {
                assert_eq!(unit.models_lost, 0);
            }
        }
    }

    #[test]
    fn morale_can_destroy_a_squad() {
        let mut board = Board::new(10, 1.0);
        let mut unit = guardsman();
        unit.ld = 2;
        unit.count = 2;
        unit.total_w = 2;
        unit.models_lost = 5;
        board.set(Point::new(1, 1), unit, Team::Red);

        // min roll for loss is -2, so every roll loses 4 .. 9 models and the
        // two-model squad is destroyed in every branch
        let outcomes = apply(&board, Phase::Shooting);

        assert_eq!(outcomes.len(), 6);
        for (next, p) in &outcomes {
            assert!((p - 1.0 / 6.0).abs() < 1e-12);
            assert!(!next.is_occupied(Point::new(1, 1)));
        }
    }

    #[test]
    fn turn_flags_clear_only_after_the_fight_phase() {
        let mut board = Board::new(10, 1.0);
        let mut unit = guardsman();
        unit.moved = true;
        unit.fired = true;
        board.set(Point::new(1, 1), unit, Team::Red);

        let after_shooting = apply(&board, Phase::Shooting);
        let unit = after_shooting[0].0.unit_on(Point::new(1, 1)).unwrap();
        assert!(unit.moved && unit.fired);

        let after_fight = apply(&board, Phase::Fight);
        let unit = after_fight[0].0.unit_on(Point::new(1, 1)).unwrap();
        assert!(!unit.moved && !unit.fired);
    }
}
