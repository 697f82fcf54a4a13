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

use rand::rngs::SmallRng;
use rand::SeedableRng;

use wl_game::{Board, Command, GameState, Phase, Point, Team};
use wl_mcts::choose::select_randomly;
use wl_mcts::estimator::UniformRolloutEstimator;
use wl_mcts::policy::{Ucb1Policy, VisitCountPolicy};
use wl_mcts::tree::SearchTree;

use crate::common::{blank_unit, trooper};

/// A lone shot at an unarmoured single-wound target: hit on 3+ (4/6),
/// wound S4 against T4 (3/6), no save at all. The target survives with 2/3
/// and dies with 1/3.
#[test]
fn single_shot_kill_probability() {
    let mut shooter = blank_unit("Shooter");
    shooter.bs = 3;
    shooter.rg_s = 4;
    shooter.rg_ap = 0;
    shooter.rg_dmg = 1;
    shooter.rg_shots = 1;
    shooter.rg_range = 24;
    shooter.count = 1;

    let mut target = blank_unit("Target");
    target.t = 4;
    target.sv = 7;
    target.inv = 7;
    target.w = 1;
    target.count = 1;
    target.total_w = 1;

    let mut board = Board::new(20, 1.0);
    board.set(Point::new(0, 0), shooter, Team::Red);
    board.set(Point::new(10, 0), target, Team::Blue);

    let command = Command::Shoot {
        from: Point::new(0, 0),
        target: Point::new(10, 0),
        override_hit_skill: None,
        safe_target: false
    };
    let outcomes = command.apply(&board, Phase::Shooting);

    assert_eq!(outcomes.len(), 2);

    let (ref alive, p_alive) = outcomes[0];
    let (ref dead, p_dead) = outcomes[1];

    assert!((p_alive - 2.0 / 3.0).abs() < 1e-9);
    assert!((p_dead - 1.0 / 3.0).abs() < 1e-9);
    assert!(alive.is_occupied(Point::new(10, 0)));
    assert!(!dead.is_occupied(Point::new(10, 0)));
}

/// A seven-inch charge with nobody able to fire overwatch: the only
/// randomness is the 2d6 roll, which covers seven inches with 21/36.
#[test]
fn two_dice_charge() {
    let mut charger = blank_unit("Charger");
    charger.ml_s = 3;
    charger.a = 1;

    // the defender carries no ranged weapon, so there is no overwatch
    let defender = blank_unit("Defender");

    let mut board = Board::new(20, 1.0);
    board.set(Point::new(0, 0), charger, Team::Red);
    board.set(Point::new(8, 0), defender, Team::Blue);

    let command = Command::Charge { from: Point::new(0, 0), to: Point::new(7, 0) };
    let outcomes = command.apply(&board, Phase::Charge);

    assert_eq!(outcomes.len(), 2);

    let (ref no_move, p_fail) = outcomes[0];
    let (ref success, p_pass) = outcomes[1];

    assert!((p_pass - 7.0 / 12.0).abs() < 1e-9);
    assert!((p_fail - 5.0 / 12.0).abs() < 1e-9);
    assert!(no_move.is_occupied(Point::new(0, 0)));
    assert!(success.is_occupied(Point::new(7, 0)));
    assert!(success.unit_on(Point::new(7, 0)).unwrap().successful_charge);
}

/// A squad of ten with leadership seven that lost five models this phase:
/// rolls of one or two are absorbed, rolls of three to six lose one to
/// four more models.
#[test]
fn morale_for_heavy_losses() {
    let mut squad = blank_unit("Squad");
    squad.ld = 7;
    squad.count = 10;
    squad.total_w = 10;
    squad.models_lost = 5;

    let mut board = Board::new(10, 1.0);
    board.set(Point::new(1, 1), squad, Team::Red);

    let outcomes = Command::EndPhase.apply(&board, Phase::Shooting);

    assert_eq!(outcomes.len(), 5);
    assert!((outcomes[0].1 - 2.0 / 6.0).abs() < 1e-9);

    for (extra_lost, (next, p)) in outcomes.iter().skip(1).enumerate() {
        assert!((p - 1.0 / 6.0).abs() < 1e-9);
        assert_eq!(
            next.unit_on(Point::new(1, 1)).unwrap().count,
            10 - 1 - extra_lost as i32
        );
    }
}

/// A board holding only team 0 units is a finished, won game.
#[test]
fn game_value_on_elimination() {
    let mut board = Board::new(10, 1.0);
    board.set(Point::new(1, 1), trooper("Survivor"), Team::Red);

    let state = GameState::start(board, 6);

    assert!(state.is_finished());
    assert_eq!(state.game_value(Team::Red), 1.0);
    assert_eq!(state.game_value(Team::Blue), -1.0);
}

/// After a hundred simulations the committed child carries exactly the
/// samples the search invested into it, and never zero: the final policy
/// only ever proposes visited actions, and in the movement phase every
/// action is deterministic so the chosen action's single child holds all
/// of its visits.
#[test]
fn commit_persists_the_searched_subtree() {
    let mut board = Board::new(6, 1.0);
    board.set(Point::new(1, 1), trooper("Red"), Team::Red);
    board.set(Point::new(4, 4), trooper("Blue"), Team::Blue);

    let state = GameState::start(board, 2);
    assert_eq!(state.phase(), Phase::Movement);

    let mut tree = SearchTree::new(state.clone(), Ucb1Policy::new(2.0), VisitCountPolicy::new(1.0));
    let mut estimator = UniformRolloutEstimator;
    let mut rng = SmallRng::seed_from_u64(21);

    assert_eq!(tree.simulate(100, &mut estimator, &mut rng), 100);

    let (commands, distribution) = tree.final_distribution();
    let choice = select_randomly(&distribution, &mut rng);
    let outcomes = state.apply(&commands[choice]);
    let probs: Vec<f64> = outcomes.iter().map(|&(_, p)| p).collect();
    let chosen = outcomes.into_iter().nth(select_randomly(&probs, &mut rng)).unwrap().0;

    tree.commit(&chosen);

    assert_eq!(tree.root_state(), chosen);
    assert!(tree.sample_count() > 0);
}
