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

use rand::RngCore;

use wl_game::{GameState, Team};
use crate::choose::select_randomly;
use crate::estimator::Estimator;
use crate::policy::{Ucb1Policy, VisitCountPolicy};
use crate::tree::SearchTree;

/// One decision of a synchronously played game, as reported to the caller.
pub struct PlayedDecision {
    pub team: Team,
    pub command: wl_game::Command,
    pub simulations: usize
}

/// Plays a single game to completion with a synchronous search: the tree
/// persists across the decisions of a turn (re-rooted at each commit) and
/// is rebuilt whenever the acting team changes. Useful for demonstrations
/// and as the reference driver in tests; batched self-play goes through
/// `self_play` instead.
///
/// Returns the final state and the decision log, or `None` if the
/// estimator failed mid-game.
///
/// # Arguments
///
/// * `initial` - the state to start from
/// * `estimator` - the value/prior oracle
/// * `search_budget` - the number of simulations per decision
/// * `ucb1_c` - the exploration constant
/// * `tau` - the final policy temperature
/// * `rng` - the source of randomness
///
pub fn play_one_game<E: Estimator>(
    initial: &GameState,
    estimator: &mut E,
    search_budget: usize,
    ucb1_c: f64,
    tau: f64,
    rng: &mut dyn RngCore
) -> Option<(GameState, Vec<PlayedDecision>)> {
    assert!(search_budget > 0);

    let mut state = initial.clone();
    let mut tree = SearchTree::new(state.clone(), Ucb1Policy::new(ucb1_c), VisitCountPolicy::new(tau));
    let mut decisions = vec! [];

    while !state.is_finished() {
        if state.acting_team() != tree.search_team() {
            tree = SearchTree::new(state.clone(), Ucb1Policy::new(ucb1_c), VisitCountPolicy::new(tau));
        }

        let missing = search_budget.saturating_sub(tree.sample_count());
        if tree.simulate(missing, estimator, rng) < missing {
            return None;
        }

        let (commands, distribution) = tree.final_distribution();
        let choice = select_randomly(&distribution, rng);
        let outcomes = state.apply(&commands[choice]);
        let probs: Vec<f64> = outcomes.iter().map(|&(_, p)| p).collect();
        let chosen = outcomes.into_iter().nth(select_randomly(&probs, rng)).unwrap().0;

        decisions.push(PlayedDecision {
            team: state.acting_team(),
            command: commands[choice].clone(),
            simulations: tree.sample_count()
        });

        tree.commit(&chosen);
        state = chosen;
    }

    Some((state, decisions))
}
