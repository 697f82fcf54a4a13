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
use rand::Rng;

use wl_game::utils::features::state_to_tensor;
use wl_game::utils::policy::array_to_policy;
use wl_game::{Command, GameState};
use wl_nn::Predictor;
use crate::choose::select_randomly;
use crate::policy::deweight_pass;

/// The value/prior oracle a synchronous (unbatched) search consults at each
/// leaf. The returned value is always from the point of view of the team
/// acting at the evaluated state, the tree applies the search-team sign
/// itself.
pub trait Estimator {
    /// Returns the prior distribution over `commands` and the value of
    /// `state`, or `None` if the oracle failed.
    ///
    /// # Arguments
    ///
    /// * `state` - the leaf state to evaluate
    /// * `commands` - the legal commands of `state`
    /// * `rng` - the source of randomness
    ///
    fn evaluate(
        &mut self,
        state: &GameState,
        commands: &[Command],
        rng: &mut dyn RngCore
    ) -> Option<(Vec<f64>, f64)>;
}

/// An estimator that needs no network at all: uniform priors, and values
/// from playing the game out with uniformly random decisions (sampling each
/// stochastic outcome). Slow but exact in the limit, and the baseline
/// opponent in the tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformRolloutEstimator;

impl Estimator for UniformRolloutEstimator {
    fn evaluate(
        &mut self,
        state: &GameState,
        commands: &[Command],
        rng: &mut dyn RngCore
    ) -> Option<(Vec<f64>, f64)> {
        let team = state.acting_team();
        let mut current = state.clone();

        while !current.is_finished() {
            let commands = current.legal_commands();
            let command = &commands[rng.gen_range(0..commands.len())];
            let outcomes = current.apply(command);
            let probs: Vec<f64> = outcomes.iter().map(|&(_, p)| p).collect();
            let index = select_randomly(&probs, rng);

            current = outcomes.into_iter().nth(index).unwrap().0;
        }

        let prior = vec! [1.0 / commands.len() as f64; commands.len()];

        Some((prior, current.game_value(team)))
    }
}

/// Wraps a predictor as a single-state estimator, for driving a search
/// without the batching manager (one game at a time). The network's policy
/// array is projected onto the legal commands and the pass weight is
/// adjusted for the phase, exactly as the batched path does it.
pub struct NetworkEstimator<'a, P: Predictor> {
    predictor: &'a P
}

impl<'a, P: Predictor> NetworkEstimator<'a, P> {
    pub fn new(predictor: &'a P) -> NetworkEstimator<'a, P> {
        NetworkEstimator { predictor }
    }
}

impl<'a, P: Predictor> Estimator for NetworkEstimator<'a, P> {
    fn evaluate(
        &mut self,
        state: &GameState,
        commands: &[Command],
        _rng: &mut dyn RngCore
    ) -> Option<(Vec<f64>, f64)> {
        let states = state_to_tensor(state);
        let phases = state.phase().to_vector();
        let mut responses = self.predictor.predict(&states, &phases, 1)?;
        let response = responses.pop()?;

        let mut prior = array_to_policy(response.policy(), commands, state.board().size());
        deweight_pass(&mut prior, commands, state.phase());

        Some((prior, response.value() as f64))
    }
}
