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

use rand::prelude::*;
use rand_distr::Dirichlet;

use wl_game::utils::features::VECTOR_DIM;

/// The answer of the network for a single state: a scalar value in
/// `[-1, 1]` from the point of view of the acting team, and a policy array
/// of `2 * size^2 + 1` probabilities over source cells, target cells, and
/// the pass slot.
#[derive(Clone, Debug)]
pub struct PredictResponse {
    value: f32,
    policy: Vec<f32>
}

impl PredictResponse {
    pub fn new(value: f32, policy: Vec<f32>) -> PredictResponse {
        PredictResponse { value, policy }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn policy(&self) -> &[f32] {
        &self.policy
    }

    pub fn into_policy(self) -> Vec<f32> {
        self.policy
    }
}

/// The seam to the external neural network. The network itself (its
/// weights, its training, its hardware) lives outside of this crate, the
/// self-play manager only ever calls `predict` on whole batches so that the
/// implementation can vectorize.
pub trait Predictor: Send + Sync {
    /// Evaluates a batch of states in one call. `states` holds `batch_size`
    /// flattened board tensors back to back, `phases` holds the matching
    /// one-hot phase vectors. Returns one response per state, or `None` if
    /// the network failed (which cancels the current iteration).
    ///
    /// # Arguments
    ///
    /// * `states` - `batch_size * size^2 * VECTOR_DIM` floats
    /// * `phases` - `batch_size * 4` floats
    /// * `batch_size` - the number of states in the batch
    ///
    fn predict(&self, states: &[f32], phases: &[f32], batch_size: usize) -> Option<Vec<PredictResponse>>;
}

/// Returns the policy array length implied by a batch of board tensors.
fn policy_len_of(states: &[f32], batch_size: usize) -> usize {
    assert!(batch_size > 0);
    assert_eq!(states.len() % (batch_size * VECTOR_DIM), 0);

    let squares = states.len() / (batch_size * VECTOR_DIM);

    2 * squares + 1
}

/// A predictor that has no opinion: zero value and a uniform policy. Useful
/// as a baseline and for bootstrapping self-play before any network has
/// been trained.
#[derive(Clone, Default)]
pub struct UniformPredictor;

impl Predictor for UniformPredictor {
    fn predict(&self, states: &[f32], _phases: &[f32], batch_size: usize) -> Option<Vec<PredictResponse>> {
        let policy_len = policy_len_of(states, batch_size);
        let uniform = 1.0 / policy_len as f32;

        Some(
            (0..batch_size)
                .map(|_| PredictResponse::new(0.0, vec! [uniform; policy_len]))
                .collect()
        )
    }
}

/// A predictor that answers with random values and random (Dirichlet
/// distributed) policies. This is what the tests search against, it gives
/// the search something to disagree about without any network involved.
#[derive(Clone, Default)]
pub struct RandomPredictor;

impl Predictor for RandomPredictor {
    fn predict(&self, states: &[f32], _phases: &[f32], batch_size: usize) -> Option<Vec<PredictResponse>> {
        let policy_len = policy_len_of(states, batch_size);
        let dirichlet = Dirichlet::new_with_size(0.3f32, policy_len).ok()?;
        let mut rng = thread_rng();

        Some(
            (0..batch_size)
                .map(|_| {
                    let value = rng.gen_range(-1.0..1.0);
                    let policy = dirichlet.sample(&mut rng);

                    PredictResponse::new(value, policy)
                })
                .collect()
        )
    }
}
