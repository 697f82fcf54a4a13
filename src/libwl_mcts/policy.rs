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

use ordered_float::OrderedFloat;

use wl_game::{Command, Phase, Team};

/// The per-action statistics the tree policy selects over.
#[derive(Clone, Copy, Debug)]
pub struct ActionStats {
    /// The current value estimate of the action, with respect to the search
    /// team.
    pub value: f64,

    /// The number of samples behind that estimate.
    pub visits: usize,

    /// The prior probability the estimator assigned to the action.
    pub prior: f64
}

/// The UCB1 tree policy. The exploitation term carries the sign of the
/// acting team: the searching team maximizes the stored values, its
/// adversary minimizes them.
#[derive(Clone, Copy, Debug)]
pub struct Ucb1Policy {
    exploration: f64
}

impl Ucb1Policy {
    /// Returns a UCB1 policy with the given exploration constant, which
    /// must be strictly positive.
    pub fn new(exploration: f64) -> Ucb1Policy {
        assert!(exploration > 0.0, "the exploration constant must be strictly positive");

        Ucb1Policy { exploration }
    }

    /// Returns the index of the action to descend into: the argmax of
    /// `sign * q_i + c * p_i * sqrt(ln N / (1 + n_i))`, ties broken by the
    /// first maximum.
    ///
    /// # Arguments
    ///
    /// * `actions` - the per-action statistics
    /// * `parent_samples` - the number of samples at the parent state
    /// * `acting_team` - the team choosing at the parent state
    /// * `search_team` - the team the tree is searching for
    ///
    pub fn select(
        &self,
        actions: &[ActionStats],
        parent_samples: usize,
        acting_team: Team,
        search_team: Team
    ) -> usize {
        assert!(!actions.is_empty());

        let sign = if acting_team == search_team { 1.0 } else { -1.0 };
        let ln_n = (parent_samples.max(1) as f64).ln();

        (0..actions.len()).max_by_key(|&i| {
            let a = &actions[i];
            let exploit = sign * a.value;
            let explore = self.exploration * a.prior * (ln_n / (1 + a.visits) as f64).sqrt();

            // `max_by_key` keeps the last maximum, flipping the index makes
            // ties resolve to the first one
            (OrderedFloat(exploit + explore), std::cmp::Reverse(i))
        }).unwrap()
    }

    /// Returns the tree policy as a distribution: one-hot on the selected
    /// action.
    pub fn distribution(
        &self,
        actions: &[ActionStats],
        parent_samples: usize,
        acting_team: Team,
        search_team: Team
    ) -> Vec<f64> {
        let mut out = vec! [0.0; actions.len()];
        out[self.select(actions, parent_samples, acting_team, search_team)] = 1.0;
        out
    }
}

/// The visit-count final policy: `pi_i` proportional to `n_i^(1 / tau)`.
/// This both chooses the committed move and serves as the training target
/// for the policy network.
#[derive(Clone, Copy, Debug)]
pub struct VisitCountPolicy {
    recip_tau: f64
}

impl VisitCountPolicy {
    /// Returns a visit-count policy with the given temperature, which must
    /// be strictly positive.
    pub fn new(tau: f64) -> VisitCountPolicy {
        assert!(tau > 0.0, "the temperature must be strictly positive");

        VisitCountPolicy { recip_tau: tau.recip() }
    }

    /// Returns the normalized distribution over the given visit counts, or
    /// the uniform distribution if no action has been visited.
    pub fn distribution(&self, visits: &[usize]) -> Vec<f64> {
        assert!(!visits.is_empty());

        let unnormalized: Vec<f64> = visits.iter()
            .map(|&n| (n as f64).powf(self.recip_tau))
            .collect();
        let total: f64 = unnormalized.iter().sum();

        if total > 0.0 {
            unnormalized.into_iter().map(|w| w / total).collect()
        } else {
            vec! [1.0 / visits.len() as f64; visits.len()]
        }
    }
}

/// Adjusts a prior over the given commands so that the search does not
/// waste its budget on passing: in the shooting and fight phases passing is
/// suppressed entirely (whenever there is a real order to take instead), in
/// the movement and charge phases it is merely de-weighted. If nothing
/// would be left the pass weight is restored.
///
/// # Arguments
///
/// * `prior` - the per-command prior, renormalized in place
/// * `commands` - the commands, in the same order
/// * `phase` - the phase of the state the prior belongs to
///
pub fn deweight_pass(prior: &mut [f64], commands: &[Command], phase: Phase) {
    assert_eq!(prior.len(), commands.len());

    let pass = match commands.iter().position(|command| !command.is_unit_order()) {
        Some(index) => index,
        None => return
    };
    let original = prior[pass];

    match phase {
        Phase::Shooting | Phase::Fight => {
            if commands.len() >= 2 {
                prior[pass] = 0.0;
            }
        },
        Phase::Movement | Phase::Charge => {
            prior[pass] *= 1e-3;
        }
    }

    let total: f64 = prior.iter().sum();

    if total > 0.0 {
        for p in prior.iter_mut() {
            *p /= total;
        }
    } else {
        // every real order had zero prior, fall back to the pass
        prior[pass] = original;

        let total: f64 = prior.iter().sum();
        if total > 0.0 {
            for p in prior.iter_mut() {
                *p /= total;
            }
        } else {
            prior[pass] = 1.0;
        }
    }
}
