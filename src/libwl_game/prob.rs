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

//! Pure probability kernels. Everything a command resolution can randomize
//! over bottoms out in one of the distributions computed here, all other
//! code composes them.

use wl_utils::{max, min};

/// The largest number of trials the binomial expansion supports. A 20 model
/// squad firing 10 rapid-fire shots each at half range is 400 trials, so
/// this leaves a comfortable margin.
const MAX_TRIALS: usize = 1024;

lazy_static! {
    /// `LN_FACTORIAL[n]` is `ln(n!)`.
    static ref LN_FACTORIAL: Vec<f64> = {
        let mut out = Vec::with_capacity(MAX_TRIALS + 1);
        let mut acc = 0.0f64;

        out.push(0.0);
        for n in 1..=MAX_TRIALS {
            acc += (n as f64).ln();
            out.push(acc);
        }

        out
    };
}

/// The probability mass of rolling each total `2..=12` on two six-sided
/// dice, indexed by `total - 2`.
pub const TWO_DICE: [f64; 11] = [
    1.0 / 36.0, 2.0 / 36.0, 3.0 / 36.0, 4.0 / 36.0, 5.0 / 36.0,
    6.0 / 36.0,
    5.0 / 36.0, 4.0 / 36.0, 3.0 / 36.0, 2.0 / 36.0, 1.0 / 36.0
];

/// Returns the probability that a single attack hits, wounds, and fails to
/// be saved, collapsing the three-step dice chain into one Bernoulli trial.
/// A toughness of zero or less yields a zero probability instead of a
/// division error.
///
/// # Arguments
///
/// * `hit_skill` - the minimum roll to hit (`WS` or `BS`, possibly
///   overridden)
/// * `strength` - the strength of the attacking weapon
/// * `ap` - the armour penetration modifier of the attacking weapon
/// * `toughness` - the toughness of the target
/// * `sv` - the armour save of the target
/// * `inv` - the invulnerable save of the target
///
pub fn penetrating_hit_probability(
    hit_skill: i32,
    strength: i32,
    ap: i32,
    toughness: i32,
    sv: i32,
    inv: i32
) -> f64 {
    if toughness <= 0 {
        return 0.0;
    }

    let p_hit = clamp((7 - hit_skill) as f64 / 6.0);
    let p_wound = wound_probability(strength, toughness);
    let p_armour_save = clamp((7 - sv + ap) as f64 / 6.0);
    let p_inv_save = clamp((7 - inv) as f64 / 6.0);
    let p_save_failure = max(0.0, 1.0 - max(p_armour_save, p_inv_save));

    p_hit * p_wound * p_save_failure
}

/// Returns the probability that a hit of the given strength wounds a target
/// of the given toughness, as a step function of their ratio.
fn wound_probability(strength: i32, toughness: i32) -> f64 {
    if strength >= 2 * toughness {
        5.0 / 6.0
    } else if strength > toughness {
        4.0 / 6.0
    } else if strength == toughness {
        3.0 / 6.0
    } else if 2 * strength > toughness {
        2.0 / 6.0
    } else {
        1.0 / 6.0
    }
}

/// Returns the probability mass of `0..=n` successes out of `n` independent
/// trials that each succeed with probability `p`. The weights are computed
/// through log-factorials so that they stay finite and accurate for squads
/// with hundreds of trials.
///
/// # Arguments
///
/// * `n` - the number of trials
/// * `p` - the per-trial success probability
///
pub fn binomial(n: usize, p: f64) -> Vec<f64> {
    assert!(n <= MAX_TRIALS, "too many trials: {}", n);
    assert!((0.0..=1.0).contains(&p));

    if p == 0.0 {
        let mut out = vec! [0.0; n + 1];
        out[0] = 1.0;
        return out;
    } else if p == 1.0 {
        let mut out = vec! [0.0; n + 1];
        out[n] = 1.0;
        return out;
    }

    let ln_p = p.ln();
    let ln_q = (1.0 - p).ln();

    (0..=n).map(|k| {
        let ln_choose = LN_FACTORIAL[n] - LN_FACTORIAL[k] - LN_FACTORIAL[n - k];

        (ln_choose + k as f64 * ln_p + (n - k) as f64 * ln_q).exp()
    }).collect()
}

/// Returns the probability that a 2d6 charge roll covers the given physical
/// distance (in inches), i.e. that the roll is at least the distance rounded
/// up.
pub fn charge_pass_probability(distance: f32) -> f64 {
    let needed = distance.ceil() as i64;

    (2..=12i64)
        .filter(|&roll| roll >= needed)
        .map(|roll| TWO_DICE[(roll - 2) as usize])
        .sum()
}

/// Returns the morale outcomes of a squad that lost `loss` models this
/// phase, as `(models fled, probability)` pairs. A squad whose leadership
/// absorbs the loss entirely passes with certainty.
///
/// # Arguments
///
/// * `ld` - the leadership of the squad
/// * `loss` - the number of models lost this phase
///
pub fn morale_branches(ld: i32, loss: i32) -> Vec<(i32, f64)> {
    let min_roll_for_loss = ld - loss + 1;

    if min_roll_for_loss >= 7 {
        return vec! [(0, 1.0)];
    }

    let mut out = vec! [];

    if min_roll_for_loss > 1 {
        out.push((0, (min_roll_for_loss - 1) as f64 / 6.0));
    }

    for roll in min_roll_for_loss.max(1)..=6 {
        out.push((loss + roll - ld, 1.0 / 6.0));
    }

    out
}

fn clamp(p: f64) -> f64 {
    min(1.0, max(0.0, p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wound_table() {
        assert_eq!(wound_probability(8, 4), 5.0 / 6.0);
        assert_eq!(wound_probability(5, 4), 4.0 / 6.0);
        assert_eq!(wound_probability(4, 4), 3.0 / 6.0);
        assert_eq!(wound_probability(3, 4), 2.0 / 6.0);
        assert_eq!(wound_probability(2, 4), 1.0 / 6.0);
    }

    #[test]
    fn zero_toughness_is_harmless() {
        assert_eq!(penetrating_hit_probability(3, 4, 0, 0, 3, 7), 0.0);
    }

    #[test]
    fn single_shot_kill() {
        // BS 3+, S4 vs T4, no save of any kind: 4/6 * 3/6 * 1 = 1/3
        let p = penetrating_hit_probability(3, 4, 0, 4, 7, 7);

        assert!((p - 1.0 / 3.0).abs() < 1e-9, "{}", p);
    }

    #[test]
    fn save_failure_monotonicity() {
        // better penetration (more negative modifier) never lowers the
        // failure probability, worse armour never lowers it either
        for sv in 2..=7 {
            for ap in -4..=0 {
                let p = penetrating_hit_probability(3, 4, ap, 4, sv, 7);
                let better_pen = penetrating_hit_probability(3, 4, ap - 1, 4, sv, 7);
                let worse_armour = penetrating_hit_probability(3, 4, ap, 4, sv + 1, 7);

                assert!(better_pen >= p);
                assert!(worse_armour >= p);
            }
        }
    }

    #[test]
    fn invulnerable_save_caps_failure() {
        // a 4+ invulnerable ignores any amount of penetration
        let p = penetrating_hit_probability(3, 4, -6, 4, 3, 4);

        assert!((p - (4.0 / 6.0) * (3.0 / 6.0) * 0.5).abs() < 1e-9);
    }

    #[test]
    fn binomial_sums_to_one() {
        for &(n, p) in &[(1usize, 0.5f64), (7, 0.25), (40, 0.9), (200, 1.0 / 3.0), (400, 0.05)] {
            let pmf = binomial(n, p);

            assert_eq!(pmf.len(), n + 1);
            assert!((pmf.iter().sum::<f64>() - 1.0).abs() < 1e-9, "n = {}, p = {}", n, p);
            assert!(pmf.iter().all(|&w| w >= 0.0));
        }
    }

    #[test]
    fn binomial_degenerate() {
        assert_eq!(binomial(3, 0.0), vec! [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(binomial(3, 1.0), vec! [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn two_dice_sums_to_one() {
        assert!((TWO_DICE.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn charge_over_seven_inches() {
        // P[2d6 >= 7] = 21/36
        assert!((charge_pass_probability(7.0) - 21.0 / 36.0).abs() < 1e-12);
        assert_eq!(charge_pass_probability(1.0), 1.0);
        assert_eq!(charge_pass_probability(13.0), 0.0);
    }

    #[test]
    fn morale_heavy_losses() {
        // Ld 7, 5 models lost: rolls of 1-2 pass, rolls of 3-6 lose 1-4
        // more models
        let branches = morale_branches(7, 5);

        assert_eq!(
            branches,
            vec! [
                (0, 2.0 / 6.0),
                (1, 1.0 / 6.0), (2, 1.0 / 6.0), (3, 1.0 / 6.0), (4, 1.0 / 6.0)
            ]
        );
    }

    #[test]
    fn morale_absorbed_by_leadership() {
        assert_eq!(morale_branches(7, 1), vec! [(0, 1.0)]);
    }

    #[test]
    fn morale_always_sums_to_one() {
        for ld in 1..=10 {
            for loss in 1..=10 {
                let total: f64 = morale_branches(ld, loss).iter().map(|&(_, p)| p).sum();

                assert!((total - 1.0).abs() < 1e-12, "ld = {}, loss = {}", ld, loss);
            }
        }
    }
}
