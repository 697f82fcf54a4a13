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

/// Returns the index of an element drawn from the given (not necessarily
/// normalized) weights. At least one weight must be positive.
///
/// # Arguments
///
/// * `weights` - the relative probability of each index
/// * `rng` - the source of randomness
///
pub fn select_randomly(weights: &[f64], rng: &mut dyn RngCore) -> usize {
    let total: f64 = weights.iter().sum();
    debug_assert!(total > 0.0, "no positive weight to draw from");

    let threshold = rng.gen::<f64>() * total;
    let mut so_far = 0.0;

    for (i, &w) in weights.iter().enumerate() {
        so_far += w;

        if so_far > threshold {
            return i;
        }
    }

    // floating point rounding can leave `so_far` a hair short of `total`
    weights.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn degenerate_distribution_always_wins() {
        let mut rng = SmallRng::seed_from_u64(1);

        for _ in 0..100 {
            assert_eq!(select_randomly(&[0.0, 1.0, 0.0], &mut rng), 1);
        }
    }

    #[test]
    fn frequencies_track_the_weights() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut counts = [0usize; 3];

        for _ in 0..10000 {
            counts[select_randomly(&[0.5, 0.25, 0.25], &mut rng)] += 1;
        }

        assert!(counts[0] > 4600 && counts[0] < 5400, "{:?}", counts);
        assert!(counts[1] > 2100 && counts[1] < 2900, "{:?}", counts);
        assert!(counts[2] > 2100 && counts[2] < 2900, "{:?}", counts);
    }

    #[test]
    fn unnormalized_weights_are_accepted() {
        let mut rng = SmallRng::seed_from_u64(3);

        for _ in 0..100 {
            let index = select_randomly(&[2.0, 6.0], &mut rng);

            assert!(index < 2);
        }
    }
}
