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
use std::sync::atomic::AtomicBool;

use wl_game::utils::features::VECTOR_DIM;
use wl_game::{Board, GameState, Point, Team};
use wl_mcts::{self_play, SelfPlayOptions};
use wl_nn::{ExperienceDataset, UniformPredictor};

use crate::common::trooper;

fn tiny_state() -> GameState {
    let mut board = Board::new(5, 1.0);
    board.set(Point::new(1, 1), trooper("Red"), Team::Red);
    board.set(Point::new(3, 3), trooper("Blue"), Team::Blue);

    GameState::start(board, 2)
}

fn options() -> SelfPlayOptions {
    SelfPlayOptions {
        num_games: 3,
        search_budget: 8,
        num_threads: 2,
        ucb1_c: 2.0 * std::f64::consts::SQRT_2,
        tau: 1.0,
        seed: 99
    }
}

fn scratch_pattern(tag: &str) -> String {
    let directory = std::env::temp_dir()
        .join(format!("wl_pipeline_test_{}_{}", std::process::id(), tag));

    format!("{}/shard_*", directory.display())
}

/// The whole loop in miniature: self-play generates experiences, the
/// dataset stores them (sign-flipped for team 1), and sampling reads them
/// back in training shape.
#[test]
fn self_play_feeds_the_dataset() {
    let predictor = UniformPredictor;
    let stop = AtomicBool::new(false);
    let initial = tiny_state();
    let results = self_play(&predictor, &initial, &options(), &stop).unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|result| result.finished));

    let mut dataset = ExperienceDataset::new(&scratch_pattern("feed")).unwrap();
    let total: usize = results.iter().map(|result| result.decisions()).sum();

    dataset.set_buffer(results.len());
    for (slot, result) in results.iter().enumerate() {
        for experience in &result.experiences {
            dataset.add_to_buffer(slot, experience.clone());
        }
    }

    let values: Vec<f32> = results.iter().map(|result| result.value() as f32).collect();
    dataset.commit(&values).unwrap();

    let mut rng = SmallRng::seed_from_u64(7);
    let samples = dataset.sample(total, &mut rng).unwrap();

    assert_eq!(samples.len(), total);

    let squares = initial.board().size() * initial.board().size();
    for sample in &samples {
        // training shape: board tensor, policy array, one-hot phase
        assert_eq!(sample.state.len(), squares * VECTOR_DIM);
        assert_eq!(sample.policy.len(), 2 * squares + 1);
        assert_eq!(sample.phase.iter().filter(|&&x| x == 1.0).count(), 1);
        assert!(sample.value >= -1.0 && sample.value <= 1.0);

        let policy_sum: f32 = sample.policy.iter().sum();
        assert!((policy_sum - 1.0).abs() < 1e-4);
    }
}

/// The values a finished game reports for the two teams always cancel
/// out, and the experiences of one game stay in decision order.
#[test]
fn game_values_are_zero_sum() {
    let predictor = UniformPredictor;
    let stop = AtomicBool::new(false);
    let initial = tiny_state();
    let results = self_play(&predictor, &initial, &options(), &stop).unwrap();

    for result in &results {
        let red = result.final_state.game_value(Team::Red);
        let blue = result.final_state.game_value(Team::Blue);

        assert_eq!(red + blue, 0.0);
        assert!(result.decisions() > 0);
    }
}
