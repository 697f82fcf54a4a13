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
use std::path::Path;
use std::process;
use std::sync::atomic::AtomicBool;

use wl_game::utils::roster;
use wl_game::{GameState, Team};
use wl_mcts::estimator::NetworkEstimator;
use wl_mcts::{play_one_game, self_play, SelfPlayOptions};
use wl_nn::{ExperienceDataset, UniformPredictor};
use wl_utils::config;

fn usage() {
    eprintln!("Usage: warlearn --units <file> --placements <file> [options...]");
    eprintln!();
    eprintln!("  --units <file>         the unit statistics file");
    eprintln!("  --placements <file>    the unit placements file");
    eprintln!("  --data <pattern>       the shard pattern of the experience store (default data/shard_*)");
    eprintln!("  --num-iterations <n>   the number of self-play iterations (default 1)");
    eprintln!("  --num-games <n>        the number of parallel games per iteration (default 16)");
    eprintln!("  --num-threads <n>      the number of worker threads (default 4)");
    eprintln!("  --search-budget <n>    the number of simulations per decision (default 100)");
    eprintln!("  --ucb1-c <c>           the exploration constant (default 2 * sqrt 2)");
    eprintln!("  --tau <t>              the final policy temperature (default 0.7)");
    eprintln!("  --turn-limit <n>       the number of half-turns before a game is scored (default 6)");
    eprintln!("  --board-size <n>       the side length of the board in cells (default 50)");
    eprintln!("  --scale <s>            the inches between adjacent cells (default 1)");
    eprintln!("  --seed <n>             the base seed of the per-game generators");
    eprintln!("  --demo                 play one verbose game instead of generating experiences");
}

fn main() {
    if std::env::args().any(|arg| arg == "--help" || arg == "-h") {
        usage();
        return;
    }

    if let Err(reason) = config::validate() {
        eprintln!("{}", reason);
        process::exit(1);
    }

    let initial = load_initial_state();

    if *config::DEMO {
        demo(&initial);
    } else {
        train(&initial);
    }
}

/// Loads and validates the two input files, exiting with a diagnostic on
/// any configuration or data-integrity error.
fn load_initial_state() -> GameState {
    let units_path = config::UNITS.clone().unwrap_or_else(|| {
        eprintln!("--units is required");
        process::exit(1);
    });
    let placements_path = config::PLACEMENTS.clone().unwrap_or_else(|| {
        eprintln!("--placements is required");
        process::exit(1);
    });

    let units = roster::load_units(Path::new(&units_path)).unwrap_or_else(|reason| {
        eprintln!("{}: {}", units_path, reason);
        process::exit(1);
    });
    let placements = roster::load_placements(Path::new(&placements_path)).unwrap_or_else(|reason| {
        eprintln!("{}: {}", placements_path, reason);
        process::exit(1);
    });

    roster::initial_state(&units, &placements, *config::BOARD_SIZE, *config::SCALE, *config::TURN_LIMIT)
        .unwrap_or_else(|reason| {
            eprintln!("{}", reason);
            process::exit(1);
        })
}

/// Generates experiences: one batch of parallel games per iteration, each
/// committed to the experience store as it completes.
fn train(initial: &GameState) {
    let predictor = UniformPredictor;
    let options = SelfPlayOptions::from_config();
    let stop = AtomicBool::new(false);
    let mut dataset = ExperienceDataset::new(config::DATA.as_str()).unwrap_or_else(|reason| {
        eprintln!("{}", reason);
        process::exit(1);
    });

    for iteration in 0..*config::NUM_ITERATIONS {
        let results = self_play(&predictor, initial, &options, &stop).unwrap_or_else(|| {
            eprintln!("iteration {}: the predictor failed, cancelling", iteration);
            process::exit(2);
        });

        let mut decisions = 0;
        let mut red_wins = 0;
        let mut blue_wins = 0;

        dataset.set_buffer(results.len());
        for (slot, result) in results.iter().enumerate() {
            decisions += result.decisions();
            match result.value() {
                v if v > 0.0 => red_wins += 1,
                v if v < 0.0 => blue_wins += 1,
                _ => {}
            }

            for experience in &result.experiences {
                dataset.add_to_buffer(slot, experience.clone());
            }
        }

        let values: Vec<f32> = results.iter().map(|result| result.value() as f32).collect();

        if let Err(reason) = dataset.commit(&values) {
            eprintln!("iteration {}: could not write the experience shards: {}", iteration, reason);
            process::exit(2);
        }

        eprintln!(
            "iteration {}: {} games, {} decisions, {} red wins, {} blue wins, {} draws",
            iteration,
            results.len(),
            decisions,
            red_wins,
            blue_wins,
            results.len() - red_wins - blue_wins
        );
    }
}

/// Plays a single game synchronously and narrates each decision.
fn demo(initial: &GameState) {
    let predictor = UniformPredictor;
    let mut estimator = NetworkEstimator::new(&predictor);
    let mut rng = SmallRng::seed_from_u64(*config::SEED);

    let (final_state, played) = play_one_game(
        initial,
        &mut estimator,
        *config::SEARCH_BUDGET,
        *config::UCB1_C,
        *config::TAU,
        &mut rng
    ).unwrap_or_else(|| {
        eprintln!("the predictor failed mid-game");
        process::exit(2);
    });

    for (number, decision) in played.iter().enumerate() {
        eprintln!(
            "{:4}. team {} ({} simulations): {:?}",
            number + 1,
            decision.team,
            decision.simulations,
            decision.command
        );
    }

    let red = final_state.game_value(Team::Red);
    let outcome = if red > 0.0 {
        "team 0 wins"
    } else if red < 0.0 {
        "team 1 wins"
    } else {
        "a draw"
    };

    eprintln!("the game ended after {} turns: {}", final_state.turn_number(), outcome);
}
