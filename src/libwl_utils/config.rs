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

use std::env;
use std::process;
use std::str::FromStr;

/// Returns the value of the command-line argument `--name <value>`, or of the
/// environment variable `WL_NAME` if the argument is absent. If the value
/// fails to parse then a diagnostic is printed and the process exits with
/// status `1`.
///
/// # Arguments
///
/// * `name` - the name of the command-line argument, without the leading `--`
///
fn get_opt<T: FromStr>(name: &str) -> Option<T> {
    let env_name = format!("WL_{}", name.replace('-', "_").to_uppercase());
    let mut args = env::args();
    let raw = loop {
        match args.next() {
            None => break env::var(env_name).ok(),
            Some(arg) => {
                if arg == format!("--{}", name) {
                    break args.next();
                }
            }
        }
    };

    raw.map(|value| {
        value.parse::<T>().unwrap_or_else(|_| {
            eprintln!("invalid value for --{}: {}", name, value);
            process::exit(1);
        })
    })
}

/// Returns true if the command-line argument `--name` is present.
fn has_opt(name: &str) -> bool {
    env::args().any(|arg| arg == format!("--{}", name))
}

lazy_static! {
    /// The number of games played in parallel during self-play.
    pub static ref NUM_GAMES: usize = get_opt("num-games").unwrap_or(16);

    /// The number of worker threads that perform tree walks.
    pub static ref NUM_THREADS: usize = get_opt("num-threads").unwrap_or(4);

    /// The number of search-tree simulations to perform per decision.
    pub static ref SEARCH_BUDGET: usize = get_opt("search-budget").unwrap_or(100);

    /// The exploration constant of the UCB1 tree policy.
    pub static ref UCB1_C: f64 = get_opt("ucb1-c").unwrap_or(2.0 * std::f64::consts::SQRT_2);

    /// The temperature of the visit-count final policy.
    pub static ref TAU: f64 = get_opt("tau").unwrap_or(0.7);

    /// The number of half-turns after which a game is scored as it stands.
    pub static ref TURN_LIMIT: usize = get_opt("turn-limit").unwrap_or(6);

    /// The side length of the board, in cells.
    pub static ref BOARD_SIZE: usize = get_opt("board-size").unwrap_or(50);

    /// The physical distance between two adjacent cells, in inches.
    pub static ref SCALE: f32 = get_opt("scale").unwrap_or(1.0);

    /// The number of self-play iterations to run before exiting.
    pub static ref NUM_ITERATIONS: usize = get_opt("num-iterations").unwrap_or(1);

    /// The base seed from which each worker derives its own generator.
    pub static ref SEED: u64 = get_opt("seed").unwrap_or(0x9e3779b97f4a7c15);

    /// The path of the unit statistics file.
    pub static ref UNITS: Option<String> = get_opt("units");

    /// The path of the unit placements file.
    pub static ref PLACEMENTS: Option<String> = get_opt("placements");

    /// The shard filename pattern of the experience dataset. The `*` is
    /// replaced by the shard index.
    pub static ref DATA: String = get_opt("data").unwrap_or_else(|| "data/shard_*".into());

    /// Whether to play a single verbose demonstration game instead of
    /// generating experiences.
    pub static ref DEMO: bool = has_opt("demo");
}

/// Checks all settings that cannot be validated at parse time, and returns a
/// diagnostic for the first invalid one.
pub fn validate() -> Result<(), String> {
    if *NUM_GAMES == 0 {
        Err("--num-games must be positive".into())
    } else if *NUM_THREADS == 0 {
        Err("--num-threads must be positive".into())
    } else if *SEARCH_BUDGET == 0 {
        Err("--search-budget must be positive".into())
    } else if *UCB1_C <= 0.0 {
        Err("--ucb1-c must be strictly positive".into())
    } else if *TAU <= 0.0 {
        Err("--tau must be strictly positive".into())
    } else if *TURN_LIMIT == 0 {
        Err("--turn-limit must be positive".into())
    } else if *BOARD_SIZE == 0 {
        Err("--board-size must be positive".into())
    } else if *SCALE <= 0.0 {
        Err("--scale must be strictly positive".into())
    } else if !DATA.contains('*') {
        Err("--data must contain a `*` wildcard".into())
    } else {
        Ok(())
    }
}
